use std::io;

use thiserror::Error;
use tracing::debug;
use voicemaker_types::Token;

use crate::process::{feed_and_wait, spawn_piped};

/// Morphological tokenizer splitting UTF-8 text into annotated tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, TokenizeError>;
}

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("failed to start tokenizer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("tokenizer i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("tokenizer {program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("tokenizer output is not valid utf-8")]
    Utf8,
    #[error("malformed tokenizer output at line {line}: {content:?}")]
    Parse { line: usize, content: String },
}

/// Runs the `mecab` executable and parses its default output format.
///
/// Each token arrives as `surface\tfeature`, and `EOS` closes a sentence.
#[derive(Clone, Debug)]
pub struct MecabCommand {
    program: String,
    args: Vec<String>,
}

impl MecabCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra command-line arguments, e.g. `-d <dicdir>`.
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

impl Tokenizer for MecabCommand {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, TokenizeError> {
        let child = spawn_piped(&self.program, &self.args).map_err(|source| {
            TokenizeError::Spawn {
                program: self.program.clone(),
                source,
            }
        })?;
        let output = feed_and_wait(child, format!("{text}\n").into_bytes())?;

        if !output.status.success() {
            return Err(TokenizeError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8(output.stdout).map_err(|_| TokenizeError::Utf8)?;
        let tokens = parse_mecab_output(&stdout)?;
        debug!("{} produced {} tokens", self.program, tokens.len());
        Ok(tokens)
    }
}

/// Parse mecab's `surface\tfeature` lines, skipping `EOS` markers.
pub fn parse_mecab_output(output: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    for (lineno, line) in output.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line == "EOS" {
            continue;
        }
        let (surface, feature) = line.split_once('\t').ok_or_else(|| TokenizeError::Parse {
            line: lineno + 1,
            content: line.to_string(),
        })?;
        tokens.push(Token::new(surface, feature));
    }
    Ok(tokens)
}

/// Built-in fallback splitting text by character class.
///
/// Letter runs stay together, every digit and punctuation character becomes
/// its own token, and whitespace is dropped. Features are empty, so the
/// assembler falls back to dictionary lookups and raw surfaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharClassTokenizer;

impl Tokenizer for CharClassTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();
        let mut word_start: Option<usize> = None;
        for (idx, c) in text.char_indices() {
            if c.is_alphabetic() {
                word_start.get_or_insert(idx);
                continue;
            }
            if let Some(start) = word_start.take() {
                tokens.push(Token::new(&text[start..idx], ""));
            }
            if !c.is_whitespace() {
                tokens.push(Token::new(&text[idx..idx + c.len_utf8()], ""));
            }
        }
        if let Some(start) = word_start {
            tokens.push(Token::new(&text[start..], ""));
        }
        Ok(tokens)
    }
}
