use std::io::{self, Write};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::process::{feed_and_wait, spawn_piped};

/// Speech engine turning phoneme-tagged text into audio bytes.
pub trait Synthesizer: Send + Sync {
    fn synthesize(
        &self,
        phonemes: &str,
        speed: u16,
        model: Option<&[u8]>,
    ) -> Result<Vec<u8>, SynthError>;
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("no synthesizer configured")]
    NotConfigured,
    #[error("failed to start synthesizer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("synthesizer i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("synthesizer {program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("synthesizer produced no audio")]
    EmptyOutput,
}

/// Runs an external engine: phonemes on stdin, audio on stdout.
///
/// The engine receives `--speed <n>`, plus `--model <file>` pointing at a
/// temporary copy of the voice model when one was supplied.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

impl Synthesizer for CommandSynthesizer {
    fn synthesize(
        &self,
        phonemes: &str,
        speed: u16,
        model: Option<&[u8]>,
    ) -> Result<Vec<u8>, SynthError> {
        let mut args = self.args.clone();
        args.push("--speed".into());
        args.push(speed.to_string());

        // Kept alive until the engine exits.
        let model_file = match model {
            Some(bytes) => {
                let mut file = NamedTempFile::new()?;
                file.write_all(bytes)?;
                file.flush()?;
                args.push("--model".into());
                args.push(file.path().display().to_string());
                Some(file)
            }
            None => None,
        };

        let child = spawn_piped(&self.program, &args).map_err(|source| SynthError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let output = feed_and_wait(child, phonemes.as_bytes().to_vec())?;
        drop(model_file);

        if !output.status.success() {
            return Err(SynthError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(SynthError::EmptyOutput);
        }
        debug!("{} produced {} audio bytes", self.program, output.stdout.len());
        Ok(output.stdout)
    }
}

/// Placeholder used when no engine is configured; every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconfigured;

impl Synthesizer for Unconfigured {
    fn synthesize(&self, _: &str, _: u16, _: Option<&[u8]>) -> Result<Vec<u8>, SynthError> {
        Err(SynthError::NotConfigured)
    }
}
