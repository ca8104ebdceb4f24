use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};
use voicemaker_dict::{DictError, Dictionary};

use crate::convert::VoiceMaker;
use crate::model::LoadMode;
use crate::synth::{CommandSynthesizer, Synthesizer, Unconfigured};
use crate::tokenizer::{CharClassTokenizer, MecabCommand, Tokenizer};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MECAB: &str = "mecab";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenizerKind {
    Mecab,
    CharClass,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    #[error("unknown tokenizer {0:?} (expected mecab or charclass)")]
    UnknownTokenizer(String),
    #[error("unknown model load mode {0:?} (expected mmap or owned)")]
    UnknownModelMode(String),
    #[error("unrecognised argument {0:?}")]
    UnknownFlag(String),
}

/// Server settings gathered from the environment and command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub preferred_dict: Option<PathBuf>,
    pub filter_dict: Option<PathBuf>,
    pub tokenizer: TokenizerKind,
    pub mecab_bin: String,
    pub synth_command: Option<String>,
    pub model_mode: LoadMode,
}

impl Config {
    /// Read the process environment and arguments.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    /// Build from an environment lookup and flags; flags win over variables.
    pub fn from_sources<E, A>(env: E, args: A) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
        A: IntoIterator<Item = String>,
    {
        let host = env("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match env("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let tokenizer = match env("TOKENIZER") {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "mecab" => TokenizerKind::Mecab,
                "charclass" => TokenizerKind::CharClass,
                _ => return Err(ConfigError::UnknownTokenizer(raw)),
            },
            None => TokenizerKind::CharClass,
        };
        let mut model_mode = env("MODEL_LOAD_MODE");
        let mut preferred_dict = env("PREFERRED_DICT_PATH");
        let mut filter_dict = env("FILTER_DICT_PATH");

        for arg in args {
            if let Some(value) = arg.strip_prefix("--preferred-dict=") {
                preferred_dict = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--filter-dict=") {
                filter_dict = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--model-mode=") {
                model_mode = Some(value.to_string());
            } else {
                return Err(ConfigError::UnknownFlag(arg));
            }
        }

        let model_mode = match model_mode {
            Some(raw) => LoadMode::parse(&raw).ok_or(ConfigError::UnknownModelMode(raw))?,
            None => LoadMode::Mmap,
        };

        Ok(Self {
            host,
            port,
            preferred_dict: preferred_dict.filter(|p| !p.is_empty()).map(PathBuf::from),
            filter_dict: filter_dict.filter(|p| !p.is_empty()).map(PathBuf::from),
            tokenizer,
            mecab_bin: env("MECAB_BIN").unwrap_or_else(|| DEFAULT_MECAB.to_string()),
            synth_command: env("SYNTH_COMMAND").filter(|c| !c.trim().is_empty()),
            model_mode,
        })
    }

    /// Wire up collaborators and, when both files exist, load the dictionary.
    ///
    /// The session starts with the built-in filter corrections; a loaded
    /// filter file replaces them.
    pub fn build_session(&self) -> Result<VoiceMaker, DictError> {
        let tokenizer: Box<dyn Tokenizer> = match self.tokenizer {
            TokenizerKind::Mecab => Box::new(MecabCommand::new(&self.mecab_bin)),
            TokenizerKind::CharClass => Box::new(CharClassTokenizer),
        };
        let synthesizer: Box<dyn Synthesizer> = match &self.synth_command {
            Some(command) => {
                let mut words = command.split_whitespace().map(str::to_string);
                let program = words.next().unwrap_or_default();
                Box::new(CommandSynthesizer::new(program).with_args(words))
            }
            None => {
                warn!("SYNTH_COMMAND is not set; conversions will fail at synthesis");
                Box::new(Unconfigured)
            }
        };
        let mut session = VoiceMaker::new(tokenizer, synthesizer)
            .with_model_mode(self.model_mode)
            .with_dictionary(Dictionary::with_default_filters());

        if let (Some(preferred), Some(filter)) = (&self.preferred_dict, &self.filter_dict) {
            session.set_dictionary_paths(preferred, filter)?;
            if preferred.exists() && filter.exists() {
                session.load_dictionary()?;
            } else {
                info!(
                    "dictionary files {} / {} not present yet; using built-in filters",
                    preferred.display(),
                    filter.display()
                );
            }
        }
        Ok(session)
    }
}
