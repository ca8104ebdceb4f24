//! Text-to-speech conversion service.
//!
//! [`VoiceMaker`] runs text through the transforms in `voicemaker_text`, a
//! [`Tokenizer`] and a [`Synthesizer`], returning base64 audio. The
//! [`handlers`] module exposes a session over HTTP.

pub mod args;
pub mod config;
pub mod convert;
pub mod error;
pub mod handlers;
pub mod model;
mod process;
pub mod synth;
pub mod tokenizer;

pub use args::{ArgValue, ConvertRequest, DEFAULT_SPEED, MAX_SPEED, MAX_TEXT_BYTES, MIN_SPEED};
pub use config::{Config, ConfigError, TokenizerKind};
pub use convert::VoiceMaker;
pub use error::{ConvertError, Error, ErrorCategory, Stage, StageError, ValidationError};
pub use handlers::{AppState, router};
pub use model::{LoadMode, ModelData, ModelError};
pub use synth::{CommandSynthesizer, SynthError, Synthesizer, Unconfigured};
pub use tokenizer::{CharClassTokenizer, MecabCommand, TokenizeError, Tokenizer, parse_mecab_output};
