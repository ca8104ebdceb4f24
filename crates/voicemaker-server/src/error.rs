use std::fmt;

use thiserror::Error;
use voicemaker_dict::DictError;
use voicemaker_text::TextError;
use voicemaker_types::UnknownDictKind;

use crate::args::{MAX_SPEED, MIN_SPEED};
use crate::model::ModelError;
use crate::synth::SynthError;
use crate::tokenizer::TokenizeError;

/// Pipeline stage a conversion was in when it failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Pretokenize,
    Tokenize,
    Assemble,
    Filter,
    Fixup,
    ModelLoad,
    Synthesize,
    Encode,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pretokenize => "pretokenize",
            Stage::Tokenize => "tokenize",
            Stage::Assemble => "assemble",
            Stage::Filter => "filter",
            Stage::Fixup => "fixup",
            Stage::ModelLoad => "model_load",
            Stage::Synthesize => "synthesize",
            Stage::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad error classes exposed to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    Validation,
    Resource,
    Dictionary,
    PipelineStage,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bad arguments: no text")]
    NoText,
    #[error("bad arguments: too many arguments ({0})")]
    TooManyArgs(usize),
    #[error("bad arguments: argument {position} has invalid type {found}")]
    InvalidType {
        position: usize,
        found: &'static str,
    },
    #[error(
        "bad arguments: speed {0} is out of range {min}..={max}",
        min = MIN_SPEED,
        max = MAX_SPEED
    )]
    SpeedOutOfRange(i64),
    #[error("bad arguments: model path must be the last argument")]
    ConflictingArgs,
    #[error("bad arguments: text is {len} bytes, limit is {max}")]
    TextTooLong { len: usize, max: usize },
}

/// Underlying cause of a failed stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Synthesize(#[from] SynthError),
    #[error("failed to allocate {0} bytes for encoded audio")]
    EncodeAlloc(usize),
}

/// A conversion that stopped at `stage`.
///
/// `diagnostic` is the text produced by the last stage that completed.
#[derive(Debug, Error)]
#[error("{stage} failed: {cause}")]
pub struct ConvertError {
    pub stage: Stage,
    pub diagnostic: String,
    #[source]
    pub cause: StageError,
}

impl ConvertError {
    pub fn new(stage: Stage, diagnostic: &str, cause: impl Into<StageError>) -> Self {
        Self {
            stage,
            diagnostic: diagnostic.to_string(),
            cause: cause.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.cause {
            StageError::Model(_) | StageError::EncodeAlloc(_) => ErrorCategory::Resource,
            StageError::Text(err) if err.is_alloc() => ErrorCategory::Resource,
            _ => ErrorCategory::PipelineStage,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Dictionary(#[from] DictError),
    #[error(transparent)]
    UnknownKind(#[from] UnknownDictKind),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Dictionary(err) if err.is_resource() => ErrorCategory::Resource,
            Error::Dictionary(_) | Error::UnknownKind(_) => ErrorCategory::Dictionary,
            Error::Convert(err) => err.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorises_errors() {
        assert_eq!(
            Error::from(ValidationError::NoText).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::from(DictError::PathsNotSet).category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            Error::from(DictError::EmptySource).category(),
            ErrorCategory::Dictionary
        );
        let model = ConvertError::new(
            Stage::ModelLoad,
            "text",
            ModelError::NotFound("voice.phont".into()),
        );
        assert_eq!(model.category(), ErrorCategory::Resource);
        let synth = ConvertError::new(Stage::Synthesize, "text", SynthError::EmptyOutput);
        assert_eq!(Error::from(synth).category(), ErrorCategory::PipelineStage);
    }

    #[test]
    fn stage_error_message_names_the_stage() {
        let err = ConvertError::new(Stage::Synthesize, "ア", SynthError::NotConfigured);
        assert_eq!(err.to_string(), "synthesize failed: no synthesizer configured");
    }
}
