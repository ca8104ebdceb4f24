use std::path::{Path, PathBuf};

use crate::error::ValidationError;

pub const DEFAULT_SPEED: u16 = 100;
pub const MIN_SPEED: i64 = 30;
pub const MAX_SPEED: i64 = 300;
/// Longest accepted input text, in bytes.
pub const MAX_TEXT_BYTES: usize = 32 * 1024;

/// One positional argument of a conversion call.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    /// Anything else, named by its type.
    Other(&'static str),
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Str(_) => "string",
            ArgValue::Int(_) => "integer",
            ArgValue::Other(name) => name,
        }
    }
}

/// Validated conversion arguments: text, speed and optional voice model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertRequest {
    text: String,
    speed: u16,
    model: Option<PathBuf>,
}

impl ConvertRequest {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.len() > MAX_TEXT_BYTES {
            return Err(ValidationError::TextTooLong {
                len: text.len(),
                max: MAX_TEXT_BYTES,
            });
        }
        Ok(Self {
            text,
            speed: DEFAULT_SPEED,
            model: None,
        })
    }

    pub fn with_speed(mut self, speed: i64) -> Result<Self, ValidationError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ValidationError::SpeedOutOfRange(speed));
        }
        self.speed = speed as u16;
        Ok(self)
    }

    pub fn with_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model = Some(path.into());
        self
    }

    /// Parse `(text, [speed | model], [model])` call arguments.
    ///
    /// A lone trailing argument is a speed when it is an integer and a model
    /// path when it is a string; with three arguments the order must be
    /// `(text, speed, model)`.
    pub fn from_args(args: &[ArgValue]) -> Result<Self, ValidationError> {
        let Some(ArgValue::Str(text)) = args.first() else {
            return Err(ValidationError::NoText);
        };
        if args.len() > 3 {
            return Err(ValidationError::TooManyArgs(args.len()));
        }
        let mut request = Self::new(text.clone())?;

        match args.get(1) {
            None => {}
            Some(ArgValue::Str(path)) => {
                if args.len() == 3 {
                    return Err(ValidationError::ConflictingArgs);
                }
                request = request.with_model(path);
            }
            Some(ArgValue::Int(speed)) => request = request.with_speed(*speed)?,
            Some(other) => {
                return Err(ValidationError::InvalidType {
                    position: 2,
                    found: other.type_name(),
                });
            }
        }

        match args.get(2) {
            None => {}
            Some(ArgValue::Str(path)) => request = request.with_model(path),
            Some(other) => {
                return Err(ValidationError::InvalidType {
                    position: 3,
                    found: other.type_name(),
                });
            }
        }
        Ok(request)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    pub fn model(&self) -> Option<&Path> {
        self.model.as_deref()
    }
}
