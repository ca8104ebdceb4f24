//! Shared types for the VoiceMaker text-to-speech pipeline.
//!
//! The dictionary, the text transforms and the conversion service all speak
//! in terms of the records defined here: a [`WordPair`] is one pronunciation
//! rule, a [`DictKind`] selects which dictionary store a rule lives in, and a
//! [`Token`] is one unit of morphological tokenizer output.
//!
//! ```rust
//! use voicemaker_types::{DictKind, Token, WordPair};
//!
//! let pair = WordPair::new("rust", "ラスト").unwrap();
//! assert_eq!(pair.source(), "rust");
//! assert_eq!("filter".parse::<DictKind>().unwrap(), DictKind::Filter);
//!
//! let tok = Token::new("東京", "名詞,固有名詞,地域,一般,*,*,東京,トウキョウ,トーキョー");
//! assert_eq!(tok.pronunciation(), Some("トーキョー"));
//! ```

use std::fmt;
use std::str::FromStr;

/// Selects one of the two dictionary stores.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DictKind {
    /// Exact-match word overrides consulted per token.
    Preferred,
    /// Ordered substring corrections applied to the whole text.
    Filter,
}

impl DictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DictKind::Preferred => "preferred",
            DictKind::Filter => "filter",
        }
    }
}

impl fmt::Display for DictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a store selector string is neither `preferred` nor `filter`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownDictKind(pub String);

impl fmt::Display for UnknownDictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dictionary kind: {:?}", self.0)
    }
}

impl std::error::Error for UnknownDictKind {}

impl FromStr for DictKind {
    type Err = UnknownDictKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preferred" => Ok(DictKind::Preferred),
            "filter" => Ok(DictKind::Filter),
            _ => Err(UnknownDictKind(s.to_string())),
        }
    }
}

/// Immutable `(source, destination)` pronunciation pair.
///
/// Both sides are guaranteed non-empty; construction through [`WordPair::new`]
/// is the only way to build one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct WordPair {
    source: String,
    destination: String,
}

impl WordPair {
    /// Build a pair, returning `None` when either side is empty.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Option<Self> {
        let source = source.into();
        let destination = destination.into();
        if source.is_empty() || destination.is_empty() {
            return None;
        }
        Some(Self {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Index of the comma-delimited feature field carrying the pronunciation.
pub const PRONUNCIATION_FIELD: usize = 8;

/// One token of morphological tokenizer output.
///
/// `feature` is the tokenizer's raw annotation: comma-delimited fields where
/// field [`PRONUNCIATION_FIELD`] (when present) is the canonical reading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub surface: String,
    pub feature: String,
}

impl Token {
    pub fn new(surface: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            feature: feature.into(),
        }
    }

    /// Byte length of the surface form.
    pub fn len(&self) -> usize {
        self.surface.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_empty()
    }

    /// Pronunciation from the feature annotation, if it has at least nine fields.
    ///
    /// A single pair of surrounding double quotes is trimmed.
    pub fn pronunciation(&self) -> Option<&str> {
        let field = self.feature.split(',').nth(PRONUNCIATION_FIELD)?;
        Some(trim_quotes(field))
    }
}

fn trim_quotes(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_sides() {
        assert!(WordPair::new("", "x").is_none());
        assert!(WordPair::new("x", "").is_none());
        assert!(WordPair::new("x", "y").is_some());
    }

    #[test]
    fn parses_kind_case_insensitively() {
        assert_eq!("Preferred".parse::<DictKind>(), Ok(DictKind::Preferred));
        assert_eq!("FILTER".parse::<DictKind>(), Ok(DictKind::Filter));
        assert!("both".parse::<DictKind>().is_err());
    }

    #[test]
    fn pronunciation_needs_nine_fields() {
        let short = Token::new("a", "記号,一般,*,*,*,*,a");
        assert_eq!(short.pronunciation(), None);

        let quoted = Token::new("x", "1,2,3,4,5,6,7,8,\"エックス\"");
        assert_eq!(quoted.pronunciation(), Some("エックス"));

        let lone_quote = Token::new("x", "1,2,3,4,5,6,7,8,\"ab");
        assert_eq!(lone_quote.pronunciation(), Some("\"ab"));
    }
}
