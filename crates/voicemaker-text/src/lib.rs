//! Text transforms that prepare free-form text for a speech synthesizer.
//!
//! Each pass is a plain function from text to text, so callers can run them
//! individually or chain them. None of them touch a dictionary directly: the
//! assembler takes a lookup callback and the filter pass takes any iterator of
//! [`WordPair`](voicemaker_types::WordPair)s, which keeps this crate ignorant
//! of how pronunciations are stored.
//!
//! # Passes
//! 1. [`pretokenize`]: split Latin-letter runs from other scripts so the
//!    tokenizer sees consistent boundaries.
//! 2. [`assemble`]: resolve each token's pronunciation and stitch digits the
//!    tokenizer fragmented back into single numerals.
//! 3. [`apply_filters`]: ordered, case-insensitive substring corrections.
//! 4. [`fixup`]: wrap numerals in `<NUM ..>`/`<NUMK ..>` markup.
//!
//! # Example
//! ```rust
//! use voicemaker_text::{assemble, fixup, pretokenize};
//! use voicemaker_types::Token;
//!
//! # fn main() -> Result<(), voicemaker_text::TextError> {
//! let text = pretokenize("price3個")?;
//! assert_eq!(text, "price 3個");
//!
//! let tokens = ["price", "3", "個"].map(|s| Token::new(s, ""));
//! let assembled = assemble(&tokens, text.len(), 2, |_| None)?;
//! assert_eq!(assembled, "price 3 個");
//! assert_eq!(fixup(&assembled)?, "price<NUMK VAL=3 COUNTER=個>");
//! # Ok(()) }
//! ```

mod assemble;
mod buffer;
mod filter;
mod fixup;
mod pretokenize;

pub use assemble::{ASSEMBLE_EXPANSION, assemble, is_run_syntax};
pub use filter::{apply_filters, is_reserved_source};
pub use fixup::{FIXUP_SLACK, NumericClass, NumericScanner, NumericTag, Segment, fixup};
pub use pretokenize::{SEPARATOR, pretokenize};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("failed to allocate {requested} bytes for {pass} output")]
    Alloc { pass: &'static str, requested: usize },
    #[error("{pass} output size overflows for {input_len} bytes of input")]
    SizeOverflow {
        pass: &'static str,
        input_len: usize,
    },
    #[error("{pass} output needs {needed} bytes but capacity is {capacity}")]
    CapacityExceeded {
        pass: &'static str,
        needed: usize,
        capacity: usize,
    },
}

impl TextError {
    /// True when the failure came from the allocator rather than from the text.
    pub fn is_alloc(&self) -> bool {
        matches!(self, TextError::Alloc { .. })
    }
}
