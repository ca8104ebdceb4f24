use std::fmt;

use tracing::debug;

use crate::TextError;

/// Extra bytes reserved beyond the input length, and per tag growth step.
pub const FIXUP_SLACK: usize = 64;

/// Numeral classification understood by the synthesizer's markup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NumericClass {
    /// Contains a `-`: read digit by digit (signed values, ranges, codes).
    Num,
    /// Read as a quantity.
    NumK,
}

impl NumericClass {
    pub fn as_str(self) -> &'static str {
        match self {
            NumericClass::Num => "NUM",
            NumericClass::NumK => "NUMK",
        }
    }
}

/// A numeral found by [`NumericScanner`], ready to render as markup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumericTag {
    pub class: NumericClass,
    pub value: String,
    /// Non-ASCII part of the word after the numeral, when a word was captured.
    pub counter: Option<String>,
}

impl fmt::Display for NumericTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} VAL={}", self.class.as_str(), self.value)?;
        if let Some(counter) = self.counter.as_deref().filter(|c| !c.is_empty()) {
            write!(f, " COUNTER={counter}")?;
        }
        f.write_str(">")
    }
}

/// Piece of scanned text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment<'a> {
    Text(&'a str),
    Tag(NumericTag),
}

/// Single forward pass splitting text into plain runs and numeral tags.
///
/// A numeral is a space, then a run of digits, `.`, `-` and `,` holding at
/// least one digit, then optionally a word (one optional space and a run of
/// characters that are neither spaces, numeral characters nor markup
/// brackets). The whole span, leading space included, becomes one
/// [`Segment::Tag`].
pub struct NumericScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> NumericScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Try to match a numeral span starting at the space at `start`.
    fn match_at(&self, start: usize) -> Option<(usize, NumericTag)> {
        let bytes = self.text.as_bytes();
        let digits_start = start + 1;
        let digits_end = bytes[digits_start..]
            .iter()
            .position(|b| !is_numeral_byte(*b))
            .map_or(bytes.len(), |idx| idx + digits_start);
        let numeral = &self.text[digits_start..digits_end];
        if !numeral.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }

        let word_start = if bytes.get(digits_end) == Some(&b' ') {
            digits_end + 1
        } else {
            digits_end
        };
        let rest = &self.text[word_start..];
        let word_len = rest
            .char_indices()
            .find(|(_, c)| !is_word_char(*c))
            .map_or(rest.len(), |(idx, _)| idx);

        let (end, counter) = if word_len == 0 {
            (digits_end, None)
        } else {
            let word = &rest[..word_len];
            let kept: String = word.chars().filter(|c| !c.is_ascii()).collect();
            (word_start + word_len, Some(kept))
        };

        let class = if numeral.contains('-') {
            NumericClass::Num
        } else {
            NumericClass::NumK
        };
        Some((
            end,
            NumericTag {
                class,
                value: collapse_value(numeral),
                counter,
            },
        ))
    }
}

impl<'a> Iterator for NumericScanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let bytes = self.text.as_bytes();
        let mut cursor = self.pos;
        while let Some(offset) = bytes[cursor..].iter().position(|b| *b == b' ') {
            let space = cursor + offset;
            if let Some((end, tag)) = self.match_at(space) {
                if space > self.pos {
                    let text = &self.text[self.pos..space];
                    self.pos = space;
                    return Some(Segment::Text(text));
                }
                self.pos = end;
                return Some(Segment::Tag(tag));
            }
            cursor = space + 1;
        }
        let text = &self.text[self.pos..];
        self.pos = self.text.len();
        Some(Segment::Text(text))
    }
}

fn is_numeral_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'.' | b'-' | b',')
}

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace() || (c.is_ascii() && is_numeral_byte(c as u8)) || c == '<' || c == '>')
}

/// Drop thousands separators and redundant leading zeros, keeping the sign.
fn collapse_value(numeral: &str) -> String {
    let plain: String = numeral.chars().filter(|c| *c != ',').collect();
    let (sign, mut body) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    while body.len() > 1 && body.starts_with('0') && body.as_bytes()[1].is_ascii_digit() {
        body = &body[1..];
    }
    format!("{sign}{body}")
}

/// Replace every numeral span in `text` with its `<NUM ..>`/`<NUMK ..>` tag.
pub fn fixup(text: &str) -> Result<String, TextError> {
    let mut out = String::new();
    reserve(&mut out, text.len() + FIXUP_SLACK)?;
    let mut tags = 0usize;
    for segment in NumericScanner::new(text) {
        match segment {
            Segment::Text(plain) => push(&mut out, plain)?,
            Segment::Tag(tag) => {
                push(&mut out, &tag.to_string())?;
                tags += 1;
            }
        }
    }
    debug!("fixup tagged {tags} numerals, {} bytes", out.len());
    Ok(out)
}

fn push(out: &mut String, s: &str) -> Result<(), TextError> {
    if out.capacity() - out.len() < s.len() {
        reserve(out, s.len() + FIXUP_SLACK)?;
    }
    out.push_str(s);
    Ok(())
}

fn reserve(out: &mut String, additional: usize) -> Result<(), TextError> {
    out.try_reserve(additional).map_err(|_| TextError::Alloc {
        pass: "fixup",
        requested: out.len().saturating_add(additional),
    })
}
