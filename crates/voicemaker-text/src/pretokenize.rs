use crate::TextError;
use crate::buffer::Bounded;

/// Character inserted at script boundaries.
pub const SEPARATOR: char = ' ';

/// Insert [`SEPARATOR`] wherever an ASCII-letter run meets a run of anything
/// else.
///
/// Whitespace never triggers a boundary and resets run tracking, so existing
/// word breaks are left alone. The output is at most twice the input length.
pub fn pretokenize(text: &str) -> Result<String, TextError> {
    let mut out = Bounded::sized("pretokenize", text.len(), 2)?;
    let mut prev_alpha: Option<bool> = None;
    for c in text.chars() {
        if c.is_whitespace() {
            prev_alpha = None;
            out.push(c)?;
            continue;
        }
        let alpha = c.is_ascii_alphabetic();
        if prev_alpha.is_some_and(|prev| prev != alpha) {
            out.push(SEPARATOR)?;
        }
        prev_alpha = Some(alpha);
        out.push(c)?;
    }
    Ok(out.into_string())
}
