use tracing::debug;
use voicemaker_types::Token;

use crate::TextError;
use crate::buffer::Bounded;

/// Worst-case bytes of output per byte of input, before the dictionary ratio.
///
/// Covers a multi-byte character expanding into a long canonical reading.
pub const ASSEMBLE_EXPANSION: usize = 60;

/// True for a surface that may be part of a numeral the tokenizer split apart:
/// a single ASCII digit, `-`, `.` or `,`.
pub fn is_run_syntax(surface: &str) -> bool {
    matches!(surface.as_bytes(), [b'0'..=b'9' | b'-' | b'.' | b','])
}

/// Where the current numeric run starts in the output.
struct Run {
    /// Offset before the run's leading space, if it got one.
    start: usize,
    /// Offset of the first run character.
    body: usize,
    /// Whether text preceded the run.
    preceded: bool,
}

/// Turn tokenizer output into one pronunciation string.
///
/// Ordinary tokens resolve through `lookup` (dictionary override), then the
/// token's pronunciation field, then the raw surface. Consecutive numeric-run
/// tokens are concatenated verbatim so `["1", ",", "2", "3"]` becomes `1,23`;
/// a run gets one leading space when text precedes it, loses any trailing
/// commas when it closes, and is followed by one space when ordinary text
/// resumes after it.
///
/// The output is capped at `input_len * ASSEMBLE_EXPANSION * ratio` bytes,
/// where `input_len` is the length of the text handed to the tokenizer and
/// `ratio` the Preferred dictionary's extension ratio.
pub fn assemble<'d, F>(
    tokens: &[Token],
    input_len: usize,
    ratio: usize,
    lookup: F,
) -> Result<String, TextError>
where
    F: Fn(&str) -> Option<&'d str>,
{
    let factor = ASSEMBLE_EXPANSION
        .checked_mul(ratio)
        .ok_or(TextError::SizeOverflow {
            pass: "assemble",
            input_len,
        })?;
    let mut out = Bounded::sized("assemble", input_len, factor)?;
    let mut run: Option<Run> = None;

    for token in tokens {
        if is_run_syntax(&token.surface) {
            if run.is_none() {
                let start = out.len();
                let preceded = !out.is_empty();
                if preceded {
                    out.push(' ')?;
                }
                run = Some(Run {
                    start,
                    body: out.len(),
                    preceded,
                });
            }
            out.push_str(&token.surface)?;
            continue;
        }

        if let Some(closed) = run.take()
            && close_run(&mut out, closed)
        {
            out.push(' ')?;
        }
        let text = match lookup(&token.surface) {
            Some(dst) => dst,
            None => token.pronunciation().unwrap_or(token.surface.as_str()),
        };
        out.push_str(text)?;
    }

    if let Some(closed) = run.take() {
        close_run(&mut out, closed);
    }

    debug!(
        "assembled {} tokens into {} bytes (capacity {})",
        tokens.len(),
        out.len(),
        out.limit()
    );
    Ok(out.into_string())
}

/// Strip trailing commas from a finished run.
///
/// A run with nothing left is removed together with its leading space.
/// Returns whether a trailing space belongs after the run.
fn close_run(out: &mut Bounded, run: Run) -> bool {
    while out.len() > run.body && out.ends_with(',') {
        out.pop();
    }
    if out.len() == run.body {
        out.truncate(run.start);
        return false;
    }
    run.preceded
}
