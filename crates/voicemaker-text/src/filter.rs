use regex::Regex;
use tracing::{debug, warn};
use voicemaker_types::WordPair;

use crate::TextError;
use crate::buffer::Bounded;

/// Sources reserved for numeric handling: a single digit, space, `-` or `.`.
pub fn is_reserved_source(source: &str) -> bool {
    matches!(source.as_bytes(), [b'0'..=b'9' | b' ' | b'-' | b'.'])
}

/// Apply ordered substring corrections to `text`.
///
/// Pairs run one after another: each replaces the first case-insensitive
/// (ASCII) occurrence of its source until none is left, and later pairs see
/// the text earlier ones produced. When a destination contains its own
/// source, searching resumes after the inserted text so the pass terminates.
///
/// The working buffer starts at `text.len() * ratio` bytes. Pairs whose
/// source is longer than the current text, or whose destination exceeds the
/// buffer, are skipped. Chained replacements that outgrow the buffer extend
/// it through fallible reservation, so only allocation failure is an error.
pub fn apply_filters<'p, I>(text: &str, pairs: I, ratio: usize) -> Result<String, TextError>
where
    I: IntoIterator<Item = &'p WordPair>,
{
    let mut out = Bounded::sized("filter", text.len(), ratio)?;
    out.push_str(text)?;

    let mut applied = 0usize;
    for pair in pairs {
        let (source, destination) = (pair.source(), pair.destination());
        if is_reserved_source(source)
            || out.len() < source.len()
            || out.limit() < destination.len()
        {
            continue;
        }
        let pattern = match source_pattern(source) {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!("skipping filter source {source:?}: {err}");
                continue;
            }
        };
        let reintroduces = pattern.is_match(destination);
        let mut from = 0usize;
        while let Some(found) = pattern.find_at(out.as_str(), from).map(|m| m.range()) {
            let needed = out.len() - found.len() + destination.len();
            if needed > out.limit() {
                out.grow(needed)?;
            }
            let start = found.start;
            out.replace_range(found, destination)?;
            applied += 1;
            from = if reintroduces {
                start + destination.len()
            } else {
                0
            };
        }
    }

    debug!(
        "filter applied {applied} replacements, {} bytes (capacity {})",
        out.len(),
        out.limit()
    );
    Ok(out.into_string())
}

/// Literal pattern for `source` matching ASCII letters in either case.
///
/// Non-ASCII characters match exactly; full-width letters are not folded.
fn source_pattern(source: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(source.len() * 4);
    let mut utf8 = [0u8; 4];
    for c in source.chars() {
        if c.is_ascii_alphabetic() {
            pattern.push('[');
            pattern.push(c.to_ascii_lowercase());
            pattern.push(c.to_ascii_uppercase());
            pattern.push(']');
        } else {
            pattern.push_str(&regex::escape(c.encode_utf8(&mut utf8)));
        }
    }
    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<WordPair> {
        raw.iter()
            .map(|(s, d)| WordPair::new(*s, *d).unwrap())
            .collect()
    }

    #[test]
    fn replaces_every_occurrence_case_insensitively() {
        let table = pairs(&[("ai", "エーアイ")]);
        let out = apply_filters("AI and ai and Ai", &table, 5).unwrap();
        assert_eq!(out, "エーアイ and エーアイ and エーアイ");
    }

    #[test]
    fn later_pairs_see_earlier_output() {
        let table = pairs(&[("ヴァ", "バ"), ("バ", "ば")]);
        assert_eq!(apply_filters("ヴァイオリン", &table, 2).unwrap(), "ばイオリン");

        let reversed = pairs(&[("バ", "ば"), ("ヴァ", "バ")]);
        assert_eq!(apply_filters("ヴァイオリン", &reversed, 2).unwrap(), "バイオリン");
    }

    #[test]
    fn skips_reserved_and_oversized_sources() {
        let table = pairs(&[("1", "いち"), (" ", "_"), ("-", "まいなす"), (".", "てん")]);
        assert_eq!(apply_filters(" -1.5", &table, 5).unwrap(), " -1.5");

        let long = pairs(&[("abcdef", "x")]);
        assert_eq!(apply_filters("abc", &long, 2).unwrap(), "abc");

        let wide = pairs(&[("a", "xxxxx")]);
        assert_eq!(apply_filters("ab", &wide, 2).unwrap(), "ab");
    }

    #[test]
    fn terminates_when_destination_contains_source() {
        let table = pairs(&[("a", "aa")]);
        assert_eq!(apply_filters("aba", &table, 3).unwrap(), "aabaa");
    }

    #[test]
    fn chained_growth_extends_the_buffer() {
        let table = pairs(&[("=", "イコール"), ("イ", "イー")]);
        assert_eq!(apply_filters("=", &table, 13).unwrap(), "イーコール");

        let table = pairs(&[("a", "bb"), ("b", "cc")]);
        assert_eq!(apply_filters("a", &table, 3).unwrap(), "cccc");
    }

    #[test]
    fn pattern_metacharacters_are_literal() {
        let table = pairs(&[("a.b", "X"), ("(c)", "Y")]);
        assert_eq!(apply_filters("axb a.b (C) c", &table, 2).unwrap(), "axb X Y c");
    }

    #[test]
    fn full_width_letters_are_not_folded() {
        let table = pairs(&[("ａ", "エー")]);
        assert_eq!(apply_filters("Ａａ", &table, 3).unwrap(), "Ａエー");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let table = pairs(&[("ぁ", "あ"), ("ヅ", "ズ"), ("＝", "イコール")]);
        let once = apply_filters("ぁヅ＝", &table, 5).unwrap();
        let twice = apply_filters(&once, &table, 5).unwrap();
        assert_eq!(once, "あズイコール");
        assert_eq!(once, twice);
    }
}
