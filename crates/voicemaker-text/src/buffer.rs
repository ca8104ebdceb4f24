use std::ops::Range;

use crate::TextError;

/// Output buffer whose capacity is fixed when it is created.
///
/// Writes that would exceed the limit fail instead of reallocating.
pub(crate) struct Bounded {
    buf: String,
    limit: usize,
    pass: &'static str,
}

impl Bounded {
    /// Reserve `len * factor` bytes up front.
    pub(crate) fn sized(pass: &'static str, len: usize, factor: usize) -> Result<Self, TextError> {
        let limit = len
            .checked_mul(factor)
            .ok_or(TextError::SizeOverflow {
                pass,
                input_len: len,
            })?;
        let mut buf = String::new();
        buf.try_reserve_exact(limit)
            .map_err(|_| TextError::Alloc {
                pass,
                requested: limit,
            })?;
        Ok(Self { buf, limit, pass })
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buf
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn push_str(&mut self, s: &str) -> Result<(), TextError> {
        self.ensure(self.buf.len() + s.len())?;
        self.buf.push_str(s);
        Ok(())
    }

    pub(crate) fn push(&mut self, c: char) -> Result<(), TextError> {
        self.ensure(self.buf.len() + c.len_utf8())?;
        self.buf.push(c);
        Ok(())
    }

    pub(crate) fn replace_range(&mut self, range: Range<usize>, with: &str) -> Result<(), TextError> {
        self.ensure(self.buf.len() - range.len() + with.len())?;
        self.buf.replace_range(range, with);
        Ok(())
    }

    /// Raise the limit to `needed`, reserving the extra bytes fallibly.
    pub(crate) fn grow(&mut self, needed: usize) -> Result<(), TextError> {
        let additional = needed.saturating_sub(self.buf.len());
        self.buf
            .try_reserve(additional)
            .map_err(|_| TextError::Alloc {
                pass: self.pass,
                requested: needed,
            })?;
        self.limit = self.limit.max(needed);
        Ok(())
    }

    pub(crate) fn ends_with(&self, c: char) -> bool {
        self.buf.ends_with(c)
    }

    pub(crate) fn pop(&mut self) -> Option<char> {
        self.buf.pop()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub(crate) fn into_string(self) -> String {
        self.buf
    }

    fn ensure(&self, needed: usize) -> Result<(), TextError> {
        if needed > self.limit {
            return Err(TextError::CapacityExceeded {
                pass: self.pass,
                needed,
                capacity: self.limit,
            });
        }
        Ok(())
    }
}
