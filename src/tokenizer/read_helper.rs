use super::reader::Reader;

/// Wraps a [`Reader`] with input-stream preprocessing and pushback.
///
/// Newlines are normalized here: `\r\n` and lone `\r` both come out as `\n`. Everything the state
/// machine reads goes through this type, so no state ever sees a `\r`.
#[derive(Debug)]
pub(crate) struct ReadHelper<R: Reader> {
    reader: R,
    // `None` entries are a pushed-back end of file
    to_reconsume: Vec<Option<u8>>,
    last_was_cr: bool,
}

impl<R: Reader> ReadHelper<R> {
    pub(crate) fn new(reader: R) -> Self {
        ReadHelper {
            reader,
            to_reconsume: Vec::new(),
            last_was_cr: false,
        }
    }

    pub(crate) fn inner(&self) -> &R {
        &self.reader
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> Result<Option<u8>, R::Error> {
        if let Some(c) = self.to_reconsume.pop() {
            return Ok(c);
        }

        loop {
            let c = self.reader.read_byte()?;
            let after_cr = std::mem::replace(&mut self.last_was_cr, c == Some(b'\r'));
            match c {
                Some(b'\n') if after_cr => continue,
                Some(b'\r') => return Ok(Some(b'\n')),
                c => return Ok(c),
            }
        }
    }

    #[inline]
    pub(crate) fn unread_byte(&mut self, c: Option<u8>) {
        self.to_reconsume.push(c);
    }

    /// Consume `s` if the input continues with it, otherwise consume nothing.
    ///
    /// `s` must not contain `\r` or `\n`.
    pub(crate) fn try_read_string(
        &mut self,
        s: &[u8],
        case_sensitive: bool,
    ) -> Result<bool, R::Error> {
        debug_assert!(!s.contains(&b'\r') && !s.contains(&b'\n'));

        let mut consumed = Vec::with_capacity(s.len());
        for &expected in s {
            let c = self.read_byte()?;
            consumed.push(c);
            let matches = match c {
                Some(x) => x == expected || (!case_sensitive && x.eq_ignore_ascii_case(&expected)),
                None => false,
            };
            if !matches {
                while let Some(c) = consumed.pop() {
                    self.unread_byte(c);
                }
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Append bytes to `out` until a byte from `needle` is found, and return that byte. Return
    /// `None` at end of file.
    ///
    /// `needle` must contain `\r`, so that newline normalization can happen. A normalized `\n` is
    /// returned if `needle` asks for it, and appended to `out` otherwise.
    pub(crate) fn read_until(
        &mut self,
        needle: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<Option<u8>, R::Error> {
        debug_assert!(needle.contains(&b'\r'));

        loop {
            if let Some(c) = self.to_reconsume.pop() {
                match c {
                    Some(x) if needle.contains(&x) => return Ok(Some(x)),
                    Some(x) => {
                        out.push(x);
                        continue;
                    }
                    None => return Ok(None),
                }
            }

            let mut char_buf = [0; 4];
            let mut xs = match self.reader.read_until(needle, &mut char_buf)? {
                Some(xs) => xs,
                None => return Ok(None),
            };

            if xs == b"\r" {
                self.last_was_cr = true;
                if needle.contains(&b'\n') {
                    return Ok(Some(b'\n'));
                }
                out.push(b'\n');
                continue;
            }

            if std::mem::take(&mut self.last_was_cr) && xs[0] == b'\n' {
                xs = &xs[1..];
                if xs.is_empty() {
                    continue;
                }
            }

            if xs.len() == 1 && needle.contains(&xs[0]) {
                return Ok(Some(xs[0]));
            }
            out.extend_from_slice(xs);
        }
    }
}
