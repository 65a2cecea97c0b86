use std::convert::Infallible;
use std::io::{self, Read};

/// An object that provides bytes to the tokenizer.
///
/// See [`crate::Tokenizer::new`] for more information.
pub trait Reader {
    /// The error returned by this reader.
    type Error: std::error::Error;

    /// Return a new byte from the input stream.
    ///
    /// The input stream does **not** have to be preprocessed in any way, it can contain invalid
    /// UTF-8 and have inconsistent newlines.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Read an arbitrary amount of bytes up until and including the next byte that matches an
    /// array entry in `needle`.
    ///
    /// Return either:
    ///
    /// 1. A chunk of consumed bytes that does not contain any bytes from `needle`. The chunk can be
    ///    arbitrarily large or small.
    /// 2. If the next byte is included in `needle`, a slice with just that byte and nothing else.
    ///
    /// The default implementation simply reads one byte, ignoring the needle entirely. Implement
    /// `read_until` manually if there is any sort of in-memory buffer to search.
    ///
    /// The return value is usually borrowed from underlying buffers. If that's not possible, a
    /// small buffer is provided as `char_buf` to put a single byte into.
    ///
    /// # Example
    ///
    /// ```rust
    /// use html5scrub::{Reader, Readable};
    ///
    /// let mut reader = "hello world".to_reader();
    /// let mut chunks = Vec::new();
    /// loop {
    ///     let mut char_buf = [0; 4];
    ///     match reader.read_until(&[b' ', b'r'], &mut char_buf).unwrap() {
    ///         Some(xs) => chunks.push(std::str::from_utf8(xs).unwrap().to_owned()),
    ///         None => break,
    ///     }
    /// }
    ///
    /// assert_eq!(chunks, &["hello", " ", "wo", "r", "ld"]);
    /// ```
    fn read_until<'b>(
        &'b mut self,
        needle: &[u8],
        char_buf: &'b mut [u8; 4],
    ) -> Result<Option<&'b [u8]>, Self::Error> {
        let _needle = needle;

        match self.read_byte()? {
            Some(x) => {
                char_buf[0] = x;
                Ok(Some(&char_buf[..1]))
            }
            None => Ok(None),
        }
    }
}

/// An object that can be converted into a [`crate::Reader`].
///
/// Any string or byte slice converts into a [`StringReader`], such that `Tokenizer::new("<b>")`
/// and `Tokenizer::new(&String::from("<b>"))` both work.
pub trait Readable<'a> {
    /// The reader type to which this type should be converted.
    type Reader: Reader + 'a;

    /// Convert self to some sort of reader.
    fn to_reader(self) -> Self::Reader;
}

impl<'a, R: 'a + Reader> Readable<'a> for R {
    type Reader = Self;

    fn to_reader(self) -> Self::Reader {
        self
    }
}

/// Reads HTML from an in-memory string or byte slice.
///
/// ```rust
/// use html5scrub::{Token, Tokenizer};
///
/// let tokens: Vec<Token> = Tokenizer::new("<title>hi</title>").infallible().collect();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[1], Token::Text("hi".to_owned()));
/// ```
#[derive(Debug)]
pub struct StringReader<'a> {
    input: &'a [u8],
}

impl<'a> StringReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        StringReader { input }
    }
}

impl<'a> Reader for StringReader<'a> {
    type Error = Infallible;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        match self.input.split_first() {
            Some((&x, rest)) => {
                self.input = rest;
                Ok(Some(x))
            }
            None => Ok(None),
        }
    }

    fn read_until<'b>(
        &'b mut self,
        needle: &[u8],
        _: &'b mut [u8; 4],
    ) -> Result<Option<&'b [u8]>, Self::Error> {
        if self.input.is_empty() {
            return Ok(None);
        }

        let at = match fast_find(needle, self.input) {
            Some(0) => 1,
            Some(needle_pos) => needle_pos,
            None => self.input.len(),
        };
        let (rv, new_input) = self.input.split_at(at);
        self.input = new_input;
        Ok(Some(rv))
    }
}

impl<'a> Readable<'a> for &'a str {
    type Reader = StringReader<'a>;

    fn to_reader(self) -> Self::Reader {
        StringReader::new(self.as_bytes())
    }
}

impl<'a> Readable<'a> for &'a String {
    type Reader = StringReader<'a>;

    fn to_reader(self) -> Self::Reader {
        StringReader::new(self.as_bytes())
    }
}

impl<'a> Readable<'a> for &'a [u8] {
    type Reader = StringReader<'a>;

    fn to_reader(self) -> Self::Reader {
        StringReader::new(self)
    }
}

/// A [`IoReader`] can be used to construct a tokenizer from any type that implements
/// `std::io::Read`.
///
/// Because of trait impl conflicts, `IoReader` needs to be explicitly constructed. No extra I/O
/// buffering is required: `IoReader` keeps its own heap-allocated 16kb read-buffer, so wrapping a
/// `File` in a `BufReader` first is wasteful.
///
/// ```rust
/// use html5scrub::{IoReader, Token, Tokenizer};
///
/// let tokenizer = Tokenizer::new(IoReader::new("<b>bold</b>".as_bytes()));
/// let tokens = tokenizer.collect::<Result<Vec<Token>, _>>().unwrap();
/// assert_eq!(tokens[1], Token::Text("bold".to_owned()));
/// ```
#[derive(Debug)]
pub struct IoReader<R: Read> {
    buf: Box<[u8; BUF_SIZE]>,
    buf_offset: usize,
    buf_len: usize,
    bytes_read: u64,
    reader: R,
}

const BUF_SIZE: usize = 16 * 1024;

impl<R: Read> IoReader<R> {
    /// Construct a new `IoReader` from any type that implements `Read`.
    pub fn new(reader: R) -> Self {
        IoReader {
            buf: Box::new([0; BUF_SIZE]),
            buf_offset: 0,
            buf_len: 0,
            bytes_read: 0,
            reader,
        }
    }

    /// Total number of bytes pulled from the underlying reader so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    #[inline]
    fn prepare_buf(&mut self, min_len: usize) -> Result<(), io::Error> {
        debug_assert!(min_len < BUF_SIZE);
        let mut len = self.buf_len - self.buf_offset;
        if len < min_len {
            let mut raw_buf = &mut self.buf[..];
            raw_buf.rotate_left(self.buf_offset);
            raw_buf = &mut raw_buf[len..];
            while len < min_len {
                let n = match self.reader.read(raw_buf) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if n == 0 {
                    break;
                }
                len += n;
                self.bytes_read += n as u64;
                raw_buf = &mut raw_buf[n..];
            }
            self.buf_len = len;
            self.buf_offset = 0;
        }
        Ok(())
    }
}

impl<R: Read> Reader for IoReader<R> {
    type Error = io::Error;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        self.prepare_buf(1)?;
        if self.buf_offset == self.buf_len {
            return Ok(None);
        }
        let rv = self.buf[self.buf_offset];
        self.buf_offset += 1;
        Ok(Some(rv))
    }

    fn read_until<'b>(
        &'b mut self,
        needle: &[u8],
        _: &'b mut [u8; 4],
    ) -> Result<Option<&'b [u8]>, Self::Error> {
        self.prepare_buf(4)?;
        let buf = &self.buf[self.buf_offset..self.buf_len];
        if buf.is_empty() {
            return Ok(None);
        }

        let at = match fast_find(needle, buf) {
            Some(0) => 1,
            Some(needle_pos) => needle_pos,
            None => buf.len(),
        };
        self.buf_offset += at;
        Ok(Some(&buf[..at]))
    }
}

#[inline]
fn fast_find(needle: &[u8], haystack: &[u8]) -> Option<usize> {
    #[cfg(feature = "jetscii")]
    if needle.len() <= 16 {
        let mut bytes = [0; 16];
        bytes[..needle.len()].copy_from_slice(needle);
        // needle lengths are tiny constants, the cast cannot truncate
        let finder = jetscii::Bytes::new(bytes, needle.len() as i32, |b| needle.contains(&b));
        return finder.find(haystack);
    }

    haystack.iter().position(|b| needle.contains(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks<R: Reader>(mut reader: R, needle: &[u8]) -> Vec<Vec<u8>> {
        let mut rv = Vec::new();
        loop {
            let mut char_buf = [0; 4];
            match reader.read_until(needle, &mut char_buf) {
                Ok(Some(xs)) => rv.push(xs.to_vec()),
                Ok(None) => break,
                Err(_) => panic!("reader failed"),
            }
        }
        rv
    }

    #[test]
    fn string_reader_chunks() {
        assert_eq!(
            chunks("a<b&c".to_reader(), b"<&"),
            vec![b"a".to_vec(), b"<".to_vec(), b"b".to_vec(), b"&".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn io_reader_matches_string_reader() {
        let input = "x".repeat(BUF_SIZE + 10) + "<y>";
        let from_io: Vec<u8> = chunks(IoReader::new(input.as_bytes()), b"<>")
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(from_io, input.as_bytes());
    }

    #[test]
    fn io_reader_counts_bytes() {
        let mut reader = IoReader::new(&b"abc"[..]);
        while reader.read_byte().unwrap().is_some() {}
        assert_eq!(reader.bytes_read(), 3);
    }

    #[test]
    fn fast_find_finds_first() {
        assert_eq!(fast_find(b"<&", b"abc&d<"), Some(3));
        assert_eq!(fast_find(b"<", b"abc"), None);
    }
}
