//! The bundled HTML tokenizer.
//!
//! The sanitizer itself only needs a stream of [`Token`]s. This module provides one that follows
//! the WHATWG tokenization rules closely enough for sanitization purposes: bogus comments,
//! character references (with and without semicolons), unterminated tags and text-only elements
//! all come out the way a browser would see them.

mod emitter;
mod entities;
mod machine;
mod read_helper;
mod reader;

use std::convert::Infallible;

use emitter::TokenEmitter;
use machine::{ControlToken, State};
use read_helper::ReadHelper;

pub use reader::{IoReader, Readable, Reader, StringReader};

use crate::Token;

/// A HTML tokenizer.
///
/// ```rust
/// use html5scrub::{StartTag, Token, Tokenizer};
///
/// let tokens: Vec<Token> = Tokenizer::new("<a HREF=x>&amp;</a>").infallible().collect();
/// assert_eq!(
///     tokens[0],
///     Token::StartTag(StartTag::new("a").with_attribute("href", "x"))
/// );
/// assert_eq!(tokens[1], Token::Text("&".to_owned()));
/// ```
#[derive(Debug)]
pub struct Tokenizer<R: Reader> {
    eof: bool,
    pub(crate) state: State,
    pub(crate) emitter: TokenEmitter,
    pub(crate) reader: ReadHelper<R>,
    pub(crate) temporary_buffer: Vec<u8>,
}

impl<R: Reader> Tokenizer<R> {
    /// Create a new tokenizer from some input.
    ///
    /// `input` can be `&str`, `&String`, `&[u8]` or any [`Reader`], such as an [`IoReader`].
    pub fn new<'a, S: Readable<'a, Reader = R>>(input: S) -> Self {
        Tokenizer {
            eof: false,
            state: State::Data,
            emitter: TokenEmitter::default(),
            reader: ReadHelper::new(input.to_reader()),
            temporary_buffer: Vec::new(),
        }
    }

    /// The underlying reader.
    pub fn reader(&self) -> &R {
        self.reader.inner()
    }
}

impl<R: Reader> Iterator for Tokenizer<R> {
    type Item = Result<Token, R::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.emitter.pop_token() {
                break Some(Ok(token));
            } else if !self.eof {
                match machine::consume(self) {
                    Ok(ControlToken::Continue) => (),
                    Ok(ControlToken::Eof) => {
                        self.eof = true;
                        self.emitter.emit_eof();
                    }
                    Err(e) => break Some(Err(e)),
                }
            } else {
                break None;
            }
        }
    }
}

/// A kind of tokenizer that directly yields tokens when used as an iterator, so `Token` instead of
/// `Result<Token, _>`.
///
/// This is the return value of [`Tokenizer::infallible`].
#[derive(Debug)]
pub struct InfallibleTokenizer<R: Reader<Error = Infallible>>(Tokenizer<R>);

impl<R: Reader<Error = Infallible>> Tokenizer<R> {
    /// Statically assert that this iterator is infallible.
    ///
    /// Call this to get rid of error handling when parsing HTML from strings.
    pub fn infallible(self) -> InfallibleTokenizer<R> {
        InfallibleTokenizer(self)
    }
}

impl<R: Reader<Error = Infallible>> Iterator for InfallibleTokenizer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0.next()? {
            Ok(token) => Some(token),
            Err(e) => match e {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, EndTag, StartTag};
    use pretty_assertions::assert_eq;

    fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::new(input).infallible().collect()
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_owned())
    }

    fn start(name: &str, attrs: &[(&str, &str)]) -> Token {
        Token::StartTag(StartTag {
            self_closing: false,
            name: name.to_owned(),
            attributes: attrs
                .iter()
                .map(|(k, v)| Attribute::new(*k, *v))
                .collect(),
        })
    }

    fn end(name: &str) -> Token {
        Token::EndTag(EndTag::new(name))
    }

    #[test]
    fn simple_document() {
        assert_eq!(
            tokenize("Hello, <b>World</b>!"),
            vec![text("Hello, "), start("b", &[]), text("World"), end("b"), text("!")]
        );
    }

    #[test]
    fn attribute_forms() {
        assert_eq!(
            tokenize(r#"<IMG SRC="a" alt='b' width=96 checked>"#),
            vec![start(
                "img",
                &[("src", "a"), ("alt", "b"), ("width", "96"), ("checked", "")]
            )]
        );
    }

    #[test]
    fn duplicate_attributes_keep_first() {
        assert_eq!(
            tokenize("<a href=1 HREF=2>"),
            vec![start("a", &[("href", "1")])]
        );
    }

    #[test]
    fn self_closing() {
        assert_eq!(
            tokenize(r#"<img src="x"/>"#),
            vec![Token::StartTag(
                StartTag::new("img").with_attribute("src", "x").self_closing()
            )]
        );
    }

    #[test]
    fn stray_less_than_is_text() {
        assert_eq!(tokenize("<<<><"), vec![text("<<<><")]);
        assert_eq!(tokenize("a < b"), vec![text("a < b")]);
        assert_eq!(tokenize("a <"), vec![text("a <")]);
    }

    #[test]
    fn comments() {
        assert_eq!(
            tokenize("a<!-- x -->b"),
            vec![text("a"), Token::Comment(" x ".to_owned()), text("b")]
        );
        assert_eq!(
            tokenize("<!-->x"),
            vec![Token::Comment(String::new()), text("x")]
        );
        assert_eq!(
            tokenize("<!-- a <!-- b -->c"),
            vec![Token::Comment(" a <!-- b ".to_owned()), text("c")]
        );
        assert_eq!(
            tokenize("<!--a--!>b"),
            vec![Token::Comment("a".to_owned()), text("b")]
        );
        assert_eq!(tokenize("<!--open"), vec![Token::Comment("open".to_owned())]);
    }

    #[test]
    fn bogus_comments() {
        assert_eq!(
            tokenize("<![if !IE]>x<![endif]>"),
            vec![
                Token::Comment("[if !IE]".to_owned()),
                text("x"),
                Token::Comment("[endif]".to_owned())
            ]
        );
        assert_eq!(tokenize("<?php x ?>"), vec![Token::Comment("?php x ?".to_owned())]);
        assert_eq!(tokenize("</3>"), vec![Token::Comment("3".to_owned())]);
        assert_eq!(
            tokenize("<![CDATA[x]]>"),
            vec![Token::Comment("[CDATA[x]]".to_owned())]
        );
    }

    #[test]
    fn doctype() {
        assert_eq!(
            tokenize("<!doctype  html >x"),
            vec![Token::Doctype("html".to_owned()), text("x")]
        );
    }

    #[test]
    fn raw_text_elements() {
        assert_eq!(
            tokenize("<script>a<b>c</p></script>d"),
            vec![start("script", &[]), text("a<b>c</p>"), end("script"), text("d")]
        );
        assert_eq!(
            tokenize(r#"<SCRIPT>document.write("<SCRI");</SCRIPT>PT"#),
            vec![
                start("script", &[]),
                text(r#"document.write("<SCRI");"#),
                end("script"),
                text("PT")
            ]
        );
        assert_eq!(
            tokenize("<title>&amp;<b></title>"),
            vec![start("title", &[]), text("&<b>"), end("title")]
        );
        assert_eq!(
            tokenize("<style>x</styled></style >"),
            vec![start("style", &[]), text("x</styled>"), end("style")]
        );
    }

    #[test]
    fn character_references() {
        assert_eq!(tokenize("&lt;&#60;&#x3c;&#X3C"), vec![text("<<<<")]);
        assert_eq!(tokenize("&copy2020 &notit; &hellip"), vec![text("\u{a9}2020 \u{ac}it; &hellip")]);
        assert_eq!(tokenize("&#; &#x; & &"), vec![text("&#; &#x; & &")]);
        assert_eq!(tokenize("&#0;&#x110000;&#128;"), vec![text("\u{fffd}\u{fffd}\u{20ac}")]);
        assert_eq!(tokenize("&#0000106&#0000097"), vec![text("ja")]);
    }

    #[test]
    fn character_references_in_attributes() {
        assert_eq!(
            tokenize(r#"<a href="?a=1&copy=2&amp=3&lt;">"#),
            vec![start("a", &[("href", "?a=1&copy=2&amp=3<")])]
        );
        assert_eq!(
            tokenize("<a href=&#x6A&#x61;v&#97>"),
            vec![start("a", &[("href", "java")])]
        );
        assert_eq!(
            tokenize("<div a=&#92&#45&>"),
            vec![start("div", &[("a", "\\-&")])]
        );
    }

    #[test]
    fn newlines_are_normalized() {
        assert_eq!(tokenize("a\r\nb\rc"), vec![text("a\nb\nc")]);
        assert_eq!(
            tokenize("<a\r\nhref=x\r>"),
            vec![start("a", &[("href", "x")])]
        );
    }

    #[test]
    fn nul_bytes_are_replaced() {
        assert_eq!(tokenize("a\0b"), vec![text("a\u{fffd}b")]);
    }

    #[test]
    fn end_tag_attributes_are_dropped() {
        assert_eq!(tokenize("</a style=x>"), vec![end("a")]);
    }

    #[test]
    fn unterminated_tags_vanish() {
        assert_eq!(tokenize("x<a href='y"), vec![text("x")]);
        assert_eq!(tokenize("x<div"), vec![text("x")]);
    }

    #[test]
    fn garbage_attribute_names() {
        assert_eq!(
            tokenize(r#"<a - href="http://x">"#),
            vec![start("a", &[("-", ""), ("href", "http://x")])]
        );
        assert_eq!(
            tokenize(r#"<input src="x"">"#),
            vec![start("input", &[("src", "x"), ("\"", "")])]
        );
    }

    #[test]
    fn io_reader_agrees_with_string_reader() {
        let input = "<p class=x>caf\u{e9} &amp; <!-- c --> tea</p>".repeat(2000);
        let from_io: Vec<Token> = Tokenizer::new(IoReader::new(input.as_bytes()))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(from_io, tokenize(&input));
    }
}
