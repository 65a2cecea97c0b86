use super::entities;
use super::reader::Reader;
use super::Tokenizer;
use crate::error::ParseError;

const REPLACEMENT: &[u8] = "\u{fffd}".as_bytes();

/// The states of the tokenizer that this crate models. Names follow the WHATWG spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Data,
    RcData,
    RawText,
    PlainText,
    TagOpen,
    EndTagOpen,
    TagName,
    RawLessThanSign(RawKind),
    RawEndTagOpen(RawKind),
    RawEndTagName(RawKind),
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    MarkupDeclarationOpen,
    BogusComment,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    BeforeDoctype,
    Doctype,
}

/// Which kind of text section an end tag is being looked for in. RCDATA decodes character
/// references, RAWTEXT does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawKind {
    RcData,
    RawText,
}

impl RawKind {
    fn state(self) -> State {
        match self {
            RawKind::RcData => State::RcData,
            RawKind::RawText => State::RawText,
        }
    }
}

pub(crate) enum ControlToken {
    Eof,
    Continue,
}

// Note: This is not implemented as a method on Tokenizer because there's fields on Tokenizer that
// should not be available in this method, such as Tokenizer.eof
#[inline]
pub(crate) fn consume<R: Reader>(slf: &mut Tokenizer<R>) -> Result<ControlToken, R::Error> {
    macro_rules! switch_to {
        ($state:expr) => {{
            slf.state = $state;
            cont!()
        }};
    }

    macro_rules! reconsume_in {
        ($c:expr, $state:expr) => {{
            let new_state = $state;
            let c = $c;
            slf.reader.unread_byte(c);
            slf.state = new_state;
            cont!()
        }};
    }

    macro_rules! cont {
        () => {{
            return Ok(ControlToken::Continue);
        }};
    }

    macro_rules! eof {
        () => {{
            return Ok(ControlToken::Eof);
        }};
    }

    macro_rules! read_byte {
        () => {
            slf.reader.read_byte()?
        };
    }

    macro_rules! error {
        ($e:expr) => {
            slf.emitter.emit_error($e);
        };
    }

    macro_rules! emit_current_tag_and_switch {
        () => {{
            let state = slf.emitter.emit_current_tag();
            switch_to!(state.unwrap_or(State::Data))
        }};
    }

    match slf.state {
        State::Data => match slf
            .reader
            .read_until(b"<&\r\0", slf.emitter.characters_mut())?
        {
            Some(b'<') => switch_to!(State::TagOpen),
            Some(b'&') => {
                consume_character_reference(slf, false)?;
                cont!()
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.emit_string(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => eof!(),
        },
        State::RcData => match slf
            .reader
            .read_until(b"<&\r\0", slf.emitter.characters_mut())?
        {
            Some(b'<') => switch_to!(State::RawLessThanSign(RawKind::RcData)),
            Some(b'&') => {
                consume_character_reference(slf, false)?;
                cont!()
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.emit_string(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => eof!(),
        },
        State::RawText => match slf
            .reader
            .read_until(b"<\r\0", slf.emitter.characters_mut())?
        {
            Some(b'<') => switch_to!(State::RawLessThanSign(RawKind::RawText)),
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.emit_string(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => eof!(),
        },
        State::PlainText => match slf
            .reader
            .read_until(b"\r\0", slf.emitter.characters_mut())?
        {
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.emit_string(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => eof!(),
        },
        State::TagOpen => match read_byte!() {
            Some(b'!') => switch_to!(State::MarkupDeclarationOpen),
            Some(b'/') => switch_to!(State::EndTagOpen),
            Some(x) if x.is_ascii_alphabetic() => {
                slf.emitter.init_start_tag();
                reconsume_in!(Some(x), State::TagName)
            }
            c @ Some(b'?') => {
                error!(ParseError::UnexpectedQuestionMarkInsteadOfTagName);
                slf.emitter.init_comment();
                reconsume_in!(c, State::BogusComment)
            }
            None => {
                error!(ParseError::EofBeforeTagName);
                slf.emitter.emit_string(b"<");
                eof!()
            }
            c => {
                error!(ParseError::InvalidFirstCharacterOfTagName);
                slf.emitter.emit_string(b"<");
                reconsume_in!(c, State::Data)
            }
        },
        State::EndTagOpen => match read_byte!() {
            Some(x) if x.is_ascii_alphabetic() => {
                slf.emitter.init_end_tag();
                reconsume_in!(Some(x), State::TagName)
            }
            Some(b'>') => {
                error!(ParseError::MissingEndTagName);
                switch_to!(State::Data)
            }
            None => {
                error!(ParseError::EofBeforeTagName);
                slf.emitter.emit_string(b"</");
                eof!()
            }
            c => {
                error!(ParseError::InvalidFirstCharacterOfTagName);
                slf.emitter.init_comment();
                reconsume_in!(c, State::BogusComment)
            }
        },
        State::TagName => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => switch_to!(State::BeforeAttributeName),
            Some(b'/') => switch_to!(State::SelfClosingStartTag),
            Some(b'>') => emit_current_tag_and_switch!(),
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_tag_name(REPLACEMENT);
                cont!()
            }
            Some(x) => {
                slf.emitter.push_tag_name(&[x.to_ascii_lowercase()]);
                cont!()
            }
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
        },
        State::RawLessThanSign(kind) => match read_byte!() {
            Some(b'/') => {
                slf.temporary_buffer.clear();
                switch_to!(State::RawEndTagOpen(kind))
            }
            c => {
                slf.emitter.emit_string(b"<");
                reconsume_in!(c, kind.state())
            }
        },
        State::RawEndTagOpen(kind) => match read_byte!() {
            Some(x) if x.is_ascii_alphabetic() => {
                slf.emitter.init_end_tag();
                reconsume_in!(Some(x), State::RawEndTagName(kind))
            }
            c => {
                slf.emitter.emit_string(b"</");
                reconsume_in!(c, kind.state())
            }
        },
        State::RawEndTagName(kind) => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ')
                if slf.emitter.current_is_appropriate_end_tag_token() =>
            {
                switch_to!(State::BeforeAttributeName)
            }
            Some(b'/') if slf.emitter.current_is_appropriate_end_tag_token() => {
                switch_to!(State::SelfClosingStartTag)
            }
            Some(b'>') if slf.emitter.current_is_appropriate_end_tag_token() => {
                emit_current_tag_and_switch!()
            }
            Some(x) if x.is_ascii_alphabetic() => {
                slf.emitter.push_tag_name(&[x.to_ascii_lowercase()]);
                slf.temporary_buffer.push(x);
                cont!()
            }
            c => {
                slf.emitter.emit_string(b"</");
                slf.emitter.emit_string(&slf.temporary_buffer);
                reconsume_in!(c, kind.state())
            }
        },
        State::BeforeAttributeName => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => cont!(),
            c @ (Some(b'/' | b'>') | None) => reconsume_in!(c, State::AfterAttributeName),
            Some(b'=') => {
                error!(ParseError::UnexpectedEqualsSignBeforeAttributeName);
                slf.emitter.init_attribute();
                slf.emitter.push_attribute_name(b"=");
                switch_to!(State::AttributeName)
            }
            c => {
                slf.emitter.init_attribute();
                reconsume_in!(c, State::AttributeName)
            }
        },
        State::AttributeName => match read_byte!() {
            c @ (Some(b'\t' | b'\n' | b'\x0c' | b' ' | b'/' | b'>') | None) => {
                reconsume_in!(c, State::AfterAttributeName)
            }
            Some(b'=') => switch_to!(State::BeforeAttributeValue),
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_attribute_name(REPLACEMENT);
                cont!()
            }
            Some(x @ (b'"' | b'\'' | b'<')) => {
                error!(ParseError::UnexpectedCharacterInAttributeName);
                slf.emitter.push_attribute_name(&[x]);
                cont!()
            }
            Some(x) => {
                slf.emitter.push_attribute_name(&[x.to_ascii_lowercase()]);
                cont!()
            }
        },
        State::AfterAttributeName => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => cont!(),
            Some(b'/') => switch_to!(State::SelfClosingStartTag),
            Some(b'=') => switch_to!(State::BeforeAttributeValue),
            Some(b'>') => emit_current_tag_and_switch!(),
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
            c => {
                slf.emitter.init_attribute();
                reconsume_in!(c, State::AttributeName)
            }
        },
        State::BeforeAttributeValue => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => cont!(),
            Some(b'"') => switch_to!(State::AttributeValueDoubleQuoted),
            Some(b'\'') => switch_to!(State::AttributeValueSingleQuoted),
            Some(b'>') => {
                error!(ParseError::MissingAttributeValue);
                emit_current_tag_and_switch!()
            }
            c => reconsume_in!(c, State::AttributeValueUnquoted),
        },
        State::AttributeValueDoubleQuoted => match slf
            .reader
            .read_until(b"\"&\r\0", slf.emitter.attribute_value_mut())?
        {
            Some(b'"') => switch_to!(State::AfterAttributeValueQuoted),
            Some(b'&') => {
                consume_character_reference(slf, true)?;
                cont!()
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_attribute_value(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
        },
        State::AttributeValueSingleQuoted => match slf
            .reader
            .read_until(b"'&\r\0", slf.emitter.attribute_value_mut())?
        {
            Some(b'\'') => switch_to!(State::AfterAttributeValueQuoted),
            Some(b'&') => {
                consume_character_reference(slf, true)?;
                cont!()
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_attribute_value(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
        },
        State::AttributeValueUnquoted => match slf
            .reader
            .read_until(b"\t\n\x0c \r&>\0\"'<=`", slf.emitter.attribute_value_mut())?
        {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => switch_to!(State::BeforeAttributeName),
            Some(b'&') => {
                consume_character_reference(slf, true)?;
                cont!()
            }
            Some(b'>') => emit_current_tag_and_switch!(),
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_attribute_value(REPLACEMENT);
                cont!()
            }
            Some(x) => {
                error!(ParseError::UnexpectedCharacterInUnquotedAttributeValue);
                slf.emitter.push_attribute_value(&[x]);
                cont!()
            }
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
        },
        State::AfterAttributeValueQuoted => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => switch_to!(State::BeforeAttributeName),
            Some(b'/') => switch_to!(State::SelfClosingStartTag),
            Some(b'>') => emit_current_tag_and_switch!(),
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
            c => {
                error!(ParseError::MissingWhitespaceBetweenAttributes);
                reconsume_in!(c, State::BeforeAttributeName)
            }
        },
        State::SelfClosingStartTag => match read_byte!() {
            Some(b'>') => {
                slf.emitter.set_self_closing();
                emit_current_tag_and_switch!()
            }
            None => {
                error!(ParseError::EofInTag);
                eof!()
            }
            c => {
                error!(ParseError::UnexpectedSolidusInTag);
                reconsume_in!(c, State::BeforeAttributeName)
            }
        },
        State::MarkupDeclarationOpen => {
            if slf.reader.try_read_string(b"--", true)? {
                slf.emitter.init_comment();
                switch_to!(State::CommentStart)
            } else if slf.reader.try_read_string(b"doctype", false)? {
                slf.emitter.init_doctype();
                switch_to!(State::BeforeDoctype)
            } else if slf.reader.try_read_string(b"[CDATA[", true)? {
                error!(ParseError::CdataInHtmlContent);
                slf.emitter.init_comment();
                slf.emitter.push_comment(b"[CDATA[");
                switch_to!(State::BogusComment)
            } else {
                error!(ParseError::IncorrectlyOpenedComment);
                slf.emitter.init_comment();
                switch_to!(State::BogusComment)
            }
        }
        State::BogusComment => match slf.reader.read_until(b">\r\0", slf.emitter.data_mut())? {
            Some(b'>') => {
                slf.emitter.emit_current_comment();
                switch_to!(State::Data)
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_comment(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => {
                slf.emitter.emit_current_comment();
                eof!()
            }
        },
        State::CommentStart => match read_byte!() {
            Some(b'-') => switch_to!(State::CommentStartDash),
            Some(b'>') => {
                error!(ParseError::AbruptClosingOfEmptyComment);
                slf.emitter.emit_current_comment();
                switch_to!(State::Data)
            }
            c => reconsume_in!(c, State::Comment),
        },
        State::CommentStartDash => match read_byte!() {
            Some(b'-') => switch_to!(State::CommentEnd),
            Some(b'>') => {
                error!(ParseError::AbruptClosingOfEmptyComment);
                slf.emitter.emit_current_comment();
                switch_to!(State::Data)
            }
            None => {
                error!(ParseError::EofInComment);
                slf.emitter.emit_current_comment();
                eof!()
            }
            c => {
                slf.emitter.push_comment(b"-");
                reconsume_in!(c, State::Comment)
            }
        },
        State::Comment => match slf.reader.read_until(b"-\r\0", slf.emitter.data_mut())? {
            Some(b'-') => switch_to!(State::CommentEndDash),
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_comment(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => {
                error!(ParseError::EofInComment);
                slf.emitter.emit_current_comment();
                eof!()
            }
        },
        State::CommentEndDash => match read_byte!() {
            Some(b'-') => switch_to!(State::CommentEnd),
            None => {
                error!(ParseError::EofInComment);
                slf.emitter.emit_current_comment();
                eof!()
            }
            c => {
                slf.emitter.push_comment(b"-");
                reconsume_in!(c, State::Comment)
            }
        },
        State::CommentEnd => match read_byte!() {
            Some(b'>') => {
                slf.emitter.emit_current_comment();
                switch_to!(State::Data)
            }
            Some(b'!') => switch_to!(State::CommentEndBang),
            Some(b'-') => {
                slf.emitter.push_comment(b"-");
                cont!()
            }
            None => {
                error!(ParseError::EofInComment);
                slf.emitter.emit_current_comment();
                eof!()
            }
            c => {
                slf.emitter.push_comment(b"--");
                reconsume_in!(c, State::Comment)
            }
        },
        State::CommentEndBang => match read_byte!() {
            Some(b'-') => {
                slf.emitter.push_comment(b"--!");
                switch_to!(State::CommentEndDash)
            }
            Some(b'>') => {
                error!(ParseError::IncorrectlyClosedComment);
                slf.emitter.emit_current_comment();
                switch_to!(State::Data)
            }
            None => {
                error!(ParseError::EofInComment);
                slf.emitter.emit_current_comment();
                eof!()
            }
            c => {
                slf.emitter.push_comment(b"--!");
                reconsume_in!(c, State::Comment)
            }
        },
        State::BeforeDoctype => match read_byte!() {
            Some(b'\t' | b'\n' | b'\x0c' | b' ') => cont!(),
            c => reconsume_in!(c, State::Doctype),
        },
        State::Doctype => match slf.reader.read_until(b">\r\0", slf.emitter.data_mut())? {
            Some(b'>') => {
                slf.emitter.emit_current_doctype();
                switch_to!(State::Data)
            }
            Some(b'\0') => {
                error!(ParseError::UnexpectedNullCharacter);
                slf.emitter.push_doctype(REPLACEMENT);
                cont!()
            }
            Some(_) => cont!(),
            None => {
                error!(ParseError::EofInDoctype);
                slf.emitter.emit_current_doctype();
                eof!()
            }
        },
    }
}

/// Consume a character reference after its `&` has been read, and append the result to the
/// current attribute value or to the pending text.
fn consume_character_reference<R: Reader>(
    slf: &mut Tokenizer<R>,
    in_attribute: bool,
) -> Result<(), R::Error> {
    macro_rules! flush {
        ($s:expr) => {
            if in_attribute {
                slf.emitter.push_attribute_value($s);
            } else {
                slf.emitter.emit_string($s);
            }
        };
    }

    match slf.reader.read_byte()? {
        Some(b'#') => consume_numeric_character_reference(slf, in_attribute),
        Some(x) if x.is_ascii_alphanumeric() => {
            let mut candidate = vec![x];
            loop {
                match slf.reader.read_byte()? {
                    Some(x) if x.is_ascii_alphanumeric() && candidate.len() < entities::MAX_NAME_LEN => {
                        candidate.push(x)
                    }
                    Some(b';') => {
                        candidate.push(b';');
                        break;
                    }
                    c => {
                        slf.reader.unread_byte(c);
                        break;
                    }
                }
            }

            let (len, c) = match entities::match_named(&candidate) {
                Some(found) => found,
                None => {
                    if candidate.last() == Some(&b';') {
                        slf.emitter
                            .emit_error(ParseError::UnknownNamedCharacterReference);
                    }
                    flush!(b"&");
                    flush!(&candidate);
                    return Ok(());
                }
            };

            let (matched, rest) = candidate.split_at(len);
            for &x in rest.iter().rev() {
                slf.reader.unread_byte(Some(x));
            }

            if matched.last() != Some(&b';') {
                if in_attribute {
                    let next = match rest.first() {
                        Some(&x) => Some(x),
                        None => {
                            let next = slf.reader.read_byte()?;
                            slf.reader.unread_byte(next);
                            next
                        }
                    };
                    // historical: `href="?a=1&copy=2"` must stay as written
                    if matches!(next, Some(x) if x == b'=' || x.is_ascii_alphanumeric()) {
                        flush!(b"&");
                        flush!(matched);
                        return Ok(());
                    }
                }
                slf.emitter
                    .emit_error(ParseError::MissingSemicolonAfterCharacterReference);
            }

            let mut char_buf = [0; 4];
            flush!(c.encode_utf8(&mut char_buf).as_bytes());
            Ok(())
        }
        c => {
            slf.reader.unread_byte(c);
            flush!(b"&");
            Ok(())
        }
    }
}

fn consume_numeric_character_reference<R: Reader>(
    slf: &mut Tokenizer<R>,
    in_attribute: bool,
) -> Result<(), R::Error> {
    macro_rules! flush {
        ($s:expr) => {
            if in_attribute {
                slf.emitter.push_attribute_value($s);
            } else {
                slf.emitter.emit_string($s);
            }
        };
    }

    let mut prefix = b"&#".to_vec();
    let radix = match slf.reader.read_byte()? {
        Some(x @ (b'x' | b'X')) => {
            prefix.push(x);
            16
        }
        c => {
            slf.reader.unread_byte(c);
            10
        }
    };

    let mut code: u32 = 0;
    let mut digits = 0;
    loop {
        let c = slf.reader.read_byte()?;
        match c.and_then(|x| char::from(x).to_digit(radix)) {
            Some(d) => {
                digits += 1;
                // anything above the unicode range is an error, so there is no need to keep
                // counting
                code = code
                    .checked_mul(radix)
                    .and_then(|code| code.checked_add(d))
                    .map_or(0x110000, |code| code.min(0x110000));
            }
            None if digits == 0 => {
                slf.reader.unread_byte(c);
                slf.emitter
                    .emit_error(ParseError::AbsenceOfDigitsInNumericCharacterReference);
                flush!(&prefix);
                return Ok(());
            }
            None => {
                if c != Some(b';') {
                    slf.reader.unread_byte(c);
                    slf.emitter
                        .emit_error(ParseError::MissingSemicolonAfterCharacterReference);
                }
                break;
            }
        }
    }

    let (c, error) = entities::numeric(code);
    if let Some(error) = error {
        slf.emitter.emit_error(error);
    }
    let mut char_buf = [0; 4];
    flush!(c.encode_utf8(&mut char_buf).as_bytes());
    Ok(())
}
