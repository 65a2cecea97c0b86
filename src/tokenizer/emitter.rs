use std::collections::VecDeque;
use std::mem;

use super::machine::State;
use crate::error::ParseError;
use crate::{Attribute, EndTag, StartTag, Token};

/// Pick the state the tokenizer continues in after a start tag, the way a tree builder would
/// switch it. Anything not listed here continues in the data state.
pub(crate) fn naive_next_state(tag_name: &[u8]) -> Option<State> {
    match tag_name {
        b"textarea" | b"title" => Some(State::RcData),
        b"plaintext" => Some(State::PlainText),
        b"script" | b"style" | b"iframe" | b"xmp" | b"noembed" | b"noframes" | b"noscript" => {
            Some(State::RawText)
        }
        _ => None,
    }
}

#[derive(Debug)]
enum CurrentToken {
    StartTag {
        name: Vec<u8>,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: Vec<u8>,
        has_attributes: bool,
    },
    Comment,
    Doctype,
}

/// Collects the pieces the state machine produces into [`Token`]s.
#[derive(Debug, Default)]
pub(crate) struct TokenEmitter {
    current_characters: Vec<u8>,
    current_token: Option<CurrentToken>,
    current_attribute: Option<(Vec<u8>, Vec<u8>)>,
    // body of the comment or doctype being built
    current_data: Vec<u8>,
    last_start_tag: Vec<u8>,
    emitted_tokens: VecDeque<Token>,
}

impl TokenEmitter {
    pub(crate) fn pop_token(&mut self) -> Option<Token> {
        self.emitted_tokens.pop_front()
    }

    pub(crate) fn emit_eof(&mut self) {
        self.flush_current_characters();
    }

    pub(crate) fn emit_error(&mut self, error: ParseError) {
        log::trace!("parse error: {}", error);
    }

    pub(crate) fn emit_string(&mut self, s: &[u8]) {
        self.current_characters.extend_from_slice(s);
    }

    /// Direct access to pending text, for bulk reads.
    pub(crate) fn characters_mut(&mut self) -> &mut Vec<u8> {
        &mut self.current_characters
    }

    pub(crate) fn init_start_tag(&mut self) {
        self.current_token = Some(CurrentToken::StartTag {
            name: Vec::new(),
            attributes: Vec::new(),
            self_closing: false,
        });
        self.current_attribute = None;
    }

    pub(crate) fn init_end_tag(&mut self) {
        self.current_token = Some(CurrentToken::EndTag {
            name: Vec::new(),
            has_attributes: false,
        });
        self.current_attribute = None;
    }

    pub(crate) fn init_comment(&mut self) {
        self.current_token = Some(CurrentToken::Comment);
        self.current_data.clear();
    }

    pub(crate) fn init_doctype(&mut self) {
        self.current_token = Some(CurrentToken::Doctype);
        self.current_data.clear();
    }

    pub(crate) fn push_tag_name(&mut self, s: &[u8]) {
        match self.current_token {
            Some(CurrentToken::StartTag { ref mut name, .. })
            | Some(CurrentToken::EndTag { ref mut name, .. }) => name.extend_from_slice(s),
            _ => debug_assert!(false),
        }
    }

    pub(crate) fn push_comment(&mut self, s: &[u8]) {
        debug_assert!(matches!(self.current_token, Some(CurrentToken::Comment)));
        self.current_data.extend_from_slice(s);
    }

    /// Direct access to the comment or doctype being built, for bulk reads.
    pub(crate) fn data_mut(&mut self) -> &mut Vec<u8> {
        debug_assert!(matches!(
            self.current_token,
            Some(CurrentToken::Comment | CurrentToken::Doctype)
        ));
        &mut self.current_data
    }

    pub(crate) fn push_doctype(&mut self, s: &[u8]) {
        debug_assert!(matches!(self.current_token, Some(CurrentToken::Doctype)));
        self.current_data.extend_from_slice(s);
    }

    pub(crate) fn set_self_closing(&mut self) {
        match self.current_token {
            Some(CurrentToken::StartTag {
                ref mut self_closing,
                ..
            }) => *self_closing = true,
            Some(CurrentToken::EndTag { .. }) => {}
            _ => debug_assert!(false),
        }
    }

    pub(crate) fn init_attribute(&mut self) {
        self.flush_current_attribute();
        self.current_attribute = Some(Default::default());
    }

    pub(crate) fn push_attribute_name(&mut self, s: &[u8]) {
        self.current_attribute
            .get_or_insert_with(Default::default)
            .0
            .extend_from_slice(s);
    }

    pub(crate) fn push_attribute_value(&mut self, s: &[u8]) {
        self.attribute_value_mut().extend_from_slice(s);
    }

    /// Direct access to the attribute value being built, for bulk reads.
    pub(crate) fn attribute_value_mut(&mut self) -> &mut Vec<u8> {
        &mut self.current_attribute.get_or_insert_with(Default::default).1
    }

    /// Whether the end tag being built closes the last start tag, which is what ends RCDATA and
    /// RAWTEXT sections.
    pub(crate) fn current_is_appropriate_end_tag_token(&self) -> bool {
        match self.current_token {
            Some(CurrentToken::EndTag { ref name, .. }) => {
                !self.last_start_tag.is_empty() && self.last_start_tag == *name
            }
            _ => false,
        }
    }

    /// Emit the tag being built. For start tags, returns the state the tokenizer should switch
    /// to.
    pub(crate) fn emit_current_tag(&mut self) -> Option<State> {
        self.flush_current_attribute();
        match self.current_token.take() {
            Some(CurrentToken::StartTag {
                name,
                attributes,
                self_closing,
            }) => {
                self.last_start_tag.clone_from(&name);
                self.emit_token(Token::StartTag(StartTag {
                    self_closing,
                    name: into_string(name),
                    attributes,
                }));
                naive_next_state(&self.last_start_tag)
            }
            Some(CurrentToken::EndTag {
                name,
                has_attributes,
            }) => {
                if has_attributes {
                    self.emit_error(ParseError::EndTagWithAttributes);
                }
                self.last_start_tag.clear();
                self.emit_token(Token::EndTag(EndTag {
                    name: into_string(name),
                }));
                None
            }
            _ => {
                debug_assert!(false);
                None
            }
        }
    }

    pub(crate) fn emit_current_comment(&mut self) {
        debug_assert!(matches!(self.current_token, Some(CurrentToken::Comment)));
        self.current_token = None;
        let data = mem::take(&mut self.current_data);
        self.emit_token(Token::Comment(into_string(data)));
    }

    pub(crate) fn emit_current_doctype(&mut self) {
        debug_assert!(matches!(self.current_token, Some(CurrentToken::Doctype)));
        self.current_token = None;
        let mut data = mem::take(&mut self.current_data);
        while data.last().map_or(false, u8::is_ascii_whitespace) {
            data.pop();
        }
        self.emit_token(Token::Doctype(into_string(data)));
    }

    fn emit_token(&mut self, token: Token) {
        self.flush_current_characters();
        self.emitted_tokens.push_back(token);
    }

    fn flush_current_attribute(&mut self) {
        let (name, value) = match self.current_attribute.take() {
            Some(attr) => attr,
            None => return,
        };

        match self.current_token {
            Some(CurrentToken::StartTag {
                ref mut attributes,
                ..
            }) => {
                let name = into_string(name);
                if attributes.iter().any(|attr| attr.name == name) {
                    log::trace!("parse error: duplicate-attribute {:?}", name);
                } else {
                    attributes.push(Attribute {
                        name,
                        value: into_string(value),
                    });
                }
            }
            Some(CurrentToken::EndTag {
                ref mut has_attributes,
                ..
            }) => *has_attributes = true,
            _ => debug_assert!(false),
        }
    }

    fn flush_current_characters(&mut self) {
        if self.current_characters.is_empty() {
            return;
        }

        let s = mem::take(&mut self.current_characters);
        self.emitted_tokens.push_back(Token::Text(into_string(s)));
    }
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
