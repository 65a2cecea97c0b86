//! The sanitization pass: a single walk over a token stream.

use std::mem;

use crate::escape::{escape_angle_brackets_into, escape_into};
use crate::policy::elements::{is_foreign_root, is_void};
use crate::policy::{ElementRule, Policy};
use crate::{EndTag, StartTag, Token};

/// One element that was opened and not closed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The start tag was emitted; the end tag will be too.
    Kept(String),
    /// The tags are dropped, the content is kept.
    Unwrapped(String),
    /// Everything up to the matching end tag is dropped. `depth` counts nested elements of the
    /// same name.
    Skipped {
        /// Lowercase element name.
        name: String,
        /// Open elements named `name`, including the one that started skipping.
        depth: usize,
    },
}

impl Frame {
    /// The lowercase element name.
    pub fn name(&self) -> &str {
        match self {
            Frame::Kept(name) | Frame::Unwrapped(name) | Frame::Skipped { name, .. } => name,
        }
    }
}

/// Per-call state of a sanitization pass.
///
/// [`Policy::sanitize`] and friends drive this for you. Use it directly to sanitize tokens that
/// arrive piecemeal or come from a different tokenizer.
///
/// ```rust
/// use html5scrub::{EndTag, Policy, Sanitizer, StartTag, Token};
///
/// let policy = Policy::ugc();
/// let mut sanitizer = Sanitizer::new(&policy);
/// let mut out = String::new();
/// sanitizer.push(StartTag::new("B").with_attribute("onclick", "x").into(), &mut out);
/// sanitizer.push(Token::Text("1 < 2".to_owned()), &mut out);
/// sanitizer.push(EndTag::new("b").into(), &mut out);
/// assert!(sanitizer.finish().is_empty());
/// assert_eq!(out, "<b>1 &lt; 2</b>");
/// ```
#[derive(Debug)]
pub struct Sanitizer<'p> {
    policy: &'p Policy,
    stack: Vec<Frame>,
}

impl<'p> Sanitizer<'p> {
    /// Start a pass with an empty stack of open elements.
    pub fn new(policy: &'p Policy) -> Self {
        Sanitizer {
            policy,
            stack: Vec::new(),
        }
    }

    /// Elements currently open, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.stack
    }

    /// Sanitize one token, appending whatever survives to `out`.
    pub fn push(&mut self, token: Token, out: &mut String) {
        match token {
            Token::StartTag(tag) => self.start_tag(tag, out),
            Token::EndTag(tag) => self.end_tag(tag, out),
            Token::Text(text) => {
                if !self.skipping() {
                    escape_into(out, &text);
                }
            }
            Token::Comment(comment) => self.comment(&comment, out),
            Token::Doctype(doctype) => self.doctype(&doctype, out),
        }
    }

    /// End the pass. Elements that are still open stay open, no end tags are synthesized; they
    /// are returned for inspection.
    pub fn finish(mut self) -> Vec<Frame> {
        if !self.stack.is_empty() {
            log::debug!("{} elements left open at end of input", self.stack.len());
        }
        mem::take(&mut self.stack)
    }

    fn skipping(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Skipped { .. }))
    }

    fn start_tag(&mut self, tag: StartTag, out: &mut String) {
        let name = tag.name.to_ascii_lowercase();
        // `<svg/>` and `<math/>` are complete elements, unlike `<div/>`
        let closed = is_void(&name) || (tag.self_closing && is_foreign_root(&name));

        if let Some(Frame::Skipped {
            name: skipped,
            depth,
        }) = self.stack.last_mut()
        {
            if *skipped == name && !closed {
                *depth += 1;
            }
            return;
        }

        let rule = match self.policy.element_rule(&name) {
            Some(rule) if rule.allowed => rule,
            rule => {
                let skip = self.policy.skip_disallowed_content
                    || rule.map_or(false, ElementRule::skips_content_if_disallowed);
                if closed {
                    log::debug!("dropping <{}>", name);
                } else if skip {
                    log::debug!("skipping <{}> and its content", name);
                    self.stack.push(Frame::Skipped { name, depth: 1 });
                } else {
                    log::debug!("unwrapping <{}>", name);
                    self.stack.push(Frame::Unwrapped(name));
                }
                return;
            }
        };

        let mut attributes: Vec<(String, String)> = Vec::with_capacity(tag.attributes.len());
        for attribute in tag.attributes {
            let attribute_name = attribute.name.to_ascii_lowercase();
            if attributes.iter().any(|(seen, _)| *seen == attribute_name) {
                continue;
            }
            if let Some(value) = self
                .policy
                .filter_attribute(rule, &attribute_name, &attribute.value)
            {
                attributes.push((attribute_name, value));
            }
        }

        if self.policy.require_nofollow_on_links && name == "a" {
            add_nofollow(&mut attributes);
        }

        if attributes.is_empty() && rule.requires_attributes {
            log::debug!("unwrapping <{}>: no attributes survived", name);
            if !closed {
                self.stack.push(Frame::Unwrapped(name));
            }
            return;
        }

        out.push('<');
        out.push_str(&name);
        for (attribute_name, value) in &attributes {
            out.push(' ');
            out.push_str(attribute_name);
            out.push_str("=\"");
            escape_into(out, value);
            out.push('"');
        }
        out.push_str(if tag.self_closing { "/>" } else { ">" });

        if !closed {
            self.stack.push(Frame::Kept(name));
        }
    }

    fn end_tag(&mut self, tag: EndTag, out: &mut String) {
        let name = tag.name.to_ascii_lowercase();

        if let Some(Frame::Skipped {
            name: skipped,
            depth,
        }) = self.stack.last_mut()
        {
            if *skipped == name {
                *depth -= 1;
                if *depth == 0 {
                    self.stack.pop();
                }
            }
            return;
        }

        if is_void(&name) {
            return;
        }

        let position = match self.stack.iter().rposition(|frame| frame.name() == name) {
            Some(position) => position,
            None => {
                log::trace!("ignoring unmatched </{}>", name);
                return;
            }
        };

        if let Frame::Kept(ref kept) = self.stack[position] {
            out.push_str("</");
            out.push_str(kept);
            out.push('>');
        }
        self.stack.truncate(position);
    }

    fn doctype(&self, doctype: &str, out: &mut String) {
        if self.skipping() {
            return;
        }
        if !self.policy.allow_doctype {
            log::debug!("dropping doctype");
            return;
        }

        out.push_str("<!DOCTYPE ");
        escape_angle_brackets_into(out, doctype);
        out.push('>');
    }

    fn comment(&self, comment: &str, out: &mut String) {
        if self.skipping() {
            return;
        }
        if !self.policy.allow_comments {
            log::debug!("dropping comment");
            return;
        }
        if is_conditional_comment(comment) {
            log::debug!("dropping conditional comment");
            return;
        }

        out.push_str("<!--");
        escape_angle_brackets_into(out, comment);
        out.push_str("-->");
    }
}

/// Make sure a `rel` attribute carries `nofollow`, if the link survived with an `href`.
fn add_nofollow(attributes: &mut Vec<(String, String)>) {
    if !attributes.iter().any(|(name, _)| name == "href") {
        return;
    }

    match attributes.iter_mut().find(|(name, _)| name == "rel") {
        Some((_, rel)) => {
            if !rel
                .split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("nofollow"))
            {
                if !rel.trim().is_empty() {
                    rel.push(' ');
                }
                rel.push_str("nofollow");
            }
        }
        None => attributes.push(("rel".to_owned(), "nofollow".to_owned())),
    }
}

/// `<!--[if IE]>...<![endif]-->` and its variants, which old browsers treat as markup.
fn is_conditional_comment(comment: &str) -> bool {
    let compact: String = comment
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    compact.starts_with("[if") || compact.contains("[endif]") || compact.contains("<[endif")
}
