//! The whitelist a sanitization pass consults.
//!
//! A [`Policy`] is assembled with a [`PolicyBuilder`] (or deserialized from a [`PolicyConfig`]
//! with the `serde` feature) and is immutable afterwards, so one instance can be shared between
//! any number of threads sanitizing concurrently.

mod builder;
#[cfg(feature = "serde")]
mod config;
pub(crate) mod elements;
mod presets;

use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Write};

use regex::Regex;

use crate::sanitizer::Sanitizer;
use crate::style::StylePolicy;
use crate::tokenizer::{IoReader, Tokenizer};
use crate::url::{is_url_attribute, UrlPolicy};
use crate::{Error, Token};

pub use builder::{AttributeRuleBuilder, PolicyBuilder, StyleRuleBuilder};
#[cfg(feature = "serde")]
pub use config::{AttributeConfig, PolicyConfig, Preset, StyleConfig};
pub use elements::{REQUIRES_ATTRIBUTES, SKIP_CONTENT_ELEMENTS, VOID_ELEMENTS};

/// Where an [`AttributePolicy`] applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeScope {
    /// On every element.
    Global,
    /// Only on the listed elements.
    Elements(BTreeSet<String>),
}

/// Permission for one attribute name, optionally constrained by a pattern the whole decoded value
/// must match.
#[derive(Debug, Clone)]
pub struct AttributePolicy {
    pub(crate) name: String,
    pub(crate) pattern: Option<Regex>,
    pub(crate) scope: AttributeScope,
}

impl AttributePolicy {
    /// The lowercase attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The anchored pattern values must match, if any.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Where this policy applies.
    pub fn scope(&self) -> &AttributeScope {
        &self.scope
    }

    fn value_matches(&self, value: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.is_match(value))
    }
}

/// What the policy says about one element name.
///
/// Rules also exist for elements that are not whitelisted, to carry
/// [`ElementRule::skips_content_if_disallowed`].
#[derive(Debug, Clone)]
pub struct ElementRule {
    pub(crate) name: String,
    pub(crate) allowed: bool,
    pub(crate) attributes: Vec<AttributePolicy>,
    pub(crate) styles: Option<StylePolicy>,
    pub(crate) skip_content_if_disallowed: bool,
    pub(crate) requires_attributes: bool,
}

impl ElementRule {
    pub(crate) fn new(name: &str) -> Self {
        ElementRule {
            name: name.to_owned(),
            allowed: false,
            attributes: Vec::new(),
            styles: None,
            skip_content_if_disallowed: false,
            requires_attributes: REQUIRES_ATTRIBUTES.contains(&name),
        }
    }

    /// The lowercase element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the element itself may appear in the output.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Element-specific attribute policies in the order they were added.
    pub fn attributes(&self) -> &[AttributePolicy] {
        &self.attributes
    }

    /// CSS properties allowed in this element's `style` attribute, on top of the global ones.
    pub fn style_policy(&self) -> Option<&StylePolicy> {
        self.styles.as_ref()
    }

    /// Whether the element's whole subtree is discarded when the element is not allowed.
    pub fn skips_content_if_disallowed(&self) -> bool {
        self.skip_content_if_disallowed
    }

    /// Whether the element is unwrapped when none of its attributes survive.
    pub fn requires_attributes(&self) -> bool {
        self.requires_attributes
    }
}

/// An immutable sanitization policy.
///
/// ```rust
/// use html5scrub::Policy;
///
/// let policy = Policy::ugc();
/// assert_eq!(
///     policy.sanitize(r#"<p onclick="steal()">Hi <a href="/me">there</a></p>"#).unwrap(),
///     r#"<p>Hi <a href="/me">there</a></p>"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Policy {
    pub(crate) elements: HashMap<String, ElementRule>,
    pub(crate) global_attributes: Vec<AttributePolicy>,
    pub(crate) url: UrlPolicy,
    pub(crate) styles: Option<StylePolicy>,
    pub(crate) allow_doctype: bool,
    pub(crate) allow_comments: bool,
    pub(crate) require_nofollow_on_links: bool,
    pub(crate) skip_disallowed_content: bool,
}

impl Policy {
    // Only the builder starts from this, and it marks the content-opaque elements right away.
    pub(crate) fn empty() -> Self {
        Policy {
            elements: HashMap::new(),
            global_attributes: Vec::new(),
            url: UrlPolicy::default(),
            styles: None,
            allow_doctype: false,
            allow_comments: false,
            require_nofollow_on_links: false,
            skip_disallowed_content: false,
        }
    }

    /// A policy that removes all markup, along with the content of every element.
    pub fn strict() -> Self {
        presets::strict()
    }

    /// A policy for user-generated content: text formatting, links, images, lists and tables.
    pub fn ugc() -> Self {
        presets::ugc()
    }

    /// Start configuring a policy from scratch.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// Sanitize a string.
    ///
    /// Empty input is reported as [`Error::EmptyInput`].
    pub fn sanitize(&self, input: &str) -> Result<String, Error> {
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }

        Ok(self.sanitize_tokens(Tokenizer::new(input).infallible()))
    }

    /// Sanitize everything `reader` yields into `writer`, writing output as tokens complete.
    ///
    /// A reader that yields no bytes at all is reported as [`Error::EmptyInput`]. I/O errors on
    /// either side are returned as they are.
    pub fn sanitize_reader<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<(), Error> {
        let mut tokenizer = Tokenizer::new(IoReader::new(reader));
        let mut sanitizer = Sanitizer::new(self);
        let mut output = String::new();

        for token in &mut tokenizer {
            sanitizer.push(token?, &mut output);
            if !output.is_empty() {
                writer.write_all(output.as_bytes())?;
                output.clear();
            }
        }

        if tokenizer.reader().bytes_read() == 0 {
            return Err(Error::EmptyInput);
        }

        sanitizer.finish();
        writer.flush()?;
        Ok(())
    }

    /// Run the sanitization pass over any token source.
    pub fn sanitize_tokens<I: IntoIterator<Item = Token>>(&self, tokens: I) -> String {
        let mut sanitizer = Sanitizer::new(self);
        let mut output = String::new();
        for token in tokens {
            sanitizer.push(token, &mut output);
        }
        sanitizer.finish();
        output
    }

    /// The rule for an element name, matched case-insensitively.
    pub fn element_rule(&self, name: &str) -> Option<&ElementRule> {
        match self.elements.get(name) {
            Some(rule) => Some(rule),
            None => self.elements.get(&name.to_ascii_lowercase()),
        }
    }

    /// Attribute policies that apply to every element.
    pub fn global_attributes(&self) -> &[AttributePolicy] {
        &self.global_attributes
    }

    /// The URL scheme whitelist.
    pub fn url_policy(&self) -> &UrlPolicy {
        &self.url
    }

    /// The CSS properties allowed on every element whose `style` attribute is permitted.
    pub fn style_policy(&self) -> Option<&StylePolicy> {
        self.styles.as_ref()
    }

    /// Whether doctypes survive.
    pub fn allows_doctype(&self) -> bool {
        self.allow_doctype
    }

    /// Whether comments survive.
    pub fn allows_comments(&self) -> bool {
        self.allow_comments
    }

    /// Whether kept links get `rel="nofollow"`.
    pub fn requires_nofollow_on_links(&self) -> bool {
        self.require_nofollow_on_links
    }

    /// Whether every disallowed element is discarded with its content instead of unwrapped.
    pub fn skips_disallowed_content(&self) -> bool {
        self.skip_disallowed_content
    }

    /// Decide what becomes of one attribute of a kept element. Returns the value to emit, which
    /// differs from the input only for normalized `style` attributes.
    pub(crate) fn filter_attribute(
        &self,
        rule: &ElementRule,
        name: &str,
        value: &str,
    ) -> Option<String> {
        if name == "style" {
            return self.filter_style(rule, value);
        }

        let policy = match self.resolve_attribute(rule, name) {
            Some(policy) => policy,
            None => {
                log::trace!("dropping {}.{}: not whitelisted", rule.name, name);
                return None;
            }
        };
        if !policy.value_matches(value) {
            log::trace!("dropping {}.{}: value does not match", rule.name, name);
            return None;
        }
        if is_url_attribute(name) && !self.url.allows(value) {
            log::trace!("dropping {}.{}: url not allowed", rule.name, name);
            return None;
        }

        Some(value.to_owned())
    }

    /// `style` needs an attribute policy like any other attribute, and its declarations are then
    /// filtered against the element's CSS properties and the global ones.
    fn filter_style(&self, rule: &ElementRule, value: &str) -> Option<String> {
        let policy = match self.resolve_attribute(rule, "style") {
            Some(policy) => policy,
            None => {
                log::trace!("dropping {}.style: not whitelisted", rule.name);
                return None;
            }
        };
        if rule.styles.is_none() && self.styles.is_none() {
            log::trace!("dropping {}.style: no css properties whitelisted", rule.name);
            return None;
        }
        if !policy.value_matches(value) {
            log::trace!("dropping {}.style: value does not match", rule.name);
            return None;
        }

        let filtered = StylePolicy::filter_layered(rule.styles.as_ref(), self.styles.as_ref(), value);
        if filtered.is_none() {
            log::trace!("dropping {}.style: no declarations survived", rule.name);
        }
        filtered
    }

    /// Element-specific policies first, then global ones, first by insertion order.
    fn resolve_attribute<'a>(&'a self, rule: &'a ElementRule, name: &str) -> Option<&'a AttributePolicy> {
        rule.attributes
            .iter()
            .chain(self.global_attributes.iter())
            .find(|policy| policy.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn policy_is_shareable() {
        assert_send_sync::<Policy>();
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(Policy::strict().sanitize(""), Err(Error::EmptyInput)));

        let mut out = Vec::new();
        assert!(matches!(
            Policy::strict().sanitize_reader(&b""[..], &mut out),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn element_rule_lookup_is_case_insensitive() {
        let policy = Policy::ugc();
        assert!(policy.element_rule("B").unwrap().is_allowed());
        assert!(!policy.element_rule("script").unwrap().is_allowed());
        assert!(policy.element_rule("script").unwrap().skips_content_if_disallowed());
        assert!(policy.element_rule("blink").is_none());
    }

    #[test]
    fn first_matching_policy_wins() {
        let policy = PolicyBuilder::new()
            .allow_attributes(["title"])
            .matching(Regex::new("[a-z]+").unwrap())
            .on_elements(["abbr"])
            .allow_attributes(["title"])
            .globally()
            .build()
            .unwrap();
        let abbr = policy.element_rule("abbr").unwrap();
        let p = ElementRule::new("p");

        // the element-specific pattern shadows the permissive global rule
        assert_eq!(policy.filter_attribute(abbr, "title", "abc"), Some("abc".to_owned()));
        assert_eq!(policy.filter_attribute(abbr, "title", "A B"), None);
        assert_eq!(policy.filter_attribute(&p, "title", "A B"), Some("A B".to_owned()));
        assert_eq!(policy.filter_attribute(&p, "lang", "en"), None);
    }

    #[test]
    fn url_attributes_are_always_checked() {
        let policy = PolicyBuilder::new()
            .allow_attributes(["href", "cite"])
            .globally()
            .allow_url_schemes(["https"])
            .build()
            .unwrap();
        let q = ElementRule::new("q");

        assert!(policy.filter_attribute(&q, "href", "https://x").is_some());
        assert!(policy.filter_attribute(&q, "cite", "javascript:x").is_none());
        assert!(policy.filter_attribute(&q, "href", "/relative").is_none());
    }

    #[test]
    fn style_needs_css_whitelist() {
        let without = PolicyBuilder::new()
            .allow_attributes(["style"])
            .globally()
            .build()
            .unwrap();
        let div = ElementRule::new("div");
        assert_eq!(without.filter_attribute(&div, "style", "color: red"), None);

        let with = PolicyBuilder::new()
            .allow_attributes(["style"])
            .globally()
            .allow_styles(["color"])
            .globally()
            .build()
            .unwrap();
        assert_eq!(
            with.filter_attribute(&div, "style", "COLOR:red;float:left"),
            Some("color: red".to_owned())
        );
        assert_eq!(with.filter_attribute(&div, "style", "float:left"), None);
    }

    #[test]
    fn style_needs_an_attribute_permission() {
        let policy = PolicyBuilder::new()
            .allow_elements(["div"])
            .allow_attributes(["title"])
            .on_elements(["p"])
            .allow_styles(["color"])
            .globally()
            .build()
            .unwrap();
        let div = policy.element_rule("div").unwrap();
        let p = policy.element_rule("p").unwrap();

        assert_eq!(policy.filter_attribute(div, "style", "color: red"), None);
        assert_eq!(policy.filter_attribute(p, "style", "color: blue"), None);
        assert_eq!(policy.filter_attribute(p, "title", "t"), Some("t".to_owned()));
    }

    #[test]
    fn element_styles_layer_over_global_ones() {
        let policy = PolicyBuilder::new()
            .allow_elements(["div"])
            .allow_styles(["color"])
            .globally()
            .allow_styles(["text-align"])
            .on_elements(["p"])
            .build()
            .unwrap();
        let div = policy.element_rule("div").unwrap();
        let p = policy.element_rule("p").unwrap();

        assert!(p.is_allowed());
        assert_eq!(
            policy.filter_attribute(p, "style", "color: red; text-align: left"),
            Some("color: red; text-align: left".to_owned())
        );
        assert_eq!(policy.filter_attribute(div, "style", "color: red"), None);
    }

    #[test]
    fn sanitize_reader_matches_sanitize() {
        let policy = Policy::ugc();
        let input = "<p>caf\u{e9} <b onclick=x>&amp;</b><script>x</script></p>".repeat(3000);

        let mut out = Vec::new();
        policy.sanitize_reader(input.as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), policy.sanitize(&input).unwrap());
    }
}
