use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use super::elements::SKIP_CONTENT_ELEMENTS;
use super::{presets, AttributePolicy, AttributeScope, ElementRule, Policy};
use crate::style::StylePolicy;
use crate::Error;

// Builder misuse, kept until `build()` so that calls can be chained freely.
#[derive(Debug, Clone)]
enum Misuse {
    InvalidPattern { target: String, source: regex::Error },
    InvalidName(String),
    MissingNames(&'static str),
}

impl Misuse {
    fn to_error(&self) -> Error {
        match self {
            Misuse::InvalidPattern { target, source } => Error::InvalidPattern {
                target: target.clone(),
                source: source.clone(),
            },
            Misuse::InvalidName(name) => Error::InvalidName(name.clone()),
            Misuse::MissingNames(rule) => Error::MissingNames { rule: *rule },
        }
    }
}

/// Assembles a [`Policy`].
///
/// Every method takes and returns `&mut PolicyBuilder`, so calls chain. Mistakes such as invalid
/// names or rules that were never finished are collected and reported by [`PolicyBuilder::build`].
///
/// ```rust
/// use html5scrub::PolicyBuilder;
/// use regex::Regex;
///
/// let policy = PolicyBuilder::new()
///     .allow_elements(["p", "b", "i"])
///     .allow_attributes(["href"])
///     .on_elements(["a"])
///     .allow_attributes(["width", "height"])
///     .matching(Regex::new("[0-9]+").unwrap())
///     .on_elements(["img"])
///     .allow_url_schemes(["https"])
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     policy.sanitize(r#"<a href="https://x" target=_blank>x</a><img width=1 height=wide>"#).unwrap(),
///     r#"<a href="https://x">x</a><img width="1">"#
/// );
/// ```
///
/// Changing a builder never affects policies it already built.
#[derive(Debug)]
pub struct PolicyBuilder {
    policy: Policy,
    misuse: Vec<Misuse>,
    unfinished: BTreeMap<usize, Vec<String>>,
    next_rule: usize,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        PolicyBuilder::new()
    }
}

impl PolicyBuilder {
    /// An empty policy: no elements, no attributes, no URL schemes.
    ///
    /// Content-opaque elements such as `script` and `style` are already marked so that their
    /// content is discarded rather than unwrapped.
    pub fn new() -> Self {
        let mut builder = PolicyBuilder {
            policy: Policy::empty(),
            misuse: Vec::new(),
            unfinished: BTreeMap::new(),
            next_rule: 0,
        };
        builder.skip_content_of_elements(SKIP_CONTENT_ELEMENTS);
        builder
    }

    /// Start from the strict preset.
    pub fn strict() -> Self {
        presets::strict_builder()
    }

    /// Start from the user-generated-content preset.
    pub fn ugc() -> Self {
        presets::ugc_builder()
    }

    /// Whitelist elements, without any attributes.
    pub fn allow_elements<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for name in self.names(names, "allow_elements") {
            self.rule_mut(&name).allowed = true;
        }
        self
    }

    /// Start a rule allowing attributes. Finish it with [`AttributeRuleBuilder::on_elements`] or
    /// [`AttributeRuleBuilder::globally`].
    pub fn allow_attributes<I>(&mut self, names: I) -> AttributeRuleBuilder<'_>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names = self.names(names, "allow_attributes");
        let id = self.open_rule(&names);
        AttributeRuleBuilder {
            builder: self,
            id,
            names,
            pattern: None,
        }
    }

    /// Start a rule allowing CSS properties inside `style` attributes. Finish it with
    /// [`StyleRuleBuilder::on_elements`] or [`StyleRuleBuilder::globally`].
    pub fn allow_styles<I>(&mut self, properties: I) -> StyleRuleBuilder<'_>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let properties = self.names(properties, "allow_styles");
        let id = self.open_rule(&properties);
        StyleRuleBuilder {
            builder: self,
            id,
            properties,
            pattern: None,
        }
    }

    /// Whitelist URL schemes such as `https` or `mailto:`. `javascript` and `vbscript` are
    /// rejected regardless.
    pub fn allow_url_schemes<I>(&mut self, schemes: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for scheme in schemes {
            let scheme = scheme.as_ref();
            let canonical = scheme.strip_suffix(':').unwrap_or(scheme).to_ascii_lowercase();
            if is_valid_scheme(&canonical) {
                self.policy.url.schemes.insert(canonical);
            } else {
                self.misuse.push(Misuse::InvalidName(scheme.to_owned()));
            }
        }
        self
    }

    /// Allow URLs without a scheme (`/path`, `//host/path`, `page.html`).
    pub fn allow_relative_urls(&mut self, allow: bool) -> &mut Self {
        self.policy.url.allow_relative = allow;
        self
    }

    /// Keep `<!DOCTYPE>` declarations.
    pub fn allow_doctype(&mut self, allow: bool) -> &mut Self {
        self.policy.allow_doctype = allow;
        self
    }

    /// Keep comments, except conditional comments.
    pub fn allow_comments(&mut self, allow: bool) -> &mut Self {
        self.policy.allow_comments = allow;
        self
    }

    /// Add `rel="nofollow"` to every kept link.
    pub fn require_nofollow_on_links(&mut self, require: bool) -> &mut Self {
        self.policy.require_nofollow_on_links = require;
        self
    }

    /// Discard the content of every disallowed element instead of unwrapping it.
    pub fn skip_disallowed_content(&mut self, skip: bool) -> &mut Self {
        self.policy.skip_disallowed_content = skip;
        self
    }

    /// Discard the content of these elements when they are not whitelisted.
    pub fn skip_content_of_elements<I>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for name in self.names(names, "skip_content_of_elements") {
            self.rule_mut(&name).skip_content_if_disallowed = true;
        }
        self
    }

    /// Freeze the configuration into a [`Policy`].
    ///
    /// Reports the first misuse, or a rule that was started but never finished.
    pub fn build(&self) -> Result<Policy, Error> {
        if let Some(misuse) = self.misuse.first() {
            return Err(misuse.to_error());
        }
        if let Some(names) = self.unfinished.values().next() {
            return Err(Error::UnfinishedRule(names.clone()));
        }

        log::debug!(
            "built policy: {} allowed elements, {} global attribute rules, {} url schemes",
            self.policy.elements.values().filter(|r| r.allowed).count(),
            self.policy.global_attributes.len(),
            self.policy.url.schemes.len()
        );
        Ok(self.policy.clone())
    }

    fn rule_mut(&mut self, name: &str) -> &mut ElementRule {
        self.policy
            .elements
            .entry(name.to_owned())
            .or_insert_with(|| ElementRule::new(name))
    }

    fn open_rule(&mut self, names: &[String]) -> usize {
        let id = self.next_rule;
        self.next_rule += 1;
        self.unfinished.insert(id, names.to_vec());
        id
    }

    /// Lowercase and validate names, recording misuse instead of failing.
    fn names<I>(&mut self, names: I, rule: &'static str) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut seen_any = false;
        let mut canonical = Vec::new();
        for name in names {
            seen_any = true;
            let name = name.as_ref();
            if is_valid_name(name) {
                canonical.push(name.to_ascii_lowercase());
            } else {
                self.misuse.push(Misuse::InvalidName(name.to_owned()));
            }
        }
        if !seen_any {
            self.misuse.push(Misuse::MissingNames(rule));
        }
        canonical
    }

    /// Wrap a pattern so that it has to match the whole value.
    fn anchor(&mut self, pattern: &Regex, target: &[String]) -> Option<Regex> {
        match Regex::new(&format!(r"\A(?:{})\z", pattern.as_str())) {
            Ok(anchored) => Some(anchored),
            Err(source) => {
                self.misuse.push(Misuse::InvalidPattern {
                    target: target.join(", "),
                    source,
                });
                None
            }
        }
    }
}

/// An attribute rule under construction. See [`PolicyBuilder::allow_attributes`].
#[derive(Debug)]
#[must_use = "attribute rules have no effect until on_elements() or globally() is called"]
pub struct AttributeRuleBuilder<'a> {
    builder: &'a mut PolicyBuilder,
    id: usize,
    names: Vec<String>,
    pattern: Option<Regex>,
}

impl<'a> AttributeRuleBuilder<'a> {
    /// Require values to match `pattern` in full.
    pub fn matching(mut self, pattern: Regex) -> Self {
        self.pattern = self.builder.anchor(&pattern, &self.names);
        self
    }

    /// Allow the attributes on these elements, which are whitelisted as a side effect.
    pub fn on_elements<I>(self, elements: I) -> &'a mut PolicyBuilder
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let builder = self.builder;
        builder.unfinished.remove(&self.id);

        let elements = builder.names(elements, "on_elements");
        let scope = AttributeScope::Elements(elements.iter().cloned().collect::<BTreeSet<_>>());
        for element in &elements {
            let rule = builder.rule_mut(element);
            rule.allowed = true;
            for name in &self.names {
                rule.attributes.push(AttributePolicy {
                    name: name.clone(),
                    pattern: self.pattern.clone(),
                    scope: scope.clone(),
                });
            }
        }
        builder
    }

    /// Allow the attributes on every element.
    pub fn globally(self) -> &'a mut PolicyBuilder {
        let builder = self.builder;
        builder.unfinished.remove(&self.id);

        for name in self.names {
            builder.policy.global_attributes.push(AttributePolicy {
                name,
                pattern: self.pattern.clone(),
                scope: AttributeScope::Global,
            });
        }
        builder
    }
}

/// A CSS property rule under construction. See [`PolicyBuilder::allow_styles`].
#[derive(Debug)]
#[must_use = "style rules have no effect until on_elements() or globally() is called"]
pub struct StyleRuleBuilder<'a> {
    builder: &'a mut PolicyBuilder,
    id: usize,
    properties: Vec<String>,
    pattern: Option<Regex>,
}

impl<'a> StyleRuleBuilder<'a> {
    /// Require property values to match `pattern` in full.
    pub fn matching(mut self, pattern: Regex) -> Self {
        self.pattern = self.builder.anchor(&pattern, &self.properties);
        self
    }

    /// Allow `style` on these elements, with the properties on top of the global ones. The
    /// elements are whitelisted as a side effect.
    pub fn on_elements<I>(self, elements: I) -> &'a mut PolicyBuilder
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let builder = self.builder;
        builder.unfinished.remove(&self.id);

        let elements = builder.names(elements, "on_elements");
        let scope = AttributeScope::Elements(elements.iter().cloned().collect::<BTreeSet<_>>());
        for element in &elements {
            let rule = builder.rule_mut(element);
            rule.allowed = true;
            if !rule.attributes.iter().any(|policy| policy.name == "style") {
                rule.attributes.push(AttributePolicy {
                    name: "style".to_owned(),
                    pattern: None,
                    scope: scope.clone(),
                });
            }

            let styles = rule.styles.get_or_insert_with(StylePolicy::default);
            for property in &self.properties {
                styles
                    .properties
                    .entry(property.clone())
                    .or_insert_with(|| self.pattern.clone());
            }
        }
        builder
    }

    /// Allow the properties on every element that may carry a `style` attribute at all, be it
    /// through [`StyleRuleBuilder::on_elements`] or an attribute rule.
    pub fn globally(self) -> &'a mut PolicyBuilder {
        let builder = self.builder;
        builder.unfinished.remove(&self.id);

        let styles = builder.policy.styles.get_or_insert_with(StylePolicy::default);
        for property in self.properties {
            styles
                .properties
                .entry(property)
                .or_insert_with(|| self.pattern.clone());
        }
        builder
    }
}

/// Tag, attribute and CSS property names as the tokenizer can produce them.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_ascii_whitespace()
                || c.is_control()
                || matches!(c, '<' | '>' | '/' | '=' | '"' | '\'')
        })
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}
