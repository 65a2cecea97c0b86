//! Declarative policies, for configuration files.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Policy, PolicyBuilder};
use crate::Error;

/// A built-in policy to start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// [`Policy::strict`].
    Strict,
    /// [`Policy::ugc`].
    Ugc,
}

/// One attribute rule: [`PolicyBuilder::allow_attributes`] and what follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeConfig {
    /// Attribute names.
    pub names: Vec<String>,
    /// Pattern values must match in full.
    pub matching: Option<String>,
    /// Elements the attributes are allowed on. Absent means globally.
    pub on_elements: Option<Vec<String>>,
}

/// One CSS property rule: [`PolicyBuilder::allow_styles`] and what follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Property names.
    pub properties: Vec<String>,
    /// Pattern values must match in full.
    pub matching: Option<String>,
    /// Elements that may carry `style` with these properties. Absent means every element an
    /// attribute rule permits `style` on.
    pub on_elements: Option<Vec<String>>,
}

/// A serializable description of a [`Policy`].
///
/// Everything is optional. Lists add to the preset, flags override it.
///
/// ```rust
/// use html5scrub::{Policy, PolicyConfig};
///
/// let config: PolicyConfig = serde_json::from_str(r#"{
///     "preset": "ugc",
///     "elements": ["font"],
///     "attributes": [{"names": ["color"], "matching": "[a-z]+", "on_elements": ["font"]}],
///     "require_nofollow_on_links": true
/// }"#).unwrap();
/// let policy = Policy::try_from(config).unwrap();
///
/// assert_eq!(
///     policy.sanitize(r#"<font color=red size=7><a href="/x">x</a></font>"#).unwrap(),
///     r#"<font color="red"><a href="/x" rel="nofollow">x</a></font>"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// The preset to layer everything else on. Absent means an empty policy.
    pub preset: Option<Preset>,
    /// [`PolicyBuilder::allow_elements`]
    pub elements: Vec<String>,
    /// [`PolicyBuilder::allow_attributes`]
    pub attributes: Vec<AttributeConfig>,
    /// [`PolicyBuilder::allow_styles`]
    pub styles: Vec<StyleConfig>,
    /// [`PolicyBuilder::allow_url_schemes`]
    pub url_schemes: Vec<String>,
    /// [`PolicyBuilder::allow_relative_urls`]
    pub allow_relative_urls: Option<bool>,
    /// [`PolicyBuilder::allow_doctype`]
    pub allow_doctype: Option<bool>,
    /// [`PolicyBuilder::allow_comments`]
    pub allow_comments: Option<bool>,
    /// [`PolicyBuilder::require_nofollow_on_links`]
    pub require_nofollow_on_links: Option<bool>,
    /// [`PolicyBuilder::skip_disallowed_content`]
    pub skip_disallowed_content: Option<bool>,
    /// [`PolicyBuilder::skip_content_of_elements`]
    pub skip_content_of_elements: Vec<String>,
}

impl PolicyConfig {
    /// Build the policy this configuration describes.
    pub fn build(&self) -> Result<Policy, Error> {
        let mut builder = match self.preset {
            None => PolicyBuilder::new(),
            Some(Preset::Strict) => PolicyBuilder::strict(),
            Some(Preset::Ugc) => PolicyBuilder::ugc(),
        };

        if !self.elements.is_empty() {
            builder.allow_elements(&self.elements);
        }
        if !self.skip_content_of_elements.is_empty() {
            builder.skip_content_of_elements(&self.skip_content_of_elements);
        }
        if !self.url_schemes.is_empty() {
            builder.allow_url_schemes(&self.url_schemes);
        }

        for attribute in &self.attributes {
            let mut rule = builder.allow_attributes(&attribute.names);
            if let Some(ref pattern) = attribute.matching {
                rule = rule.matching(compile(pattern, &attribute.names)?);
            }
            match attribute.on_elements {
                Some(ref elements) => rule.on_elements(elements),
                None => rule.globally(),
            };
        }

        for style in &self.styles {
            let mut rule = builder.allow_styles(&style.properties);
            if let Some(ref pattern) = style.matching {
                rule = rule.matching(compile(pattern, &style.properties)?);
            }
            match style.on_elements {
                Some(ref elements) => rule.on_elements(elements),
                None => rule.globally(),
            };
        }

        if let Some(allow) = self.allow_relative_urls {
            builder.allow_relative_urls(allow);
        }
        if let Some(allow) = self.allow_doctype {
            builder.allow_doctype(allow);
        }
        if let Some(allow) = self.allow_comments {
            builder.allow_comments(allow);
        }
        if let Some(require) = self.require_nofollow_on_links {
            builder.require_nofollow_on_links(require);
        }
        if let Some(skip) = self.skip_disallowed_content {
            builder.skip_disallowed_content(skip);
        }

        builder.build()
    }
}

impl TryFrom<PolicyConfig> for Policy {
    type Error = Error;

    fn try_from(config: PolicyConfig) -> Result<Policy, Error> {
        config.build()
    }
}

fn compile(pattern: &str, target: &[String]) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        target: target.join(", "),
        source,
    })
}
