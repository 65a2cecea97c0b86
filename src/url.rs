//! Validation of attributes that carry URLs.

use std::collections::BTreeSet;

/// Attributes whose values browsers resolve as URLs. Their values are always checked against the
/// [`UrlPolicy`], in addition to any pattern the attribute rule carries.
pub const URL_ATTRIBUTES: &[&str] = &[
    "action",
    "archive",
    "background",
    "cite",
    "classid",
    "codebase",
    "data",
    "dynsrc",
    "formaction",
    "href",
    "icon",
    "longdesc",
    "lowsrc",
    "manifest",
    "poster",
    "profile",
    "src",
    "usemap",
    "xmlns",
];

// Executable no matter what the caller whitelists.
const DENIED_SCHEMES: &[&str] = &["javascript", "vbscript"];

/// Whether browsers treat the attribute `name` as a URL.
pub fn is_url_attribute(name: &str) -> bool {
    URL_ATTRIBUTES.contains(&name)
}

/// Which URLs may survive in URL-bearing attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPolicy {
    pub(crate) schemes: BTreeSet<String>,
    pub(crate) allow_relative: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Scheme<'a> {
    Relative,
    Named(&'a str),
    Invalid,
}

impl UrlPolicy {
    /// The whitelisted schemes, lowercase and without the trailing `:`.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.schemes.iter().map(String::as_str)
    }

    /// Whether scheme-less URLs (`/path`, `//host/path`, `page.html`, `#top`) are allowed.
    pub fn allows_relative(&self) -> bool {
        self.allow_relative
    }

    /// Check an already entity-decoded attribute value.
    ///
    /// ```rust
    /// let policy = html5scrub::Policy::ugc();
    /// let urls = policy.url_policy();
    /// assert!(urls.allows("HTTPS://example.org"));
    /// assert!(!urls.allows(" java\tscript:alert(1)"));
    /// ```
    pub fn allows(&self, value: &str) -> bool {
        let value = value.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control());

        match scheme_of(value) {
            Scheme::Relative => self.allow_relative,
            Scheme::Invalid => false,
            Scheme::Named(scheme) => {
                let scheme = scheme.to_ascii_lowercase();
                !DENIED_SCHEMES.contains(&scheme.as_str()) && self.schemes.contains(&scheme)
            }
        }
    }
}

fn scheme_of(url: &str) -> Scheme<'_> {
    let delimiter = match url.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if url.as_bytes()[i] == b':' => i,
        _ => return Scheme::Relative,
    };

    let scheme = &url[..delimiter];
    let mut bytes = scheme.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Scheme::Invalid,
    }
    if bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')) {
        Scheme::Named(scheme)
    } else {
        Scheme::Invalid
    }
}
