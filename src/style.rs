//! Filtering of inline `style` attributes, one declaration at a time.

use std::collections::BTreeMap;

use regex::Regex;

// Checked against a normalized copy of every value, whitelisted property or not.
const DENIED_FRAGMENTS: &[&str] = &[
    "expression(",
    "url(javascript:",
    "url(vbscript:",
    "javascript:",
    "-moz-binding",
];

/// Which CSS declarations may survive inside a `style` attribute.
#[derive(Debug, Clone, Default)]
pub struct StylePolicy {
    pub(crate) properties: BTreeMap<String, Option<Regex>>,
}

impl StylePolicy {
    /// Whether `property` (lowercase) is whitelisted at all.
    pub fn allows_property(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Filter the declarations of a `style` attribute value.
    ///
    /// Returns the surviving declarations normalized to `property: value` and joined by `; `, or
    /// `None` if nothing survived and the attribute should be dropped.
    ///
    /// ```rust
    /// use html5scrub::PolicyBuilder;
    ///
    /// let policy = PolicyBuilder::new()
    ///     .allow_styles(["color"])
    ///     .globally()
    ///     .build()
    ///     .unwrap();
    /// let styles = policy.style_policy().unwrap();
    /// assert_eq!(
    ///     styles.filter("COLOR:red;position:fixed").as_deref(),
    ///     Some("color: red")
    /// );
    /// assert_eq!(styles.filter("color: expression(alert(1))"), None);
    /// ```
    pub fn filter(&self, style: &str) -> Option<String> {
        filter_declarations(style, |property| self.properties.get(property))
    }

    /// Filter against element-specific rules first, then the global ones.
    pub(crate) fn filter_layered(
        element: Option<&StylePolicy>,
        global: Option<&StylePolicy>,
        style: &str,
    ) -> Option<String> {
        filter_declarations(style, |property| {
            element
                .and_then(|styles| styles.properties.get(property))
                .or_else(|| global.and_then(|styles| styles.properties.get(property)))
        })
    }
}

fn filter_declarations<'a, F>(style: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<&'a Option<Regex>>,
{
    let mut kept: Vec<String> = Vec::new();

    for declaration in split_declarations(style) {
        let (property, value) = match declaration.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();

        if property.is_empty() || value.is_empty() {
            continue;
        }
        if !property.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            log::trace!("dropping css property {:?}: malformed name", property);
            continue;
        }
        if is_denied(value) {
            log::trace!("dropping css property {:?}: denied value", property);
            continue;
        }

        let allowed = match lookup(&property) {
            Some(Some(pattern)) => pattern.is_match(value),
            Some(None) => true,
            None => false,
        };
        if allowed {
            kept.push(format!("{}: {}", property, value));
        } else {
            log::trace!("dropping css property {:?}: not whitelisted", property);
        }
    }

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("; "))
    }
}

/// Split on `;`, except inside quotes or parentheses, so that `url("a;b")` stays in one piece.
fn split_declarations(style: &str) -> impl Iterator<Item = &str> {
    let mut declarations = Vec::new();
    let mut quote = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&style[start..]);
    declarations.into_iter()
}

/// Normalize the way browsers would before looking for denied fragments: lowercase, CSS escapes
/// decoded, comments, whitespace and stray backslashes removed.
fn is_denied(value: &str) -> bool {
    let normalized = normalize(value);
    DENIED_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut last = None;
                for c in chars.by_ref() {
                    if last == Some('*') && c == '/' {
                        break;
                    }
                    last = Some(c);
                }
            }
            '\\' => {
                let mut code = 0u32;
                let mut digits = 0;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    if digits == 6 {
                        break;
                    }
                    code = code * 16 + d;
                    digits += 1;
                    chars.next();
                }
                if digits > 0 {
                    if let Some(decoded) = char::from_u32(code) {
                        out.extend(decoded.to_lowercase());
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => out.extend(c.to_lowercase()),
        }
    }

    out
}
