//! Element tables that are data rather than configuration.

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is discarded along with the element when they are not whitelisted.
/// Their content is script, style sheets, plugin payloads or foreign markup, none of which makes
/// sense as text.
pub const SKIP_CONTENT_ELEMENTS: &[&str] = &[
    "applet", "embed", "frame", "frameset", "iframe", "math", "noembed", "noframes", "noscript",
    "object", "plaintext", "script", "style", "svg", "template", "textarea", "title", "xmp",
];

/// Elements that are pointless without attributes. When all of their attributes are dropped,
/// they are unwrapped instead of kept.
pub const REQUIRES_ATTRIBUTES: &[&str] = &["a", "area", "font", "img", "map"];

/// Whether `name` (lowercase) is a void element.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Roots of foreign content, which may be written self-closing.
pub fn is_foreign_root(name: &str) -> bool {
    matches!(name, "svg" | "math")
}
