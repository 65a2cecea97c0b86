//! The two built-in policies.

use std::sync::OnceLock;

use regex::Regex;

use super::{Policy, PolicyBuilder};

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid regex")
}

pub(crate) fn strict_builder() -> PolicyBuilder {
    let mut builder = PolicyBuilder::new();
    builder.skip_disallowed_content(true);
    builder
}

pub(crate) fn ugc_builder() -> PolicyBuilder {
    let mut builder = PolicyBuilder::new();
    builder
        .skip_disallowed_content(true)
        .allow_url_schemes(["http", "https", "mailto"])
        .allow_relative_urls(true);

    // global
    builder
        .allow_attributes(["class"])
        .matching(pattern(r"[a-zA-Z0-9\s,\-_]+"))
        .globally()
        .allow_attributes(["id"])
        .matching(pattern(r"[a-zA-Z0-9:\-_.]+"))
        .globally()
        .allow_attributes(["title"])
        .matching(pattern(r"[\p{L}\p{N}\s\-_',:\[\]!./\\()&]*"))
        .globally()
        .allow_attributes(["lang"])
        .matching(pattern(r"[a-zA-Z]{2,20}(-[a-zA-Z0-9]{1,8})*"))
        .globally()
        .allow_attributes(["dir"])
        .matching(pattern(r"(?i)rtl|ltr"))
        .globally();

    // text
    builder.allow_elements([
        "abbr", "acronym", "address", "article", "aside", "b", "bdi", "br", "cite", "code", "dfn",
        "div", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "hr",
        "i", "kbd", "mark", "nav", "p", "pre", "s", "samp", "section", "small", "span", "strike",
        "strong", "sub", "sup", "tt", "u", "var", "wbr",
    ]);
    builder
        .allow_attributes(["cite"])
        .on_elements(["blockquote", "del", "ins", "q"])
        .allow_attributes(["datetime"])
        .matching(pattern(r"[0-9T:.+\-Z ]+"))
        .on_elements(["del", "ins", "time"])
        .allow_attributes(["dir"])
        .matching(pattern(r"(?i)rtl|ltr"))
        .on_elements(["bdo"])
        .allow_elements(["details", "summary"]);

    // links and images
    builder
        .allow_attributes(["href"])
        .on_elements(["a"])
        .allow_attributes(["src"])
        .on_elements(["img"])
        .allow_attributes(["alt"])
        .on_elements(["img"])
        .allow_attributes(["width", "height"])
        .matching(pattern(r"[0-9]+"))
        .on_elements(["img"])
        .allow_attributes(["align"])
        .matching(pattern(r"(?i)center|left|right|justify|char"))
        .on_elements(["img"]);

    // lists
    builder
        .allow_elements(["ul", "dl", "dt", "dd"])
        .allow_attributes(["type"])
        .matching(pattern(r"(?i)circle|disc|square|[1aAiI]"))
        .on_elements(["ol", "ul", "li"])
        .allow_attributes(["value"])
        .matching(pattern(r"[0-9]+"))
        .on_elements(["li"])
        .allow_attributes(["start"])
        .matching(pattern(r"-?[0-9]+"))
        .on_elements(["ol"]);

    // tables
    builder
        .allow_elements([
            "caption", "col", "colgroup", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
        ])
        .allow_attributes(["align"])
        .matching(pattern(r"(?i)center|justify|left|right|char"))
        .on_elements(["col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"])
        .allow_attributes(["valign"])
        .matching(pattern(r"(?i)baseline|bottom|middle|top"))
        .on_elements(["col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"])
        .allow_attributes(["colspan", "rowspan", "span"])
        .matching(pattern(r"[0-9]+"))
        .on_elements(["col", "colgroup", "td", "th"])
        .allow_attributes(["scope"])
        .matching(pattern(r"(?i)row|col|rowgroup|colgroup"))
        .on_elements(["th"])
        .allow_attributes(["headers"])
        .matching(pattern(r"[a-zA-Z0-9:\-_.\s]+"))
        .on_elements(["td", "th"]);

    builder
}

pub(crate) fn strict() -> Policy {
    static STRICT: OnceLock<Policy> = OnceLock::new();
    STRICT
        .get_or_init(|| strict_builder().build().expect("valid preset"))
        .clone()
}

pub(crate) fn ugc() -> Policy {
    static UGC: OnceLock<Policy> = OnceLock::new();
    UGC.get_or_init(|| ugc_builder().build().expect("valid preset"))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strict_allows_nothing() {
        let policy = strict();
        assert!(policy.elements.values().all(|rule| !rule.is_allowed()));
        assert!(policy.global_attributes().is_empty());
        assert!(!policy.allows_doctype());
        assert!(!policy.allows_comments());
        assert!(policy.skips_disallowed_content());
    }

    #[test]
    fn ugc_contents() {
        let policy = ugc();
        for name in ["a", "b", "img", "table", "td", "ul", "ol", "li", "p", "blockquote"] {
            assert!(policy.element_rule(name).unwrap().is_allowed(), "{}", name);
        }
        for name in ["font", "script", "style", "iframe", "form"] {
            assert!(!policy.element_rule(name).map_or(false, |r| r.is_allowed()), "{}", name);
        }
        assert!(policy.style_policy().is_none());
        assert!(policy.url_policy().allows_relative());
        assert_eq!(
            policy.url_policy().schemes().collect::<Vec<_>>(),
            ["http", "https", "mailto"]
        );
    }

    #[test]
    fn ugc_builder_can_be_extended() {
        let policy = PolicyBuilder::ugc()
            .allow_elements(["font"])
            .build()
            .unwrap();
        assert!(policy.element_rule("font").unwrap().is_allowed());
        assert!(policy.element_rule("a").unwrap().is_allowed());
    }
}
