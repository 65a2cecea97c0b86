//! Invariants that have to hold for any input, checked against generated tag soup.

use html5scrub::{is_url_attribute, Policy, PolicyBuilder, Token, Tokenizer};
use pretty_assertions::assert_eq;
use regex::Regex;

const FRAGMENTS: &[&str] = &[
    "<b>", "</b>", "<i>", "</i>", "<p>", "</p>", "<div>", "</div>", "<span>", "</span>",
    "<a href=\"http://example.org/\">", "<a href='javascript:alert(1)'>", "<a href=/relative>",
    "<a href=\"jav&#x09;ascript:alert(1)\">", "</a>", "<img src=x onerror=alert(1)>",
    "<img src=\"https://example.org/i.png\" alt=\"a\">", "<br>", "<br/>", "<script>",
    "</script>", "<style>", "</style>", "<!-- c -->", "<!--[if IE]>x<![endif]-->",
    "<!DOCTYPE html>", "<![CDATA[x]]>", "<?php ?>", "</3>", "text", "1 < 2", "3 > 2", "&",
    "&amp;", "&lt;b&gt;", "&#34;", "'", "\"", "<", ">", "=", "<b class=\"x\" id=\"y\">",
    "<table>", "<tr>", "<td align=center valign=top colspan=2>", "</td>", "</tr>", "</table>",
    "<span style=\"color: red; background: url(javascript:x)\">", "<font color=red>", "</font>",
    "<ul>", "<li>", "</ul>", "<textarea>", "</textarea>", "<title>", "</title>", "<iframe>",
    "</iframe>", "<svg><script>x</script></svg>", "\u{0}", "\r\n", "\n", " ", "é",
];

/// xorshift64, good enough to pick fragments reproducibly.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn soup(&mut self) -> String {
        let len = 1 + self.next() % 24;
        (0..len)
            .map(|_| FRAGMENTS[(self.next() % FRAGMENTS.len() as u64) as usize])
            .collect()
    }
}

fn policies() -> Vec<(&'static str, Policy)> {
    vec![
        ("strict", Policy::strict()),
        ("ugc", Policy::ugc()),
        (
            "custom",
            PolicyBuilder::new()
                .allow_elements(["b", "div", "p", "span"])
                .allow_attributes(["href"])
                .on_elements(["a"])
                .allow_attributes(["class"])
                .matching(Regex::new("[a-z]+").unwrap())
                .globally()
                .allow_styles(["color"])
                .on_elements(["span"])
                .allow_url_schemes(["https"])
                .allow_comments(true)
                .allow_doctype(true)
                .require_nofollow_on_links(true)
                .build()
                .unwrap(),
        ),
    ]
}

fn sanitize(policy: &Policy, input: &str) -> String {
    policy.sanitize(input).unwrap_or_default()
}

/// Re-tokenize sanitized output and check that everything in it is whitelisted.
fn assert_contained(policy: &Policy, output: &str) {
    for token in Tokenizer::new(output).infallible() {
        match token {
            Token::StartTag(tag) => {
                let rule = policy.element_rule(&tag.name);
                assert!(
                    rule.map_or(false, |rule| rule.is_allowed()),
                    "element {:?} in {:?}",
                    tag.name,
                    output
                );
                let rule = rule.unwrap();

                for attribute in &tag.attributes {
                    let name = attribute.name.as_str();
                    let whitelisted = rule
                        .attributes()
                        .iter()
                        .chain(policy.global_attributes())
                        .any(|policy| policy.name() == name)
                        || (name == "rel" && policy.requires_nofollow_on_links());
                    assert!(whitelisted, "attribute {:?} in {:?}", name, output);

                    if is_url_attribute(name) {
                        assert!(
                            policy.url_policy().allows(&attribute.value),
                            "url {:?} in {:?}",
                            attribute.value,
                            output
                        );
                    }
                }
            }
            Token::Comment(_) => assert!(policy.allows_comments(), "comment in {:?}", output),
            Token::Doctype(_) => assert!(policy.allows_doctype(), "doctype in {:?}", output),
            Token::EndTag(_) | Token::Text(_) => {}
        }
    }
}

#[test]
fn output_is_contained_in_the_whitelist() {
    for (_, policy) in policies() {
        let mut rng = Rng(0x2545_f491_4f6c_dd1d);
        for _ in 0..2000 {
            let input = rng.soup();
            assert_contained(&policy, &sanitize(&policy, &input));
        }
    }
}

#[test]
fn sanitizing_twice_changes_nothing() {
    for (name, policy) in policies() {
        let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
        for _ in 0..2000 {
            let input = rng.soup();
            let once = sanitize(&policy, &input);
            let twice = sanitize(&policy, &once);
            assert_eq!(twice, once, "policy {}, input {:?}", name, input);
        }
    }
}

#[test]
fn text_is_never_reinterpreted_as_markup() {
    let policy = Policy::strict();
    for input in [
        "1 < 2",
        "a <b c",
        "&lt;script&gt;alert(1)&lt;/script&gt;",
        "x &amp;lt;b&amp;gt; y",
        "<<script>>",
    ] {
        let output = sanitize(&policy, input);
        assert!(!output.contains('<'), "{:?} -> {:?}", input, output);
        assert!(!output.contains('>'), "{:?} -> {:?}", input, output);

        let texts: Vec<Token> = Tokenizer::new(output.as_str()).infallible().collect();
        assert!(
            texts.iter().all(|token| matches!(token, Token::Text(_))),
            "{:?} -> {:?}",
            input,
            output
        );
    }
}

#[test]
fn escaped_text_survives_a_round_trip() {
    let policy = Policy::ugc();
    let output = sanitize(&policy, "<p>&lt;b&gt; &amp; &#34;quoted&#34;</p>");
    assert_eq!(output, "<p>&lt;b&gt; &amp; &#34;quoted&#34;</p>");

    let text: String = Tokenizer::new(output.as_str())
        .infallible()
        .filter_map(|token| match token {
            Token::Text(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(text, "<b> & \"quoted\"");
}
