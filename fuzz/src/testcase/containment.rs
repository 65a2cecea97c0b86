use html5scrub::{is_url_attribute, Policy, Token, Tokenizer};

/// Validates that everything in sanitized output is whitelisted by `policy`.
///
/// This checks that:
/// 1. Every element is allowed
/// 2. Every attribute is allowed on its element, or globally
/// 3. URL-bearing attributes pass the URL policy
/// 4. No script-ish CSS survives in `style`
pub fn check(policy: &Policy, output: &str) {
    for token in Tokenizer::new(output).infallible() {
        match token {
            Token::StartTag(tag) => {
                let rule = match policy.element_rule(&tag.name) {
                    Some(rule) if rule.is_allowed() => rule,
                    _ => panic!("element {:?} is not whitelisted: {:?}", tag.name, output),
                };

                for attribute in &tag.attributes {
                    let name = attribute.name.as_str();
                    let whitelisted = rule
                        .attributes()
                        .iter()
                        .chain(policy.global_attributes())
                        .any(|policy| policy.name() == name)
                        || (name == "rel" && policy.requires_nofollow_on_links());
                    assert!(whitelisted, "attribute {:?} on {:?}", name, tag.name);

                    if is_url_attribute(name) {
                        assert!(
                            policy.url_policy().allows(&attribute.value),
                            "url {:?} is not allowed",
                            attribute.value
                        );
                    }

                    if name == "style" {
                        let value = attribute.value.to_ascii_lowercase();
                        assert!(!value.contains("expression("), "style {:?}", value);
                        assert!(!value.contains("javascript:"), "style {:?}", value);
                    }
                }
            }
            Token::Comment(comment) => {
                assert!(policy.allows_comments(), "comment in {:?}", output);
                assert!(!comment.contains('<'), "markup in comment {:?}", comment);
            }
            Token::Doctype(_) => assert!(policy.allows_doctype(), "doctype in {:?}", output),
            Token::EndTag(_) | Token::Text(_) => {}
        }
    }
}
