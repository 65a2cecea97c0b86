use std::env;

use html5scrub::{Policy, PolicyBuilder};
use regex::Regex;

mod containment;
mod idempotence;

fn enabled(var: &str) -> bool {
    env::var(var).map_or(false, |value| value == "1")
}

fn policies() -> Vec<Policy> {
    vec![
        Policy::strict(),
        Policy::ugc(),
        PolicyBuilder::ugc()
            .allow_styles(["color", "text-align"])
            .globally()
            .allow_attributes(["style"])
            .matching(Regex::new("[^<>]*").unwrap())
            .on_elements(["span", "p"])
            .allow_comments(true)
            .allow_doctype(true)
            .require_nofollow_on_links(true)
            .skip_disallowed_content(false)
            .build()
            .unwrap(),
    ]
}

pub fn run(s: &[u8]) {
    // unconditionally run the tokenizer against raw bytes, it should never crash. we rely on
    // running in debug mode such that this is not just simply optimized away
    for _ in html5scrub::Tokenizer::new(s).infallible() {}

    let data = String::from_utf8_lossy(s);
    let policies = policies();

    for policy in &policies {
        let output = policy.sanitize(&data).unwrap_or_default();

        if enabled("FUZZ_IDEMPOTENCE") {
            idempotence::check(policy, &output);
        }

        if enabled("FUZZ_CONTAINMENT") {
            containment::check(policy, &output);
        }

        // invalid UTF-8 is replaced per token when streaming, so only compare valid input
        if enabled("FUZZ_STREAMING") && std::str::from_utf8(s).is_ok() {
            let mut streamed = Vec::new();
            if policy.sanitize_reader(s, &mut streamed).is_ok() {
                pretty_assertions::assert_eq!(String::from_utf8_lossy(&streamed), output);
            }
        }
    }
}
