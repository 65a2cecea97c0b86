use html5scrub::Policy;
use pretty_assertions::assert_eq;

/// Sanitized output has to come out of a second pass unchanged.
pub fn check(policy: &Policy, output: &str) {
    let twice = policy.sanitize(output).unwrap_or_default();
    assert_eq!(twice, output);
}
