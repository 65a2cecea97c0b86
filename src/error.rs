use std::io;

/// Everything that can go wrong when building a [`crate::Policy`] or running it over input.
///
/// Hostile or malformed markup is never an error. Only misconfiguration and the boundaries of a
/// sanitize call (empty input, I/O) are.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input was empty.
    #[error("input is empty")]
    EmptyInput,

    /// The reader or writer of a streaming call failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A pattern could not be anchored for full matching.
    #[error("invalid pattern for {target}: {source}")]
    InvalidPattern {
        /// The rule the pattern was attached to.
        target: String,
        /// What the regex engine complained about.
        #[source]
        source: regex::Error,
    },

    /// An element, attribute, style property or URL scheme name that can never match anything.
    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// A rule was finalized with an empty list of names.
    #[error("{rule} was given no names")]
    MissingNames {
        /// The builder call that was missing its names.
        rule: &'static str,
    },

    /// A rule builder was dropped without `.on_elements()` or `.globally()`.
    #[error("rule for {0:?} was never finished with on_elements() or globally()")]
    UnfinishedRule(Vec<String>),
}

macro_rules! impl_parse_error {
    ($(
        $string:literal <=> $variant:ident,
    )*) => {
        /// The [parse errors](https://html.spec.whatwg.org/#parse-errors) the bundled tokenizer
        /// reports. They are logged and never abort tokenization.
        #[derive(Debug, Eq, PartialEq, Clone, Copy)]
        pub(crate) enum ParseError {
            $(
                $variant
            ),*
        }

        impl ParseError {
            /// The `kebab-case` error code as written in the WHATWG spec.
            #[must_use]
            pub(crate) fn as_str(&self) -> &'static str {
                match *self {
                    $( Self::$variant => $string, )*
                }
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl_parse_error! {
    "abrupt-closing-of-empty-comment" <=> AbruptClosingOfEmptyComment,
    "absence-of-digits-in-numeric-character-reference" <=> AbsenceOfDigitsInNumericCharacterReference,
    "cdata-in-html-content" <=> CdataInHtmlContent,
    "character-reference-outside-unicode-range" <=> CharacterReferenceOutsideUnicodeRange,
    "control-character-reference" <=> ControlCharacterReference,
    "end-tag-with-attributes" <=> EndTagWithAttributes,
    "eof-before-tag-name" <=> EofBeforeTagName,
    "eof-in-comment" <=> EofInComment,
    "eof-in-doctype" <=> EofInDoctype,
    "eof-in-tag" <=> EofInTag,
    "incorrectly-closed-comment" <=> IncorrectlyClosedComment,
    "incorrectly-opened-comment" <=> IncorrectlyOpenedComment,
    "invalid-first-character-of-tag-name" <=> InvalidFirstCharacterOfTagName,
    "missing-attribute-value" <=> MissingAttributeValue,
    "missing-end-tag-name" <=> MissingEndTagName,
    "missing-semicolon-after-character-reference" <=> MissingSemicolonAfterCharacterReference,
    "missing-whitespace-between-attributes" <=> MissingWhitespaceBetweenAttributes,
    "null-character-reference" <=> NullCharacterReference,
    "surrogate-character-reference" <=> SurrogateCharacterReference,
    "unexpected-character-in-attribute-name" <=> UnexpectedCharacterInAttributeName,
    "unexpected-character-in-unquoted-attribute-value" <=> UnexpectedCharacterInUnquotedAttributeValue,
    "unexpected-equals-sign-before-attribute-name" <=> UnexpectedEqualsSignBeforeAttributeName,
    "unexpected-null-character" <=> UnexpectedNullCharacter,
    "unexpected-question-mark-instead-of-tag-name" <=> UnexpectedQuestionMarkInsteadOfTagName,
    "unexpected-solidus-in-tag" <=> UnexpectedSolidusInTag,
    "unknown-named-character-reference" <=> UnknownNamedCharacterReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_codes() {
        assert_eq!(ParseError::EofInTag.to_string(), "eof-in-tag");
        assert_eq!(
            ParseError::UnexpectedNullCharacter.as_str(),
            "unexpected-null-character"
        );
    }

    #[test]
    fn messages() {
        assert_eq!(Error::EmptyInput.to_string(), "input is empty");
        assert_eq!(
            Error::UnfinishedRule(vec!["href".to_owned()]).to_string(),
            "rule for [\"href\"] was never finished with on_elements() or globally()"
        );
    }
}
