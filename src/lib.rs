#![deny(missing_docs)]
// This is an HTML sanitizer. Its input is untrusted by definition.
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod error;
mod escape;
mod policy;
mod sanitizer;
mod style;
mod token;
mod tokenizer;
mod url;

pub use error::Error;
pub use policy::{
    AttributePolicy, AttributeRuleBuilder, AttributeScope, ElementRule, Policy, PolicyBuilder,
    StyleRuleBuilder, REQUIRES_ATTRIBUTES, SKIP_CONTENT_ELEMENTS, VOID_ELEMENTS,
};
#[cfg(feature = "serde")]
pub use policy::{AttributeConfig, PolicyConfig, Preset, StyleConfig};
pub use sanitizer::{Frame, Sanitizer};
pub use style::StylePolicy;
pub use token::{Attribute, EndTag, StartTag, Token};
pub use tokenizer::{InfallibleTokenizer, IoReader, Readable, Reader, StringReader, Tokenizer};
pub use url::{is_url_attribute, UrlPolicy, URL_ATTRIBUTES};
