/// A HTML start tag, such as `<p>` or `<a>`.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
pub struct StartTag {
    /// Whether this tag is self-closing. If it is self-closing, no following [`EndTag`] should be
    /// expected.
    pub self_closing: bool,

    /// The start tag's name, such as `"p"` or `"a"`.
    pub name: String,

    /// Attributes in source order. The bundled tokenizer keeps only the first of duplicate names.
    pub attributes: Vec<Attribute>,
}

impl StartTag {
    /// Construct a start tag without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        StartTag {
            name: name.into(),
            ..StartTag::default()
        }
    }

    /// Append an attribute, builder style.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Mark the tag as self-closing, builder style.
    #[must_use]
    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }
}

/// A HTML end/close tag, such as `</p>` or `</a>`.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
pub struct EndTag {
    /// The ending tag's name, such as `"p"` or `"a"`.
    pub name: String,
}

impl EndTag {
    /// Construct an end tag.
    pub fn new(name: impl Into<String>) -> Self {
        EndTag { name: name.into() }
    }
}

/// A single `name="value"` pair on a start tag. The value is already entity-decoded.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
pub struct Attribute {
    /// Attribute name, lowercase when it comes from the bundled tokenizer.
    pub name: String,
    /// Decoded attribute value.
    pub value: String,
}

impl Attribute {
    /// Construct an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One lexical unit of HTML, as consumed by the sanitizer.
///
/// Any source of tokens works, see [`crate::Policy::sanitize_tokens`]. Tokens coming from
/// somewhere else than [`crate::Tokenizer`] must already have their character references decoded.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Token {
    /// A HTML start tag.
    StartTag(StartTag),
    /// A HTML end tag.
    EndTag(EndTag),
    /// A literal string, character references decoded.
    Text(String),
    /// A HTML comment, without the `<!--` and `-->` delimiters.
    Comment(String),
    /// A HTML doctype: everything between `<!DOCTYPE` and `>`, whitespace-trimmed.
    Doctype(String),
}

impl From<StartTag> for Token {
    fn from(tag: StartTag) -> Token {
        Token::StartTag(tag)
    }
}

impl From<EndTag> for Token {
    fn from(tag: EndTag) -> Token {
        Token::EndTag(tag)
    }
}
