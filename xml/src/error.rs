use oxilangtag::LanguageTagParseError;
use std::error::Error;
use std::fmt;

/// Error returned during RDF/XML parsing.
#[derive(Debug, thiserror::Error)]
pub enum RdfXmlParseError {
    /// The content sniff rejected the input: empty, non-XML or HTML-like.
    #[error("Content does not appear to be valid RDF/XML")]
    NotRdfXml,
    /// The underlying XML document is not well-formed.
    #[error("Invalid RDF/XML content: {0}")]
    InvalidXml(#[from] quick_xml::Error),
    /// The XML document is well-formed but violates the RDF/XML grammar.
    #[error("RDF/XML parsing failed: {0}")]
    Syntax(#[from] RdfXmlSyntaxError),
}

/// An error in the RDF/XML grammar of a well-formed XML document.
#[derive(Debug)]
pub struct RdfXmlSyntaxError {
    kind: RdfXmlErrorKind,
}

/// The exact grammar violation behind a [`RdfXmlSyntaxError`].
#[derive(Debug)]
pub enum RdfXmlErrorKind {
    /// A `rdf:ID` or `rdf:nodeID` value is not an XML NCName.
    InvalidNcName { value: String },
    /// The same resolved `rdf:ID` IRI appears twice in the document.
    DuplicateRdfId { iri: String },
    /// An RDF core name was used as an element in a position it is not allowed.
    ForbiddenElement {
        iri: String,
        position: ElementPosition,
    },
    /// `rdf:aboutEach`, `rdf:aboutEachPrefix` or `rdf:bagID`.
    DeprecatedAttribute { iri: String },
    /// A combination of attributes the grammar disallows on one element.
    ConflictingAttributes {
        first: &'static str,
        second: &'static str,
    },
    /// `rdf:li` appeared as an attribute.
    IllegalLiAttribute,
    /// A non-empty `xml:lang` value is not a well-formed language tag.
    InvalidLanguageTag {
        tag: String,
        error: LanguageTagParseError,
    },
    /// Any other violation of the grammar or of the XML subset it accepts.
    Msg { msg: String },
}

/// Whether an element was encountered in node (subject) or property (predicate) position.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ElementPosition {
    Node,
    Property,
}

impl RdfXmlSyntaxError {
    pub(crate) fn new(kind: RdfXmlErrorKind) -> Self {
        Self { kind }
    }

    /// Builds an error from a printable error message.
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        Self {
            kind: RdfXmlErrorKind::Msg { msg: msg.into() },
        }
    }

    /// The exact violation, for callers that need to react to specific failures.
    pub fn kind(&self) -> &RdfXmlErrorKind {
        &self.kind
    }
}

impl fmt::Display for RdfXmlSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RdfXmlErrorKind::InvalidNcName { value } => {
                write!(f, "{value} is not a valid NCName")
            }
            RdfXmlErrorKind::DuplicateRdfId { iri } => {
                write!(f, "{iri} has already been used as rdf:ID value")
            }
            RdfXmlErrorKind::ForbiddenElement {
                iri,
                position: ElementPosition::Node,
            } => write!(f, "Invalid node element tag name: {iri}"),
            RdfXmlErrorKind::ForbiddenElement {
                iri,
                position: ElementPosition::Property,
            } => write!(f, "Invalid property element tag name: {iri}"),
            RdfXmlErrorKind::DeprecatedAttribute { iri } => {
                write!(f, "{iri} is not a valid attribute")
            }
            RdfXmlErrorKind::ConflictingAttributes { first, second } => {
                write!(f, "Not both {first} and {second} could be set at the same time")
            }
            RdfXmlErrorKind::IllegalLiAttribute => {
                write!(f, "rdf:li is not allowed as an attribute")
            }
            RdfXmlErrorKind::InvalidLanguageTag { tag, error } => {
                write!(f, "error while parsing language tag '{tag}': {error}")
            }
            RdfXmlErrorKind::Msg { msg } => f.write_str(msg),
        }
    }
}

impl Error for RdfXmlSyntaxError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            RdfXmlErrorKind::InvalidLanguageTag { error, .. } => Some(error),
            _ => None,
        }
    }
}
