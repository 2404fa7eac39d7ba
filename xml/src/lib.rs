//! Implementation of an [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) parser.
//!
//! It loads a byte buffer into a namespaced element tree and walks the
//! RDF/XML grammar over it, emitting triples into an [`rdx_api::Graph`]
//! (or any other [`rdx_api::TripleSink`]).
//!
//! Count the number of people in a document:
//! ```
//! use rdx_api::model::{NamedNode, Term};
//! use rdx_xml::RdfXmlParser;
//!
//! let file = br#"<?xml version="1.0"?>
//! <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:schema="http://schema.org/">
//!  <rdf:Description rdf:about="http://example.com/foo">
//!    <rdf:type rdf:resource="http://schema.org/Person" />
//!    <schema:name>Foo</schema:name>
//!  </rdf:Description>
//!  <schema:Person rdf:about="http://example.com/bar" schema:name="Bar" />
//! </rdf:RDF>"#;
//!
//! let rdf_type = NamedNode { iri: "http://www.w3.org/1999/02/22-rdf-syntax-ns#type".to_owned() };
//! let schema_person = Term::from(NamedNode { iri: "http://schema.org/Person".to_owned() });
//! let parsed = RdfXmlParser::new().parse(file)?;
//! let count = parsed
//!     .graph()
//!     .iter()
//!     .filter(|t| t.predicate == rdf_type && t.object == schema_person)
//!     .count();
//! assert_eq!(2, count);
//! # Result::<_, rdx_xml::RdfXmlParseError>::Ok(())
//! ```
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_qualifications
)]

mod error;
mod parser;
mod reader;
mod resolver;
mod utils;

pub use error::{ElementPosition, RdfXmlErrorKind, RdfXmlParseError, RdfXmlSyntaxError};
pub use parser::{DocumentMetadata, ParsedRdfXml, RdfXmlParser};
