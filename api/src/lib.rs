//! Data structures for [RDF 1.1 Concepts](https://www.w3.org/TR/rdf11-concepts/) like IRI, literal or triples,
//! together with a simple in-memory graph and the sink interface parsers emit into.
//!
//! Building a triple and getting its N-Triples representation:
//! ```
//! use rdx_api::model::{Literal, NamedNode, Triple};
//!
//! assert_eq!(
//!     "<http://example.com/foo> <http://schema.org/name> \"Foo\" .",
//!     Triple {
//!         subject: NamedNode { iri: "http://example.com/foo".to_owned() }.into(),
//!         predicate: NamedNode { iri: "http://schema.org/name".to_owned() },
//!         object: Literal::Simple { value: "Foo".to_owned() }.into(),
//!     }.to_string()
//! )
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

pub mod graph;
pub mod model;

pub use graph::{Graph, TripleSink};
pub use model::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
