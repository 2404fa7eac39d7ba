use crate::error::{ElementPosition, RdfXmlErrorKind, RdfXmlParseError, RdfXmlSyntaxError};
use crate::reader::{is_whitespace, load_tree, XmlElement, XmlNode};
use crate::resolver::{resolve, resolve_base};
use crate::utils::is_nc_name;
use oxilangtag::LanguageTag;
use rdx_api::model::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term};
use rdx_api::{Graph, TripleSink};
use std::collections::{BTreeMap, HashSet};

const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

const RDF_ABOUT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#about";
const RDF_ABOUT_EACH: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#aboutEach";
const RDF_ABOUT_EACH_PREFIX: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#aboutEachPrefix";
const RDF_BAG_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#bagID";
const RDF_DATATYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#datatype";
const RDF_DESCRIPTION: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Description";
const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#ID";
const RDF_LI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#li";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
const RDF_NODE_ID: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nodeID";
const RDF_OBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#object";
const RDF_PARSE_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#parseType";
const RDF_PREDICATE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#predicate";
const RDF_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#RDF";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_RESOURCE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#resource";
const RDF_STATEMENT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Statement";
const RDF_SUBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#subject";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDF_XML_LITERAL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral";

const FORBIDDEN_NODE_ELEMENTS: [&str; 11] = [
    RDF_RDF,
    RDF_ID,
    RDF_ABOUT,
    RDF_BAG_ID,
    RDF_PARSE_TYPE,
    RDF_RESOURCE,
    RDF_NODE_ID,
    RDF_DATATYPE,
    RDF_LI,
    RDF_ABOUT_EACH,
    RDF_ABOUT_EACH_PREFIX,
];
const FORBIDDEN_PROPERTY_ELEMENTS: [&str; 11] = [
    RDF_DESCRIPTION,
    RDF_RDF,
    RDF_ID,
    RDF_ABOUT,
    RDF_BAG_ID,
    RDF_PARSE_TYPE,
    RDF_RESOURCE,
    RDF_NODE_ID,
    RDF_DATATYPE,
    RDF_ABOUT_EACH,
    RDF_ABOUT_EACH_PREFIX,
];

/// Unqualified attribute names that are read as if they were in the RDF
/// namespace, a leftover of older RDF/XML serializers.
const CORE_ATTRIBUTES: [&str; 9] = [
    "about",
    "resource",
    "ID",
    "nodeID",
    "parseType",
    "datatype",
    "bagID",
    "aboutEach",
    "aboutEachPrefix",
];

const FORMAT_NAME: &str = "rdf/xml";

/// A [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) parser.
///
/// [`parse`](RdfXmlParser::parse) loads the document into an element tree and
/// walks the RDF/XML grammar over it, collecting the triples into a
/// [`Graph`]. All parse state (blank node counter, seen `rdf:ID`s) lives and
/// dies within one call; the parser value itself is a stateless handle.
///
/// ```
/// use rdx_xml::RdfXmlParser;
///
/// let file = br#"<?xml version="1.0"?>
/// <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:schema="http://schema.org/">
///  <schema:Person rdf:about="http://example.com/bar" schema:name="Bar" />
/// </rdf:RDF>"#;
///
/// let parser = RdfXmlParser::new();
/// assert!(parser.can_handle(file));
/// assert_eq!(2, parser.parse(file)?.graph().len());
/// # Result::<_, rdx_xml::RdfXmlParseError>::Ok(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RdfXmlParser;

impl RdfXmlParser {
    pub fn new() -> Self {
        Self
    }

    /// The canonical name of the format this parser handles.
    pub fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    /// Cheaply decides whether `content` is plausibly RDF/XML.
    ///
    /// This is a loose pre-filter: false positives are sorted out by
    /// [`parse`](RdfXmlParser::parse) itself.
    pub fn can_handle(&self, content: &[u8]) -> bool {
        let content = trim_start(content);
        content.starts_with(b"<?xml")
            || contains(content, b"<rdf:RDF")
            || (contains(content, b"<RDF") && contains(content, RDF_NAMESPACE.as_bytes()))
    }

    /// Parses `content` into a [`Graph`].
    pub fn parse(&self, content: &[u8]) -> Result<ParsedRdfXml, RdfXmlParseError> {
        let mut graph = Graph::new();
        let metadata = self.parse_into(content, &mut graph)?;
        Ok(ParsedRdfXml {
            graph,
            raw_content: content.to_vec(),
            metadata,
        })
    }

    /// Parses `content`, emitting every triple into `sink`.
    pub fn parse_into<S: TripleSink>(
        &self,
        content: &[u8],
        sink: &mut S,
    ) -> Result<DocumentMetadata, RdfXmlParseError> {
        let trimmed = trim_start(content);
        if !trimmed.starts_with(b"<") || !self.can_handle(content) {
            return Err(RdfXmlParseError::NotRdfXml);
        }
        let head = trimmed[..trimmed.len().min(1024)].to_ascii_lowercase();
        if contains(&head, b"<!doctype html") || contains(&head, b"<html") {
            return Err(RdfXmlParseError::NotRdfXml);
        }

        let tree = load_tree(content)?;
        let base_iri = tree
            .root
            .attribute(XML_NAMESPACE, "base")
            .map(|base| resolve_base("", base));

        let mut driver = ParseDriver {
            sink,
            minter: BlankNodeMinter::default(),
            used_rdf_ids: HashSet::new(),
        };
        driver.drive(&tree.root, base_iri.as_deref().unwrap_or(""))?;

        Ok(DocumentMetadata {
            prefixes: tree.prefixes,
            base_iri,
        })
    }
}

/// The outcome of a successful [`RdfXmlParser::parse`] call.
#[derive(Debug, Clone)]
pub struct ParsedRdfXml {
    graph: Graph,
    raw_content: Vec<u8>,
    metadata: DocumentMetadata,
}

impl ParsedRdfXml {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn format(&self) -> &'static str {
        FORMAT_NAME
    }

    /// The bytes the graph was parsed from.
    pub fn raw_content(&self) -> &[u8] {
        &self.raw_content
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

/// Document-level facts collected while parsing.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    /// Namespace declarations seen in the document, prefix to namespace IRI.
    /// The default namespace is keyed by the empty string.
    pub prefixes: BTreeMap<String, String>,
    /// The `xml:base` of the root element, fragment stripped, if any.
    pub base_iri: Option<String>,
}

struct ParseDriver<'a, S: TripleSink> {
    sink: &'a mut S,
    minter: BlankNodeMinter,
    used_rdf_ids: HashSet<String>,
}

impl<S: TripleSink> ParseDriver<'_, S> {
    fn drive(&mut self, root: &XmlElement, base: &str) -> Result<(), RdfXmlSyntaxError> {
        if root.name != RDF_RDF {
            // well-formed XML that is not an RDF document yields no triples
            return Ok(());
        }
        for child in &root.children {
            match child {
                XmlNode::Element(element) => {
                    self.process_node(element, base)?;
                }
                XmlNode::Text(text) => reject_text(text)?,
            }
        }
        Ok(())
    }

    /// Processes a node element and returns the subject it denotes.
    fn process_node(
        &mut self,
        element: &XmlElement,
        base: &str,
    ) -> Result<NamedOrBlankNode, RdfXmlSyntaxError> {
        if FORBIDDEN_NODE_ELEMENTS.contains(&element.name.as_str()) {
            return Err(RdfXmlSyntaxError::new(RdfXmlErrorKind::ForbiddenElement {
                iri: element.name.clone(),
                position: ElementPosition::Node,
            }));
        }
        let attrs = classify_attributes(element)?;
        check_node_conflicts(&attrs)?;

        let base = match &attrs.base {
            Some(xml_base) => resolve_base(base, xml_base),
            None => base.to_owned(),
        };
        let id_iri = match &attrs.id {
            Some(id) => Some(self.register_rdf_id(id, &base)?),
            None => None,
        };

        let subject: NamedOrBlankNode = if let Some(about) = &attrs.about {
            named(resolve(&base, about)).into()
        } else if let Some(iri) = id_iri {
            named(iri).into()
        } else if let Some(node_id) = &attrs.node_id {
            BlankNode {
                id: node_id.clone(),
            }
            .into()
        } else {
            self.minter.mint().into()
        };

        if element.name != RDF_DESCRIPTION {
            self.sink.add_resource(
                subject.clone(),
                named(RDF_TYPE),
                named(element.name.clone()).into(),
            );
        }
        for (predicate, value) in &attrs.property_attrs {
            self.sink.add_literal(
                subject.clone(),
                named(predicate.clone()),
                Literal::Simple {
                    value: value.clone(),
                },
            );
        }

        let mut li_counter: u64 = 1;
        for child in &element.children {
            match child {
                XmlNode::Element(child) => {
                    self.process_property(child, &subject, &base, &mut li_counter)?;
                }
                XmlNode::Text(text) => reject_text(text)?,
            }
        }
        Ok(subject)
    }

    fn process_property(
        &mut self,
        element: &XmlElement,
        subject: &NamedOrBlankNode,
        base: &str,
        li_counter: &mut u64,
    ) -> Result<(), RdfXmlSyntaxError> {
        if FORBIDDEN_PROPERTY_ELEMENTS.contains(&element.name.as_str()) {
            return Err(RdfXmlSyntaxError::new(RdfXmlErrorKind::ForbiddenElement {
                iri: element.name.clone(),
                position: ElementPosition::Property,
            }));
        }
        let attrs = classify_attributes(element)?;
        check_property_conflicts(&attrs)?;

        let base = match &attrs.base {
            Some(xml_base) => resolve_base(base, xml_base),
            None => base.to_owned(),
        };
        let predicate = if element.name == RDF_LI {
            let iri = format!("{}_{}", RDF_NAMESPACE, *li_counter);
            *li_counter += 1;
            named(iri)
        } else {
            named(element.name.clone())
        };
        let statement_id = match &attrs.id {
            Some(id) => Some(named(self.register_rdf_id(id, &base)?)),
            None => None,
        };

        if let Some(parse_type) = &attrs.parse_type {
            match parse_type.as_str() {
                "Resource" => {
                    let object: NamedOrBlankNode = self.minter.mint().into();
                    self.emit(subject, &predicate, &object.clone().into(), statement_id.as_ref());
                    let mut nested_li_counter: u64 = 1;
                    for child in &element.children {
                        match child {
                            XmlNode::Element(child) => {
                                self.process_property(child, &object, &base, &mut nested_li_counter)?;
                            }
                            XmlNode::Text(text) => reject_text(text)?,
                        }
                    }
                }
                "Collection" => {
                    for child in &element.children {
                        if let XmlNode::Text(text) = child {
                            reject_text(text)?;
                        }
                    }
                    let items: Vec<&XmlElement> = element.child_elements().collect();
                    if items.is_empty() {
                        self.emit(subject, &predicate, &named(RDF_NIL).into(), statement_id.as_ref());
                    } else {
                        let head: NamedOrBlankNode = self.minter.mint().into();
                        self.emit(subject, &predicate, &head.clone().into(), statement_id.as_ref());
                        let mut current = head;
                        let last = items.len() - 1;
                        for (i, item) in items.iter().enumerate() {
                            let node = self.process_node(item, &base)?;
                            self.sink
                                .add_resource(current.clone(), named(RDF_FIRST), node);
                            if i == last {
                                self.sink.add_resource(
                                    current.clone(),
                                    named(RDF_REST),
                                    named(RDF_NIL).into(),
                                );
                            } else {
                                let next: NamedOrBlankNode = self.minter.mint().into();
                                self.sink.add_resource(
                                    current.clone(),
                                    named(RDF_REST),
                                    next.clone(),
                                );
                                current = next;
                            }
                        }
                    }
                }
                // "Literal" and every unrecognized value: the raw content
                _ => {
                    let value = element.inner_xml()?;
                    let literal = Literal::Typed {
                        value,
                        datatype: named(RDF_XML_LITERAL),
                    };
                    self.emit(subject, &predicate, &literal.into(), statement_id.as_ref());
                }
            }
        } else if let Some(resource) = &attrs.resource {
            let object: NamedOrBlankNode = named(resolve(&base, resource)).into();
            self.emit(subject, &predicate, &object.into(), statement_id.as_ref());
        } else if let Some(node_id) = &attrs.node_id {
            let object: NamedOrBlankNode = BlankNode {
                id: node_id.clone(),
            }
            .into();
            self.emit(subject, &predicate, &object.into(), statement_id.as_ref());
        } else if let Some(child) = element.child_elements().next() {
            // the first child element provides the object, further siblings
            // and interleaved text are not considered
            let object = self.process_node(child, &base)?;
            self.emit(subject, &predicate, &object.into(), statement_id.as_ref());
        } else {
            let value = element.text();
            let literal = if let Some(language) = &attrs.language {
                Literal::LanguageTaggedString {
                    value,
                    language: language.clone(),
                }
            } else if let Some(datatype) = &attrs.datatype {
                Literal::Typed {
                    value,
                    datatype: named(resolve(&base, datatype)),
                }
            } else {
                Literal::Simple { value }
            };
            self.emit(subject, &predicate, &literal.into(), statement_id.as_ref());
        }
        Ok(())
    }

    /// Resolves an `rdf:ID` against the base in effect and records it,
    /// rejecting a second use of the same IRI.
    fn register_rdf_id(&mut self, id: &str, base: &str) -> Result<String, RdfXmlSyntaxError> {
        let iri = resolve(base, &format!("#{id}"));
        if !self.used_rdf_ids.insert(iri.clone()) {
            return Err(RdfXmlSyntaxError::new(RdfXmlErrorKind::DuplicateRdfId {
                iri,
            }));
        }
        Ok(iri)
    }

    /// Emits the main triple of a property element and, when `rdf:ID` was
    /// present, the reification of that triple.
    fn emit(
        &mut self,
        subject: &NamedOrBlankNode,
        predicate: &NamedNode,
        object: &Term,
        statement_id: Option<&NamedNode>,
    ) {
        match object {
            Term::NamedNode(node) => {
                self.sink
                    .add_resource(subject.clone(), predicate.clone(), node.clone().into())
            }
            Term::BlankNode(node) => {
                self.sink
                    .add_resource(subject.clone(), predicate.clone(), node.clone().into())
            }
            Term::Literal(literal) => {
                self.sink
                    .add_literal(subject.clone(), predicate.clone(), literal.clone())
            }
        }
        if let Some(statement_id) = statement_id {
            self.reify(statement_id, subject, predicate, object);
        }
    }

    fn reify(
        &mut self,
        statement_id: &NamedNode,
        subject: &NamedOrBlankNode,
        predicate: &NamedNode,
        object: &Term,
    ) {
        let statement: NamedOrBlankNode = statement_id.clone().into();
        self.sink.add_resource(
            statement.clone(),
            named(RDF_TYPE),
            named(RDF_STATEMENT).into(),
        );
        self.sink
            .add_resource(statement.clone(), named(RDF_SUBJECT), subject.clone());
        self.sink.add_resource(
            statement.clone(),
            named(RDF_PREDICATE),
            predicate.clone().into(),
        );
        match object {
            Term::NamedNode(node) => {
                self.sink
                    .add_resource(statement, named(RDF_OBJECT), node.clone().into())
            }
            Term::BlankNode(node) => {
                self.sink
                    .add_resource(statement, named(RDF_OBJECT), node.clone().into())
            }
            Term::Literal(literal) => {
                self.sink
                    .add_literal(statement, named(RDF_OBJECT), literal.clone())
            }
        }
    }
}

#[derive(Default)]
struct BlankNodeMinter {
    counter: u64,
}

impl BlankNodeMinter {
    fn mint(&mut self) -> BlankNode {
        self.counter += 1;
        BlankNode {
            id: format!("genid{}", self.counter),
        }
    }
}

#[derive(Default)]
struct ClassifiedAttributes {
    about: Option<String>,
    id: Option<String>,
    node_id: Option<String>,
    resource: Option<String>,
    datatype: Option<String>,
    parse_type: Option<String>,
    base: Option<String>,
    language: Option<String>,
    property_attrs: Vec<(String, String)>,
}

fn classify_attributes(element: &XmlElement) -> Result<ClassifiedAttributes, RdfXmlSyntaxError> {
    let mut attrs = ClassifiedAttributes::default();
    for attribute in &element.attributes {
        match attribute.namespace.as_deref() {
            Some(XML_NAMESPACE) => match attribute.local.as_str() {
                "base" => attrs.base = Some(attribute.value.clone()),
                "lang" => {
                    // an empty xml:lang cancels any language in scope
                    attrs.language = if attribute.value.is_empty() {
                        None
                    } else {
                        let tag = attribute.value.to_ascii_lowercase();
                        Some(
                            LanguageTag::parse(tag.clone())
                                .map_err(|error| {
                                    RdfXmlSyntaxError::new(RdfXmlErrorKind::InvalidLanguageTag {
                                        tag,
                                        error,
                                    })
                                })?
                                .into_inner(),
                        )
                    };
                }
                _ => (), // we do not fail on other attributes of the XML namespace
            },
            Some(RDF_NAMESPACE) => {
                apply_core_attribute(&mut attrs, &attribute.local, &attribute.value, true)?;
            }
            Some(_) => attrs
                .property_attrs
                .push((attribute.expanded_name(), attribute.value.clone())),
            None => {
                if CORE_ATTRIBUTES.contains(&attribute.local.as_str()) {
                    apply_core_attribute(&mut attrs, &attribute.local, &attribute.value, false)?;
                }
                // other unqualified attributes carry no RDF meaning
            }
        }
    }
    Ok(attrs)
}

fn apply_core_attribute(
    attrs: &mut ClassifiedAttributes,
    local: &str,
    value: &str,
    qualified: bool,
) -> Result<(), RdfXmlSyntaxError> {
    match local {
        "aboutEach" | "aboutEachPrefix" | "bagID" => Err(RdfXmlSyntaxError::new(
            RdfXmlErrorKind::DeprecatedAttribute {
                iri: format!("{RDF_NAMESPACE}{local}"),
            },
        )),
        "li" => Err(RdfXmlSyntaxError::new(RdfXmlErrorKind::IllegalLiAttribute)),
        "ID" => {
            check_nc_name(value)?;
            set_core(&mut attrs.id, value, qualified);
            Ok(())
        }
        "nodeID" => {
            check_nc_name(value)?;
            set_core(&mut attrs.node_id, value, qualified);
            Ok(())
        }
        "about" => {
            set_core(&mut attrs.about, value, qualified);
            Ok(())
        }
        "resource" => {
            set_core(&mut attrs.resource, value, qualified);
            Ok(())
        }
        "datatype" => {
            set_core(&mut attrs.datatype, value, qualified);
            Ok(())
        }
        "parseType" => {
            set_core(&mut attrs.parse_type, value, qualified);
            Ok(())
        }
        _ => Ok(()), // other attributes of the RDF namespace carry no grammar meaning
    }
}

fn set_core(slot: &mut Option<String>, value: &str, qualified: bool) {
    // the namespaced form wins over a bare attribute of the same name
    if qualified || slot.is_none() {
        *slot = Some(value.to_owned());
    }
}

fn check_nc_name(value: &str) -> Result<(), RdfXmlSyntaxError> {
    if is_nc_name(value) {
        Ok(())
    } else {
        Err(RdfXmlSyntaxError::new(RdfXmlErrorKind::InvalidNcName {
            value: value.to_owned(),
        }))
    }
}

fn check_node_conflicts(attrs: &ClassifiedAttributes) -> Result<(), RdfXmlSyntaxError> {
    if attrs.about.is_some() && attrs.id.is_some() {
        return Err(conflict("rdf:about", "rdf:ID"));
    }
    if attrs.about.is_some() && attrs.node_id.is_some() {
        return Err(conflict("rdf:about", "rdf:nodeID"));
    }
    if attrs.id.is_some() && attrs.node_id.is_some() {
        return Err(conflict("rdf:ID", "rdf:nodeID"));
    }
    Ok(())
}

fn check_property_conflicts(attrs: &ClassifiedAttributes) -> Result<(), RdfXmlSyntaxError> {
    if attrs.resource.is_some() && attrs.node_id.is_some() {
        return Err(conflict("rdf:resource", "rdf:nodeID"));
    }
    if attrs.parse_type.is_some() && attrs.resource.is_some() {
        return Err(conflict("rdf:parseType", "rdf:resource"));
    }
    if attrs.parse_type.is_some() && attrs.node_id.is_some() {
        return Err(conflict("rdf:parseType", "rdf:nodeID"));
    }
    Ok(())
}

fn conflict(first: &'static str, second: &'static str) -> RdfXmlSyntaxError {
    RdfXmlSyntaxError::new(RdfXmlErrorKind::ConflictingAttributes { first, second })
}

fn reject_text(text: &str) -> Result<(), RdfXmlSyntaxError> {
    if text.bytes().all(is_whitespace) {
        Ok(())
    } else {
        Err(RdfXmlSyntaxError::msg(format!(
            "Unexpected text event: '{text}'"
        )))
    }
}

fn named(iri: impl Into<String>) -> NamedNode {
    NamedNode { iri: iri.into() }
}

fn trim_start(input: &[u8]) -> &[u8] {
    for (i, c) in input.iter().enumerate() {
        if !is_whitespace(*c) {
            return &input[i..];
        }
    }
    b"".as_ref()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}
