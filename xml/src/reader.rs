//! Loads a byte buffer into a namespaced XML element tree.
//!
//! The RDF/XML grammar wants random access to an element's attributes and
//! children (sibling order matters, and `rdf:parseType="Literal"` needs the
//! raw content back), so the quick-xml event stream is materialized into a
//! small tree before the grammar walk. External DTDs and entities are never
//! fetched; only `<!ENTITY>` declarations from the internal subset are
//! honored.

use crate::error::{RdfXmlParseError, RdfXmlSyntaxError};
use quick_xml::escape::{resolve_xml_entity, unescape_with};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};
use std::collections::{BTreeMap, HashMap};

/// Documents nested deeper than this are rejected to keep the recursive
/// grammar walk off unbounded stacks.
pub(crate) const MAX_NESTING_DEPTH: usize = 1000;

pub(crate) struct XmlTree {
    pub root: XmlElement,
    /// Namespace declarations seen anywhere in the document, last one wins.
    /// The default namespace is stored under the empty prefix.
    pub prefixes: BTreeMap<String, String>,
}

pub(crate) struct XmlElement {
    /// The name as written in the document, kept for re-serialization.
    qname: String,
    /// The expanded name: namespace IRI concatenated with the local name.
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    namespace_decls: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

pub(crate) struct XmlAttribute {
    qname: String,
    pub namespace: Option<String>,
    pub local: String,
    pub value: String,
}

pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlAttribute {
    pub fn expanded_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl XmlElement {
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> + '_ {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// The concatenation of the element's direct text content.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                text.push_str(t);
            }
        }
        text
    }

    pub fn attribute(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// Serializes the content between the element's start and end tags,
    /// with surrounding whitespace trimmed.
    pub fn inner_xml(&self) -> Result<String, RdfXmlSyntaxError> {
        let mut writer = Writer::new(Vec::new());
        for child in &self.children {
            write_node(child, &mut writer)?;
        }
        let inner = String::from_utf8(writer.into_inner())
            .map_err(|_| RdfXmlSyntaxError::msg("The XML literal is not in valid UTF-8"))?;
        Ok(inner.trim().to_owned())
    }
}

pub(crate) fn load_tree(content: &[u8]) -> Result<XmlTree, RdfXmlParseError> {
    let mut reader = NsReader::from_reader(content);
    reader.config_mut().expand_empty_elements = true;
    let mut loader = TreeLoader {
        reader,
        custom_entities: HashMap::new(),
        prefixes: BTreeMap::new(),
    };
    let root = loader.load()?;
    Ok(XmlTree {
        root,
        prefixes: loader.prefixes,
    })
}

struct TreeLoader<'a> {
    reader: NsReader<&'a [u8]>,
    custom_entities: HashMap<String, String>,
    prefixes: BTreeMap<String, String>,
}

impl TreeLoader<'_> {
    fn load(&mut self) -> Result<XmlElement, RdfXmlParseError> {
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(event) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(RdfXmlSyntaxError::msg(
                            "The document contains more than one root element",
                        )
                        .into());
                    }
                    if stack.len() >= MAX_NESTING_DEPTH {
                        return Err(RdfXmlSyntaxError::msg(format!(
                            "XML elements are nested deeper than the supported maximum of {MAX_NESTING_DEPTH}"
                        ))
                        .into());
                    }
                    let element = self.open_element(&event)?;
                    stack.push(element);
                }
                Event::End(_) => {
                    // tag balance is checked by the XML reader itself
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(XmlNode::Element(element)),
                            None => root = Some(element),
                        }
                    }
                }
                Event::Empty(_) => {
                    return Err(RdfXmlSyntaxError::msg(
                        "The expand_empty_elements option must be enabled",
                    )
                    .into());
                }
                Event::Text(event) => {
                    let text = event
                        .unescape_with(|e| self.resolve_entity(e))
                        .map_err(quick_xml::Error::from)?
                        .into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::CData(event) => {
                    let text = self.reader.decoder().decode(event.as_ref())?.into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::Comment(_) | Event::PI(_) => (),
                Event::Decl(decl) => {
                    if let Some(encoding) = decl.encoding() {
                        if !is_utf8(&encoding?) {
                            return Err(RdfXmlSyntaxError::msg(
                                "Only UTF-8 is supported by the RDF/XML parser",
                            )
                            .into());
                        }
                    }
                }
                Event::DocType(dt) => self.parse_doctype(&dt)?,
                Event::Eof => break,
            }
        }
        root.ok_or_else(|| RdfXmlSyntaxError::msg("The document has no root element").into())
    }

    fn open_element(&mut self, event: &BytesStart<'_>) -> Result<XmlElement, RdfXmlParseError> {
        let (namespace, local_name) = self.reader.resolve_element(event.name());
        let namespace = self.decode_namespace(namespace)?;
        let local = self.decode(local_name.as_ref())?;
        let name = match &namespace {
            Some(namespace) => format!("{namespace}{local}"),
            None => local.clone(),
        };

        let mut attributes = Vec::new();
        let mut namespace_decls = Vec::new();
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            let key = attribute.key;
            if key.as_ref() == b"xmlns" || key.as_ref().starts_with(b"xmlns:") {
                let prefix = if key.as_ref() == b"xmlns" {
                    String::new()
                } else {
                    self.decode(&key.as_ref()[b"xmlns:".len()..])?
                };
                let value = self.convert_attribute(&attribute)?;
                self.prefixes.insert(prefix, value.clone());
                namespace_decls.push((self.decode(key.as_ref())?, value));
                continue;
            }
            let (namespace, local_name) = self.reader.resolve_attribute(key);
            attributes.push(XmlAttribute {
                qname: self.decode(key.as_ref())?,
                namespace: self.decode_namespace(namespace)?,
                local: self.decode(local_name.as_ref())?,
                value: self.convert_attribute(&attribute)?,
            });
        }

        Ok(XmlElement {
            qname: self.decode(event.name().as_ref())?,
            name,
            attributes,
            namespace_decls,
            children: Vec::new(),
        })
    }

    fn parse_doctype(&mut self, dt: &BytesText<'_>) -> Result<(), RdfXmlParseError> {
        // we extract entities from the internal subset, nothing is fetched
        for input in self
            .reader
            .decoder()
            .decode(dt.as_ref())?
            .split('<')
            .skip(1)
        {
            if let Some(input) = input.strip_prefix("!ENTITY") {
                let input = input.trim_start().strip_prefix('%').unwrap_or(input);
                let (entity_name, input) = input
                    .trim_start()
                    .split_once(|c: char| c.is_ascii_whitespace())
                    .ok_or_else(|| {
                        RdfXmlSyntaxError::msg(
                        "<!ENTITY declarations should contain both an entity name and an entity value",
                    )
                    })?;
                let input = input.trim_start().strip_prefix('"').ok_or_else(|| {
                    RdfXmlSyntaxError::msg("<!ENTITY values should be enclosed in double quotes")
                })?;
                let (entity_value, input) = input.split_once('"').ok_or_else(|| {
                    RdfXmlSyntaxError::msg(
                        "<!ENTITY declarations values should be enclosed in double quotes",
                    )
                })?;
                input.trim_start().strip_prefix('>').ok_or_else(|| {
                    RdfXmlSyntaxError::msg("<!ENTITY declarations values should end with >")
                })?;

                // entity values may reference entities declared before them
                let entity_value = unescape_with(entity_value, |e| self.resolve_entity(e))
                    .map_err(quick_xml::Error::from)?;
                self.custom_entities
                    .insert(entity_name.to_owned(), entity_value.into_owned());
            }
        }
        Ok(())
    }

    fn decode_namespace(
        &self,
        resolution: ResolveResult<'_>,
    ) -> Result<Option<String>, RdfXmlParseError> {
        match resolution {
            ResolveResult::Bound(namespace) => {
                let namespace = self.decode(namespace.as_ref())?;
                let namespace = unescape_with(&namespace, |e| self.resolve_entity(e))
                    .map_err(quick_xml::Error::from)?;
                Ok(Some(namespace.into_owned()))
            }
            ResolveResult::Unbound => Ok(None),
            ResolveResult::Unknown(prefix) => Err(RdfXmlSyntaxError::msg(format!(
                "Unknown namespace prefix {}:",
                self.decode(&prefix)?
            ))
            .into()),
        }
    }

    fn convert_attribute(&self, attribute: &Attribute<'_>) -> Result<String, RdfXmlParseError> {
        Ok(attribute
            .decode_and_unescape_value_with(self.reader.decoder(), |e| self.resolve_entity(e))?
            .into_owned())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, RdfXmlParseError> {
        Ok(self.reader.decoder().decode(bytes)?.into_owned())
    }

    fn resolve_entity(&self, entity: &str) -> Option<&str> {
        resolve_xml_entity(entity).or_else(|| self.custom_entities.get(entity).map(String::as_str))
    }
}

fn push_text(stack: &mut [XmlElement], text: String) -> Result<(), RdfXmlParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(text));
            Ok(())
        }
        None => {
            if text.bytes().all(|c| is_whitespace(c)) {
                Ok(())
            } else {
                Err(RdfXmlSyntaxError::msg(format!("Unexpected text event: '{text}'")).into())
            }
        }
    }
}

fn write_node(node: &XmlNode, writer: &mut Writer<Vec<u8>>) -> Result<(), RdfXmlSyntaxError> {
    match node {
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.qname.as_str());
            for (qname, value) in &element.namespace_decls {
                start.push_attribute((qname.as_str(), value.as_str()));
            }
            for attribute in &element.attributes {
                start.push_attribute((attribute.qname.as_str(), attribute.value.as_str()));
            }
            write_event(writer, Event::Start(start))?;
            for child in &element.children {
                write_node(child, writer)?;
            }
            write_event(writer, Event::End(BytesEnd::new(element.qname.as_str())))
        }
        XmlNode::Text(text) => write_event(writer, Event::Text(BytesText::new(text))),
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), RdfXmlSyntaxError> {
    writer.write_event(event).map_err(|e| {
        RdfXmlSyntaxError::msg(format!("Failed to serialize the XML literal content: {e}"))
    })
}

pub(crate) fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_utf8(encoding: &[u8]) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_slice(),
        b"unicode-1-1-utf-8"
            | b"unicode11utf8"
            | b"unicode20utf8"
            | b"utf-8"
            | b"utf8"
            | b"x-unicode20utf8"
    )
}
