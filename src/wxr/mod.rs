//! WXR document parsing
//!
//! WXR (WordPress eXtended RSS) is the XML dialect WordPress uses for site
//! exports. This module parses a WXR document into a generic element tree and
//! provides the text helpers the extraction layer is built on. Parsing is
//! namespace-unaware: qualified names like `wp:post_id` are matched literally,
//! which is how the format is used in practice.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;

pub mod extract;

pub use extract::{
    AttachmentRecord, AuthorRecord, CategoryRecord, CommentRecord, ExtractedDocument, PostRecord,
    TagRecord, TaxonomyRef,
};

/// One element in the parsed tree
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Qualified element name as written in the document (e.g., "wp:post_id")
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<Node>,
}

/// A node in the parsed tree
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Text or CDATA content
    Text(String),
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// First child element with the given qualified name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// All child elements with the given qualified name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text and CDATA content of this element's direct children
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(text) = node {
                out.push_str(text);
            }
        }
        out
    }
}

/// Trimmed text content of a named child, empty string when the child is absent
///
/// WXR is irregular about optional elements; centralizing the
/// absent-means-empty rule here keeps the extraction code free of
/// per-field Option plumbing.
pub fn text_of(parent: &Element, name: &str) -> String {
    parent
        .child(name)
        .map(|el| el.text().trim().to_string())
        .unwrap_or_default()
}

/// Parse a WXR document into an element tree
///
/// Returns the root element. Any malformed XML (mismatched tags, truncated
/// document, invalid attribute syntax) is fatal and yields [`Error::Parse`].
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) => {
                let element = element_from_tag(&e)?;
                stack.push(element);
            }
            Ok(XmlEvent::Empty(e)) => {
                let element = element_from_tag(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(XmlEvent::End(_)) => {
                // quick-xml validates end-tag names against the open tag,
                // so a successful End event always closes the stack top
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse("closing tag without matching opening tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(XmlEvent::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::Parse(format!("invalid text content: {err}")))?;
                // Whitespace-only runs are document formatting, not content
                if !text.trim().is_empty()
                    && let Some(parent) = stack.last_mut()
                {
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Ok(XmlEvent::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Ok(XmlEvent::Eof) => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no content we use
            Ok(_) => {}
            Err(err) => {
                return Err(Error::Parse(format!(
                    "malformed XML at byte {}: {err}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::Parse("unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".into()))
}

/// Build an Element from a start or empty tag, decoding its attributes
fn element_from_tag(tag: &quick_xml::events::BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
    let mut element = Element::new(name);

    for attr in tag.attributes() {
        let attr = attr.map_err(|err| Error::Parse(format!("invalid attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Parse(format!("invalid attribute value: {err}")))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// Attach a completed element to its parent, or install it as the root
fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(Error::Parse("multiple root elements".into()));
            }
            *root = Some(element);
            Ok(())
        }
    }
}
