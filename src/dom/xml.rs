//! XML documents built from quick-xml events into an ego_tree tree

use ego_tree::{NodeId, Tree};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::{Node, NodeKind};
use crate::error::Result;

/// Payload of a node in an XML tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlData {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

/// A parsed XML document
#[derive(Debug, Clone)]
pub struct XmlDocument {
    tree: Tree<XmlData>,
    url: Option<Url>,
}

impl XmlDocument {
    /// Parse an XML document without a document URL
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with_url(xml, None)
    }

    /// Parse an XML document fetched from `url`.
    ///
    /// Text and CDATA become text nodes, comments are kept, declarations,
    /// doctypes and processing instructions are dropped.
    pub fn parse_with_url(xml: &str, url: Option<Url>) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut tree = Tree::new(XmlData::Document);
        let mut open = vec![tree.root().id()];

        loop {
            let parent = open.last().copied().unwrap_or_else(|| tree.root().id());
            match reader.read_event()? {
                Event::Start(start) => {
                    let id = append(&mut tree, parent, element(&start)?);
                    open.push(id);
                }
                Event::Empty(start) => {
                    append(&mut tree, parent, element(&start)?);
                }
                Event::End(_) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if !text.is_empty() {
                        append(&mut tree, parent, XmlData::Text(text.into_owned()));
                    }
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    append(&mut tree, parent, XmlData::Text(text));
                }
                Event::Comment(comment) => {
                    let text = String::from_utf8_lossy(&comment).into_owned();
                    append(&mut tree, parent, XmlData::Comment(text));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { tree, url })
    }

    /// URL the document was fetched from
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The document node
    pub fn root(&self) -> Node<'_> {
        Node::from_xml(self, self.tree.root())
    }

    pub fn document_element(&self) -> Option<Node<'_>> {
        self.root().document_element()
    }
}

fn element(start: &BytesStart<'_>) -> Result<XmlData> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(XmlData::Element { name, attrs })
}

fn append(tree: &mut Tree<XmlData>, parent: NodeId, data: XmlData) -> NodeId {
    match tree.get_mut(parent) {
        Some(mut node) => node.append(data).id(),
        None => tree.root_mut().append(data).id(),
    }
}

/// Outer markup of an XML element
pub(super) fn serialize(node: &Node<'_>) -> String {
    let mut out = String::new();
    write_markup(node, &mut out);
    out
}

fn write_markup(node: &Node<'_>, out: &mut String) {
    match node.kind() {
        NodeKind::Element => {
            let name = node.name().unwrap_or_default();
            out.push('<');
            out.push_str(name);
            for (key, value) in node.attributes() {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value));
                out.push('"');
            }
            if node.first_child().is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in node.children() {
                write_markup(&child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Text => out.push_str(&partial_escape(&node.text_raw())),
        _ => out.push_str(&node.to_markup()),
    }
}

/// Base URI from `xml:base` on the node and its ancestors, outermost first,
/// applied on top of the document URL
pub(super) fn base_url(doc: &XmlDocument, node: &Node<'_>) -> Option<Url> {
    let mut bases: Vec<&str> = std::iter::once(*node)
        .chain(node.ancestors())
        .filter_map(|n| n.attr_raw("xml:base"))
        .collect();
    bases.reverse();

    let mut current = doc.url.clone();
    for base in bases {
        let next = match &current {
            Some(url) => url.join(base),
            None => Url::parse(base),
        };
        match next {
            Ok(url) => current = Some(url),
            Err(e) => tracing::debug!("Ignoring unusable xml:base \"{}\": {}", base, e),
        }
    }
    current
}
