//! Document model shared by the selection and accessor layers
//!
//! Parsing is delegated: HTML goes through `scraper` (html5ever), XML through
//! `quick-xml`. Both trees are exposed through the same `Node` handle, which
//! offers the capabilities the rest of the crate relies on:
//! - kind tests (document, element, text, comment)
//! - attribute lookup by name
//! - text content and outer/inner markup
//! - tree navigation (parent, children, siblings, root)
//! - base-URI resolution

mod cast;
mod html;
mod xml;

pub use cast::{Element, FromNode, TextNode};
pub use html::HtmlDocument;
pub use xml::XmlDocument;

pub(crate) use xml::XmlData;

use std::fmt;
use std::ops::Deref;

use ego_tree::{NodeId, NodeRef};
use quick_xml::escape::partial_escape;
use scraper::ElementRef;
use url::Url;

/// Classification of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    /// Doctypes, processing instructions
    Other,
}

/// Handle onto a node of an [`HtmlDocument`] or an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct Node<'a> {
    inner: Inner<'a>,
}

#[derive(Clone, Copy)]
enum Inner<'a> {
    Html {
        doc: &'a HtmlDocument,
        node: NodeRef<'a, scraper::Node>,
    },
    Xml {
        doc: &'a XmlDocument,
        node: NodeRef<'a, XmlData>,
    },
}

impl<'a> Node<'a> {
    pub(crate) fn from_html(doc: &'a HtmlDocument, node: NodeRef<'a, scraper::Node>) -> Self {
        Self {
            inner: Inner::Html { doc, node },
        }
    }

    pub(crate) fn from_xml(doc: &'a XmlDocument, node: NodeRef<'a, XmlData>) -> Self {
        Self {
            inner: Inner::Xml { doc, node },
        }
    }

    /// Tree-local node identifier
    pub(crate) fn id(&self) -> NodeId {
        match self.inner {
            Inner::Html { node, .. } => node.id(),
            Inner::Xml { node, .. } => node.id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.inner {
            Inner::Html { node, .. } => match node.value() {
                scraper::Node::Document | scraper::Node::Fragment => NodeKind::Document,
                scraper::Node::Element(_) => NodeKind::Element,
                scraper::Node::Text(_) => NodeKind::Text,
                scraper::Node::Comment(_) => NodeKind::Comment,
                _ => NodeKind::Other,
            },
            Inner::Xml { node, .. } => match node.value() {
                XmlData::Document => NodeKind::Document,
                XmlData::Element { .. } => NodeKind::Element,
                XmlData::Text(_) => NodeKind::Text,
                XmlData::Comment(_) => NodeKind::Comment,
            },
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_document(&self) -> bool {
        self.kind() == NodeKind::Document
    }

    /// True for nodes of an HTML document
    pub fn is_html(&self) -> bool {
        matches!(self.inner, Inner::Html { .. })
    }

    /// Element name; HTML names are lowercase local names, XML names are kept
    /// as written (including any prefix)
    pub fn name(&self) -> Option<&'a str> {
        match self.inner {
            Inner::Html { node, .. } => node.value().as_element().map(|el| el.name()),
            Inner::Xml { node, .. } => match node.value() {
                XmlData::Element { name, .. } => Some(name.as_str()),
                _ => None,
            },
        }
    }

    /// Element name without its namespace prefix
    pub fn local_name(&self) -> Option<&'a str> {
        self.name()
            .map(|name| name.rsplit_once(':').map_or(name, |(_, local)| local))
    }

    /// Raw attribute value, without decoding; `None` for non-elements
    pub fn attr_raw(&self, name: &str) -> Option<&'a str> {
        match self.inner {
            Inner::Html { node, .. } => node.value().as_element().and_then(|el| el.attr(name)),
            Inner::Xml { node, .. } => match node.value() {
                XmlData::Element { attrs, .. } => attrs
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.as_str()),
                _ => None,
            },
        }
    }

    /// All attributes of an element in document order
    pub fn attributes(&self) -> Vec<(&'a str, &'a str)> {
        match self.inner {
            Inner::Html { node, .. } => node
                .value()
                .as_element()
                .map(|el| el.attrs().collect())
                .unwrap_or_default(),
            Inner::Xml { node, .. } => match node.value() {
                XmlData::Element { attrs, .. } => attrs
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    /// Own text of a text or comment node
    fn own_text(&self) -> Option<&'a str> {
        match self.inner {
            Inner::Html { node, .. } => match node.value() {
                scraper::Node::Text(text) => Some(&**text),
                scraper::Node::Comment(comment) => Some(&**comment),
                _ => None,
            },
            Inner::Xml { node, .. } => match node.value() {
                XmlData::Text(text) | XmlData::Comment(text) => Some(text.as_str()),
                _ => None,
            },
        }
    }

    /// Concatenated text of the node and its descendants, as parsed
    pub fn text_raw(&self) -> String {
        match self.kind() {
            NodeKind::Text | NodeKind::Comment => self.own_text().unwrap_or_default().to_string(),
            NodeKind::Element | NodeKind::Document => self
                .descendants()
                .filter(|node| node.kind() == NodeKind::Text)
                .filter_map(|node| node.own_text())
                .collect(),
            NodeKind::Other => String::new(),
        }
    }

    /// Markup of the element itself; `None` for non-elements
    pub fn outer_markup(&self) -> Option<String> {
        match self.inner {
            Inner::Html { node, .. } => ElementRef::wrap(node).map(|el| el.html()),
            Inner::Xml { .. } if self.is_element() => Some(xml::serialize(self)),
            Inner::Xml { .. } => None,
        }
    }

    /// Markup of the element's children; `None` for non-elements
    pub fn inner_markup(&self) -> Option<String> {
        match self.inner {
            Inner::Html { node, .. } => ElementRef::wrap(node).map(|el| el.inner_html()),
            Inner::Xml { .. } if self.is_element() => {
                Some(self.children().map(|child| child.to_markup()).collect())
            }
            Inner::Xml { .. } => None,
        }
    }

    /// Markup of any node: elements as outer markup, text escaped, comments
    /// delimited, documents as the markup of their children
    pub fn to_markup(&self) -> String {
        match self.kind() {
            NodeKind::Element => self.outer_markup().unwrap_or_default(),
            NodeKind::Text => partial_escape(self.own_text().unwrap_or_default()).into_owned(),
            NodeKind::Comment => format!("<!--{}-->", self.own_text().unwrap_or_default()),
            NodeKind::Document => self.children().map(|child| child.to_markup()).collect(),
            NodeKind::Other => String::new(),
        }
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        match self.inner {
            Inner::Html { doc, node } => node.parent().map(|n| Node::from_html(doc, n)),
            Inner::Xml { doc, node } => node.parent().map(|n| Node::from_xml(doc, n)),
        }
    }

    pub fn first_child(&self) -> Option<Node<'a>> {
        match self.inner {
            Inner::Html { doc, node } => node.first_child().map(|n| Node::from_html(doc, n)),
            Inner::Xml { doc, node } => node.first_child().map(|n| Node::from_xml(doc, n)),
        }
    }

    pub fn next_sibling(&self) -> Option<Node<'a>> {
        match self.inner {
            Inner::Html { doc, node } => node.next_sibling().map(|n| Node::from_html(doc, n)),
            Inner::Xml { doc, node } => node.next_sibling().map(|n| Node::from_xml(doc, n)),
        }
    }

    pub fn prev_sibling(&self) -> Option<Node<'a>> {
        match self.inner {
            Inner::Html { doc, node } => node.prev_sibling().map(|n| Node::from_html(doc, n)),
            Inner::Xml { doc, node } => node.prev_sibling().map(|n| Node::from_xml(doc, n)),
        }
    }

    pub fn children(&self) -> Children<'a> {
        Children {
            next: self.first_child(),
        }
    }

    /// The node followed by all its descendants in document order
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            root: *self,
            next: Some(*self),
        }
    }

    /// Ancestors from the parent up to the document node
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// The document node of the tree this node belongs to
    pub fn root(&self) -> Node<'a> {
        match self.inner {
            Inner::Html { doc, .. } => doc.root(),
            Inner::Xml { doc, .. } => doc.root(),
        }
    }

    /// The first element child of the document node
    pub fn document_element(&self) -> Option<Node<'a>> {
        self.root().children().find(|child| child.is_element())
    }

    /// The node to select from: documents are replaced by their root element
    pub(crate) fn selection_scope(&self) -> Option<Node<'a>> {
        if self.is_document() {
            self.document_element()
        } else {
            Some(*self)
        }
    }

    /// Base URI used to resolve relative references found on this node
    pub fn base_url(&self) -> Option<Url> {
        match self.inner {
            Inner::Html { doc, .. } => doc.base_url().cloned(),
            Inner::Xml { doc, .. } => xml::base_url(doc, self),
        }
    }

    /// The node as a scraper element, for HTML elements
    pub fn as_html_element(&self) -> Option<ElementRef<'a>> {
        match self.inner {
            Inner::Html { node, .. } => ElementRef::wrap(node),
            Inner::Xml { .. } => None,
        }
    }

    /// Wrap an element of this node's HTML tree
    pub(crate) fn wrap_html_element(&self, element: ElementRef<'a>) -> Option<Node<'a>> {
        match self.inner {
            Inner::Html { doc, .. } => Some(Node::from_html(doc, *element)),
            Inner::Xml { .. } => None,
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.inner, other.inner) {
            (Inner::Html { node: a, .. }, Inner::Html { node: b, .. }) => a == b,
            (Inner::Xml { node: a, .. }, Inner::Xml { node: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element => write!(f, "Element({})", self.name().unwrap_or_default()),
            NodeKind::Text => write!(f, "Text({:?})", self.own_text().unwrap_or_default()),
            kind => write!(f, "{kind:?}"),
        }
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    next: Option<Node<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next_sibling();
        Some(current)
    }
}

/// Pre-order iterator over a node and its descendants
pub struct Descendants<'a> {
    root: Node<'a>,
    next: Option<Node<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = match current.first_child() {
            Some(child) => Some(child),
            None => {
                let mut node = current;
                loop {
                    if node == self.root {
                        break None;
                    }
                    if let Some(sibling) = node.next_sibling() {
                        break Some(sibling);
                    }
                    match node.parent() {
                        Some(parent) => node = parent,
                        None => break None,
                    }
                }
            }
        };
        Some(current)
    }
}

/// Ordered, immutable sequence of selected nodes
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NodeList<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> NodeList<'a> {
    pub fn new(nodes: Vec<Node<'a>>) -> Self {
        Self { nodes }
    }

    /// Concatenated markup of every node
    pub fn to_html(&self) -> String {
        self.nodes.iter().map(|node| node.to_markup()).collect()
    }

    pub fn into_vec(self) -> Vec<Node<'a>> {
        self.nodes
    }
}

impl<'a> Deref for NodeList<'a> {
    type Target = [Node<'a>];

    fn deref(&self) -> &Self::Target {
        &self.nodes
    }
}

impl<'a> FromIterator<Node<'a>> for NodeList<'a> {
    fn from_iter<I: IntoIterator<Item = Node<'a>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for NodeList<'a> {
    type Item = Node<'a>;
    type IntoIter = std::vec::IntoIter<Node<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a, 'l> IntoIterator for &'l NodeList<'a> {
    type Item = &'l Node<'a>;
    type IntoIter = std::slice::Iter<'l, Node<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Debug for NodeList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>T</title></head>
        <body><div id="main" class="a b"><p>One <b>two</b></p><!-- note --><p>three</p></div></body></html>"#;

    #[test]
    fn test_kinds_and_navigation() {
        let doc = HtmlDocument::parse(PAGE);
        let root = doc.root();
        assert!(root.is_document());

        let html = root.document_element().unwrap();
        assert_eq!(html.name(), Some("html"));
        assert_eq!(html.parent(), Some(root));

        let names: Vec<_> = html.children().filter_map(|n| n.name()).collect();
        assert_eq!(names, vec!["head", "body"]);
    }

    #[test]
    fn test_descendants_stay_inside_subtree() {
        let doc = HtmlDocument::parse(PAGE);
        let div = doc
            .root()
            .descendants()
            .find(|n| n.attr_raw("id") == Some("main"))
            .unwrap();

        let elements: Vec<_> = div.descendants().filter_map(|n| n.name()).collect();
        assert_eq!(elements, vec!["div", "p", "b", "p"]);
        assert_eq!(div.text_raw(), "One twothree");
    }

    #[test]
    fn test_markup() {
        let doc = HtmlDocument::parse(PAGE);
        let p = doc.root().descendants().find(|n| n.name() == Some("p")).unwrap();
        assert_eq!(p.outer_markup().as_deref(), Some("<p>One <b>two</b></p>"));
        assert_eq!(p.inner_markup().as_deref(), Some("One <b>two</b>"));

        let text = p.first_child().unwrap();
        assert_eq!(text.kind(), NodeKind::Text);
        assert_eq!(text.outer_markup(), None);

        let comment = p.next_sibling().unwrap();
        assert_eq!(comment.kind(), NodeKind::Comment);
        assert_eq!(comment.to_markup(), "<!-- note -->");
    }

    #[test]
    fn test_node_list_to_html() {
        let doc = HtmlDocument::parse(PAGE);
        let list: NodeList = doc
            .root()
            .descendants()
            .filter(|n| n.name() == Some("p"))
            .collect();
        assert_eq!(list.len(), 2);
        assert_eq!(list.to_html(), "<p>One <b>two</b></p><p>three</p>");
    }

    #[test]
    fn test_xml_and_html_nodes_never_equal() {
        let html = HtmlDocument::parse("<p>x</p>");
        let xml = XmlDocument::parse("<p>x</p>").unwrap();
        assert_ne!(html.root(), xml.root());
        assert_eq!(xml.root(), xml.root());
    }
}
