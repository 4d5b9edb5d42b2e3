//! Typed views over `Node` used by the `*_as` selection helpers

use std::ops::Deref;

use scraper::ElementRef;

use super::{Node, NodeKind};

/// Checked conversion from a generic node into a more specific view
pub trait FromNode<'a>: Sized {
    fn from_node(node: Node<'a>) -> Option<Self>;
}

impl<'a> FromNode<'a> for Node<'a> {
    fn from_node(node: Node<'a>) -> Option<Self> {
        Some(node)
    }
}

impl<'a> FromNode<'a> for ElementRef<'a> {
    fn from_node(node: Node<'a>) -> Option<Self> {
        node.as_html_element()
    }
}

/// An element of either document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a>(Node<'a>);

impl<'a> Element<'a> {
    pub fn name(&self) -> &'a str {
        self.0.name().unwrap_or_default()
    }

    pub fn node(&self) -> Node<'a> {
        self.0
    }
}

impl<'a> Deref for Element<'a> {
    type Target = Node<'a>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> FromNode<'a> for Element<'a> {
    fn from_node(node: Node<'a>) -> Option<Self> {
        node.is_element().then_some(Self(node))
    }
}

/// A text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNode<'a>(Node<'a>);

impl<'a> TextNode<'a> {
    /// Text as parsed, without decoding or trimming
    pub fn raw(&self) -> String {
        self.0.text_raw()
    }

    pub fn node(&self) -> Node<'a> {
        self.0
    }
}

impl<'a> Deref for TextNode<'a> {
    type Target = Node<'a>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> FromNode<'a> for TextNode<'a> {
    fn from_node(node: Node<'a>) -> Option<Self> {
        (node.kind() == NodeKind::Text).then_some(Self(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, XmlDocument};

    #[test]
    fn test_casts() {
        let doc = HtmlDocument::parse("<p>hi</p>");
        let p = doc.root().descendants().find(|n| n.name() == Some("p")).unwrap();
        let text = p.first_child().unwrap();

        assert_eq!(Element::from_node(p).map(|e| e.name()), Some("p"));
        assert!(Element::from_node(text).is_none());
        assert_eq!(TextNode::from_node(text).map(|t| t.raw()).as_deref(), Some("hi"));
        assert!(ElementRef::from_node(p).is_some());
        assert!(ElementRef::from_node(doc.root()).is_none());
    }

    #[test]
    fn test_xml_elements_are_not_scraper_elements() {
        let doc = XmlDocument::parse("<root/>").unwrap();
        let root = doc.document_element().unwrap();
        assert!(Element::from_node(root).is_some());
        assert!(ElementRef::from_node(root).is_none());
    }
}
