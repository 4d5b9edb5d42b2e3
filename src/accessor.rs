//! Extraction helpers on [`Node`]: text, markup, attributes, resolved links
//! and selection with optional, or-fail and typed variants.
//!
//! Every extracted string goes through [`decode_value`]: HTML entities are
//! decoded, percent-escapes unescaped, surrounding whitespace trimmed.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::coerce::FromAttrValue;
use crate::decode::decode_value;
use crate::dom::{FromNode, Node, NodeList};
use crate::error::{Result, ScrapeError};
use crate::selector::{NodeSelector, Selector};
use crate::xpath::XPathExpr;

const SRC: &str = "src";
const HREF: &str = "href";

fn not_found(selector: &NodeSelector) -> ScrapeError {
    ScrapeError::NodeNotFound {
        selector: selector.to_string(),
    }
}

impl<'a> Node<'a> {
    // Text and markup

    /// Decoded text of the node and its descendants; empty when there is none
    pub fn text(&self) -> String {
        decode_value(&self.text_raw())
    }

    /// Same as [`Node::text`]
    pub fn text_content(&self) -> String {
        self.text()
    }

    /// Decoded outer markup; empty for non-elements
    pub fn html(&self) -> String {
        self.outer_markup()
            .map(|markup| decode_value(&markup))
            .unwrap_or_default()
    }

    /// Same as [`Node::html`]
    pub fn html_content(&self) -> String {
        self.html()
    }

    /// Decoded inner markup; empty for non-elements
    pub fn inner_html(&self) -> String {
        self.inner_markup()
            .map(|markup| decode_value(&markup))
            .unwrap_or_default()
    }

    /// Same as [`Node::inner_html`]
    pub fn inner_html_content(&self) -> String {
        self.inner_html()
    }

    // Attributes

    /// Decoded attribute value, `None` when absent or on non-elements
    pub fn attr_opt(&self, name: &str) -> Option<String> {
        self.attr_raw(name).map(decode_value)
    }

    /// Decoded attribute value; fails with `AttributeNotFound` when absent
    pub fn attr(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(ScrapeError::NullArgument("name"));
        }
        self.attr_opt(name).ok_or_else(|| ScrapeError::AttributeNotFound {
            name: name.to_string(),
        })
    }

    /// Decoded attribute value, or `default` when absent
    pub fn attr_or(&self, name: &str, default: impl Into<String>) -> String {
        self.attr_opt(name).unwrap_or_else(|| default.into())
    }

    /// Attribute value coerced into `T`
    pub fn attr_as<T: FromAttrValue>(&self, name: &str) -> Result<T> {
        T::from_attr_value(&self.attr(name)?)
    }

    /// Attribute value coerced into `T`, or `default` when absent; a present
    /// value that does not coerce is still an error
    pub fn attr_as_or<T: FromAttrValue>(&self, name: &str, default: T) -> Result<T> {
        match self.attr_opt(name) {
            Some(value) => T::from_attr_value(&value),
            None => Ok(default),
        }
    }

    // Links

    /// Resolve a decoded reference against the node's base URI
    fn resolve(&self, value: &str) -> Result<Url> {
        let resolved = match self.base_url() {
            Some(base) => base.join(value),
            None => Url::parse(value),
        };
        resolved.map_err(|e| ScrapeError::invalid_uri(value, e))
    }

    // Links only exist on elements; other nodes fail before the lookup
    fn link(&self, name: &str) -> Result<Url> {
        if !self.is_element() {
            return Err(ScrapeError::NotAnElement);
        }
        let value = self.attr(name)?;
        self.resolve(&value)
    }

    fn link_opt(&self, name: &str) -> Result<Option<Url>> {
        if !self.is_element() {
            return Err(ScrapeError::NotAnElement);
        }
        self.attr_opt(name).map(|value| self.resolve(&value)).transpose()
    }

    fn link_as<T: FromAttrValue>(url: &Url) -> Result<T> {
        T::from_attr_value(&percent_decode_str(url.as_str()).decode_utf8_lossy())
    }

    /// The `src` attribute as an absolute URL
    pub fn src(&self) -> Result<Url> {
        self.link(SRC)
    }

    pub fn src_opt(&self) -> Result<Option<Url>> {
        self.link_opt(SRC)
    }

    pub fn src_or(&self, default: Url) -> Result<Url> {
        Ok(self.link_opt(SRC)?.unwrap_or(default))
    }

    /// The resolved `src` rendered unescaped, then coerced into `T`
    pub fn src_as<T: FromAttrValue>(&self) -> Result<T> {
        Self::link_as(&self.src()?)
    }

    pub fn src_as_or<T: FromAttrValue>(&self, default: T) -> Result<T> {
        match self.src_opt()? {
            Some(url) => Self::link_as(&url),
            None => Ok(default),
        }
    }

    /// The `href` attribute as an absolute URL
    pub fn href(&self) -> Result<Url> {
        self.link(HREF)
    }

    pub fn href_opt(&self) -> Result<Option<Url>> {
        self.link_opt(HREF)
    }

    pub fn href_or(&self, default: Url) -> Result<Url> {
        Ok(self.link_opt(HREF)?.unwrap_or(default))
    }

    /// The resolved `href` rendered unescaped, then coerced into `T`
    pub fn href_as<T: FromAttrValue>(&self) -> Result<T> {
        Self::link_as(&self.href()?)
    }

    pub fn href_as_or<T: FromAttrValue>(&self, default: T) -> Result<T> {
        match self.href_opt()? {
            Some(url) => Self::link_as(&url),
            None => Ok(default),
        }
    }

    // Selection

    /// First match of `selector`
    pub fn select(&self, selector: &NodeSelector) -> Option<Node<'a>> {
        selector.select(*self)
    }

    /// First match of `selector`; fails with `NodeNotFound` carrying the
    /// selector's display text
    pub fn select_or_fail(&self, selector: &NodeSelector) -> Result<Node<'a>> {
        self.select(selector).ok_or_else(|| not_found(selector))
    }

    /// Every match of `selector`
    pub fn select_all(&self, selector: &NodeSelector) -> NodeList<'a> {
        NodeList::new(selector.select_all(*self))
    }

    /// First match, if it is a `T`
    pub fn select_as<T: FromNode<'a>>(&self, selector: &NodeSelector) -> Option<T> {
        self.select(selector).and_then(T::from_node)
    }

    /// First match as a `T`; a match of another type counts as not found
    pub fn select_as_or_fail<T: FromNode<'a>>(&self, selector: &NodeSelector) -> Result<T> {
        self.select_as(selector).ok_or_else(|| not_found(selector))
    }

    /// Every match that is a `T`
    pub fn select_all_as<T: FromNode<'a>>(&self, selector: &NodeSelector) -> Vec<T> {
        selector
            .select_all(*self)
            .into_iter()
            .filter_map(T::from_node)
            .collect()
    }

    pub fn css(&self, selector: &str) -> Result<Option<Node<'a>>> {
        Ok(self.select(&NodeSelector::css(selector)?))
    }

    pub fn css_or_fail(&self, selector: &str) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::css(selector)?)
    }

    pub fn css_all(&self, selector: &str) -> Result<NodeList<'a>> {
        Ok(self.select_all(&NodeSelector::css(selector)?))
    }

    pub fn css_as<T: FromNode<'a>>(&self, selector: &str) -> Result<Option<T>> {
        Ok(self.select_as(&NodeSelector::css(selector)?))
    }

    pub fn css_as_or_fail<T: FromNode<'a>>(&self, selector: &str) -> Result<T> {
        self.select_as_or_fail(&NodeSelector::css(selector)?)
    }

    pub fn css_all_as<T: FromNode<'a>>(&self, selector: &str) -> Result<Vec<T>> {
        Ok(self.select_all_as(&NodeSelector::css(selector)?))
    }

    pub fn xpath(&self, xpath: &str) -> Result<Option<Node<'a>>> {
        Ok(self.select(&NodeSelector::xpath(xpath)?))
    }

    pub fn xpath_or_fail(&self, xpath: &str) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::xpath(xpath)?)
    }

    pub fn xpath_all(&self, xpath: &str) -> Result<NodeList<'a>> {
        Ok(self.select_all(&NodeSelector::xpath(xpath)?))
    }

    pub fn xpath_as<T: FromNode<'a>>(&self, xpath: &str) -> Result<Option<T>> {
        Ok(self.select_as(&NodeSelector::xpath(xpath)?))
    }

    pub fn xpath_as_or_fail<T: FromNode<'a>>(&self, xpath: &str) -> Result<T> {
        self.select_as_or_fail(&NodeSelector::xpath(xpath)?)
    }

    pub fn xpath_all_as<T: FromNode<'a>>(&self, xpath: &str) -> Result<Vec<T>> {
        Ok(self.select_all_as(&NodeSelector::xpath(xpath)?))
    }

    /// First match of a compiled XPath expression
    pub fn xpath_expr(&self, expr: &XPathExpr) -> Option<Node<'a>> {
        self.select(&NodeSelector::xpath_expr(expr.clone()))
    }

    pub fn xpath_expr_or_fail(&self, expr: &XPathExpr) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::xpath_expr(expr.clone()))
    }

    pub fn xpath_expr_all(&self, expr: &XPathExpr) -> NodeList<'a> {
        self.select_all(&NodeSelector::xpath_expr(expr.clone()))
    }
}

/// Selection across a sequence of nodes: single forms return the first
/// match found trying each node in order, "all" forms concatenate
pub trait NodesExt<'a> {
    fn select(&self, selector: &NodeSelector) -> Option<Node<'a>>;
    fn select_all(&self, selector: &NodeSelector) -> NodeList<'a>;

    fn select_or_fail(&self, selector: &NodeSelector) -> Result<Node<'a>> {
        self.select(selector).ok_or_else(|| not_found(selector))
    }

    fn css(&self, selector: &str) -> Result<Option<Node<'a>>> {
        Ok(self.select(&NodeSelector::css(selector)?))
    }

    fn css_or_fail(&self, selector: &str) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::css(selector)?)
    }

    fn css_all(&self, selector: &str) -> Result<NodeList<'a>> {
        Ok(self.select_all(&NodeSelector::css(selector)?))
    }

    fn xpath(&self, xpath: &str) -> Result<Option<Node<'a>>> {
        Ok(self.select(&NodeSelector::xpath(xpath)?))
    }

    fn xpath_or_fail(&self, xpath: &str) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::xpath(xpath)?)
    }

    fn xpath_all(&self, xpath: &str) -> Result<NodeList<'a>> {
        Ok(self.select_all(&NodeSelector::xpath(xpath)?))
    }

    fn xpath_expr(&self, expr: &XPathExpr) -> Option<Node<'a>> {
        self.select(&NodeSelector::xpath_expr(expr.clone()))
    }

    fn xpath_expr_or_fail(&self, expr: &XPathExpr) -> Result<Node<'a>> {
        self.select_or_fail(&NodeSelector::xpath_expr(expr.clone()))
    }

    fn xpath_expr_all(&self, expr: &XPathExpr) -> NodeList<'a> {
        self.select_all(&NodeSelector::xpath_expr(expr.clone()))
    }
}

impl<'a> NodesExt<'a> for [Node<'a>] {
    fn select(&self, selector: &NodeSelector) -> Option<Node<'a>> {
        selector.select_first_in(self.iter().copied())
    }

    fn select_all(&self, selector: &NodeSelector) -> NodeList<'a> {
        NodeList::new(selector.select_all_in(self.iter().copied()))
    }
}
