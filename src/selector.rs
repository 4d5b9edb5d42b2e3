//! Node selection strategies
//!
//! [`Selector`] is the select-one / select-all abstraction. [`CssSelector`],
//! [`XPathSelector`] and [`FnSelector`] implement it against [`Node`], and
//! [`NodeSelector`] wraps any one of them together with a label used in
//! diagnostics.

use std::fmt;
use std::sync::Arc;

use crate::dom::Node;
use crate::error::{Result, ScrapeError};
use crate::xpath::XPathExpr;

/// Select one or all matches from a node, or from a sequence of nodes
pub trait Selector<N> {
    type Output;

    /// The first match, if any
    fn select(&self, node: N) -> Option<Self::Output>;

    /// Every match in order
    fn select_all(&self, node: N) -> Vec<Self::Output>;

    /// The first match across `nodes`, trying them in order
    fn select_first_in<I>(&self, nodes: I) -> Option<Self::Output>
    where
        I: IntoIterator<Item = N>,
    {
        nodes.into_iter().find_map(|node| self.select(node))
    }

    /// Matches of every node, in node order then match order
    fn select_all_in<I>(&self, nodes: I) -> Vec<Self::Output>
    where
        I: IntoIterator<Item = N>,
    {
        nodes
            .into_iter()
            .flat_map(|node| self.select_all(node))
            .collect()
    }
}

/// A compiled CSS selector; matches descendants of HTML elements
#[derive(Debug, Clone)]
pub struct CssSelector {
    source: String,
    selector: scraper::Selector,
}

impl CssSelector {
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(ScrapeError::NullArgument("selector"));
        }
        let selector =
            scraper::Selector::parse(source).map_err(|e| ScrapeError::InvalidSelector {
                selector: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl<'a> Selector<Node<'a>> for CssSelector {
    type Output = Node<'a>;

    fn select(&self, node: Node<'a>) -> Option<Node<'a>> {
        let scope = node.selection_scope()?;
        let element = scope.as_html_element()?;
        let found = element.select(&self.selector).next()?;
        node.wrap_html_element(found)
    }

    fn select_all(&self, node: Node<'a>) -> Vec<Node<'a>> {
        let Some(element) = node.selection_scope().and_then(|n| n.as_html_element()) else {
            if !node.is_html() {
                tracing::debug!("CSS selector '{}' applied to an XML node", self.source);
            }
            return Vec::new();
        };
        element
            .select(&self.selector)
            .filter_map(|el| node.wrap_html_element(el))
            .collect()
    }
}

/// A compiled XPath expression; attribute results are dropped
#[derive(Debug, Clone)]
pub struct XPathSelector {
    expr: XPathExpr,
}

impl XPathSelector {
    pub fn parse(source: &str) -> Result<Self> {
        XPathExpr::compile(source).map(Self::new)
    }

    pub fn new(expr: XPathExpr) -> Self {
        Self { expr }
    }

    pub fn expr(&self) -> &XPathExpr {
        &self.expr
    }
}

impl<'a> Selector<Node<'a>> for XPathSelector {
    type Output = Node<'a>;

    fn select(&self, node: Node<'a>) -> Option<Node<'a>> {
        self.expr.select_first(node.selection_scope()?)
    }

    fn select_all(&self, node: Node<'a>) -> Vec<Node<'a>> {
        match node.selection_scope() {
            Some(scope) => self.expr.select_all(scope),
            None => Vec::new(),
        }
    }
}

type SelectOne = dyn for<'a> Fn(Node<'a>) -> Option<Node<'a>> + Send + Sync;
type SelectMany = dyn for<'a> Fn(Node<'a>) -> Vec<Node<'a>> + Send + Sync;

/// Selection through caller-supplied functions
#[derive(Clone)]
pub struct FnSelector {
    one: Arc<SelectOne>,
    many: Arc<SelectMany>,
}

impl FnSelector {
    pub fn new<F, G>(select_one: F, select_many: G) -> Self
    where
        F: for<'a> Fn(Node<'a>) -> Option<Node<'a>> + Send + Sync + 'static,
        G: for<'a> Fn(Node<'a>) -> Vec<Node<'a>> + Send + Sync + 'static,
    {
        Self {
            one: Arc::new(select_one),
            many: Arc::new(select_many),
        }
    }
}

impl fmt::Debug for FnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSelector")
    }
}

impl<'a> Selector<Node<'a>> for FnSelector {
    type Output = Node<'a>;

    fn select(&self, node: Node<'a>) -> Option<Node<'a>> {
        (self.one)(node.selection_scope()?)
    }

    fn select_all(&self, node: Node<'a>) -> Vec<Node<'a>> {
        match node.selection_scope() {
            Some(scope) => (self.many)(scope),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Css(CssSelector),
    XPath(XPathSelector),
    Custom(FnSelector),
}

/// One selection strategy plus the label shown in errors.
///
/// Immutable and cheap to clone; compile once and reuse across documents.
#[derive(Debug, Clone)]
pub struct NodeSelector {
    display: Option<String>,
    strategy: Strategy,
}

impl NodeSelector {
    /// Compile a CSS selector
    pub fn css(selector: &str) -> Result<Self> {
        CssSelector::parse(selector).map(|css| Self {
            display: None,
            strategy: Strategy::Css(css),
        })
    }

    /// Compile an XPath expression
    pub fn xpath(xpath: &str) -> Result<Self> {
        XPathExpr::compile(xpath).map(Self::xpath_expr)
    }

    /// Wrap an already compiled XPath expression
    pub fn xpath_expr(expr: XPathExpr) -> Self {
        Self {
            display: None,
            strategy: Strategy::XPath(XPathSelector::new(expr)),
        }
    }

    /// Select through caller-supplied functions
    pub fn custom<F, G>(select_one: F, select_many: G) -> Self
    where
        F: for<'a> Fn(Node<'a>) -> Option<Node<'a>> + Send + Sync + 'static,
        G: for<'a> Fn(Node<'a>) -> Vec<Node<'a>> + Send + Sync + 'static,
    {
        Self {
            display: None,
            strategy: Strategy::Custom(FnSelector::new(select_one, select_many)),
        }
    }

    /// Replace the label used in diagnostics
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

impl From<XPathExpr> for NodeSelector {
    fn from(expr: XPathExpr) -> Self {
        Self::xpath_expr(expr)
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.display, &self.strategy) {
            (Some(display), _) => f.write_str(display),
            (None, Strategy::Css(css)) => f.write_str(css.as_str()),
            (None, Strategy::XPath(xpath)) => f.write_str(xpath.expr().as_str()),
            (None, Strategy::Custom(_)) => f.write_str("Selector()"),
        }
    }
}

impl<'a> Selector<Node<'a>> for NodeSelector {
    type Output = Node<'a>;

    fn select(&self, node: Node<'a>) -> Option<Node<'a>> {
        match &self.strategy {
            Strategy::Css(css) => css.select(node),
            Strategy::XPath(xpath) => xpath.select(node),
            Strategy::Custom(custom) => custom.select(node),
        }
    }

    fn select_all(&self, node: Node<'a>) -> Vec<Node<'a>> {
        match &self.strategy {
            Strategy::Css(css) => css.select_all(node),
            Strategy::XPath(xpath) => xpath.select_all(node),
            Strategy::Custom(custom) => custom.select_all(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, XmlDocument};

    const PAGE: &str = r#"<html><body>
        <div class="card"><h2>First</h2><a href="/1">one</a></div>
        <div class="card"><h2>Second</h2><a href="/2">two</a><a href="/3">three</a></div>
        </body></html>"#;

    fn names(nodes: &[Node<'_>]) -> Vec<String> {
        nodes.iter().map(|n| n.text_raw()).collect()
    }

    #[test]
    fn test_css_from_document_and_element() {
        let doc = HtmlDocument::parse(PAGE);
        let selector = NodeSelector::css("div.card h2").unwrap();

        assert_eq!(selector.select(doc.root()).map(|n| n.text_raw()).as_deref(), Some("First"));
        assert_eq!(names(&selector.select_all(doc.root())), vec!["First", "Second"]);

        let second = NodeSelector::css("div.card").unwrap().select_all(doc.root())[1];
        let links = NodeSelector::css("a").unwrap().select_all(second);
        assert_eq!(names(&links), vec!["two", "three"]);
    }

    #[test]
    fn test_xpath_strategy() {
        let doc = HtmlDocument::parse(PAGE);
        let selector = NodeSelector::xpath("//div[@class='card'][2]/a").unwrap();
        assert_eq!(names(&selector.select_all(doc.root())), vec!["two", "three"]);

        // Attribute results never appear in the output
        let attrs = NodeSelector::xpath("//a/@href").unwrap();
        assert!(attrs.select_all(doc.root()).is_empty());
        assert!(attrs.select(doc.root()).is_none());
    }

    #[test]
    fn test_sequence_selection() {
        let doc = HtmlDocument::parse(PAGE);
        let cards = NodeSelector::css("div.card").unwrap().select_all(doc.root());
        let link = NodeSelector::css("a").unwrap();

        let first = link.select_first_in(cards.iter().copied());
        assert_eq!(first.map(|n| n.text_raw()).as_deref(), Some("one"));

        let all = link.select_all_in(cards.iter().copied());
        assert_eq!(names(&all), vec!["one", "two", "three"]);

        let h3 = NodeSelector::css("h3").unwrap();
        assert!(h3.select_first_in(cards.iter().copied()).is_none());
        assert!(h3.select_all_in(Vec::new()).is_empty());
    }

    #[test]
    fn test_custom_strategy() {
        let doc = HtmlDocument::parse(PAGE);
        let selector = NodeSelector::custom(
            |node| node.descendants().find(|n| n.name() == Some("h2")),
            |node| node.descendants().filter(|n| n.name() == Some("h2")).collect(),
        );
        assert_eq!(selector.to_string(), "Selector()");
        assert_eq!(selector.select_all(doc.root()).len(), 2);

        let labelled = selector.with_display("headings");
        assert_eq!(labelled.to_string(), "headings");
    }

    #[test]
    fn test_display_defaults_to_expression() {
        assert_eq!(NodeSelector::css("a.b").unwrap().to_string(), "a.b");
        assert_eq!(NodeSelector::xpath("//a").unwrap().to_string(), "//a");
        let expr = XPathExpr::compile("//p").unwrap();
        assert_eq!(NodeSelector::from(expr).to_string(), "//p");
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(NodeSelector::css(""), Err(ScrapeError::NullArgument(_))));
        assert!(matches!(
            NodeSelector::css("div[[["),
            Err(ScrapeError::InvalidSelector { .. })
        ));
        assert!(matches!(
            NodeSelector::xpath("//div[@"),
            Err(ScrapeError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_css_on_xml_selects_nothing() {
        let doc = XmlDocument::parse("<root><item/></root>").unwrap();
        let css = NodeSelector::css("item").unwrap();
        assert!(css.select(doc.root()).is_none());
        assert!(css.select_all(doc.root()).is_empty());

        let xpath = NodeSelector::xpath("item").unwrap();
        assert_eq!(xpath.select_all(doc.root()).len(), 1);
    }

    #[test]
    fn test_selector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NodeSelector>();
    }
}
