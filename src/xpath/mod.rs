//! XPath 1.0 subset evaluated over [`Node`] trees
//!
//! Supported:
//! - all axes except `namespace`, plus the abbreviations `//`, `.`, `..`, `@`
//! - name tests (`p`, `*`, `atom:*`) and `node()`, `text()`, `comment()`
//! - predicates, unions, boolean, comparison and arithmetic operators
//! - the core string, number, boolean and node-set functions
//!
//! Element and attribute names match case-insensitively in HTML documents
//! and exactly in XML documents. Variables and namespace resolution are not
//! supported; prefixed names match their literal qualified form.
//!
//! # Submodules
//!
//! - `lexer`: tokenizer
//! - `ast`: expression tree
//! - `parser`: recursive descent parser
//! - `eval`: evaluator

mod ast;
mod eval;
mod lexer;
mod parser;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::dom::Node;
use crate::error::{Result, ScrapeError};
use eval::{Evaluator, Item, Value};

/// A syntax error in an XPath expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at offset {offset}")]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

/// A compiled XPath expression
#[derive(Clone)]
pub struct XPathExpr {
    source: String,
    expr: Arc<ast::Expr>,
}

/// Result of [`XPathExpr::evaluate`]
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<'a> {
    /// Node-set in document order; attribute members are dropped
    Nodes(Vec<Node<'a>>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl XPathExpr {
    /// Compile an expression; fails with `NullArgument` when it is blank and
    /// `InvalidSelector` when it does not parse
    pub fn compile(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(ScrapeError::NullArgument("xpath"));
        }
        let expr = parser::parse(source).map_err(|e| ScrapeError::InvalidSelector {
            selector: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            expr: Arc::new(expr),
        })
    }

    /// The expression text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate with `node` as the context node
    pub fn evaluate<'a>(&self, node: Node<'a>) -> XPathValue<'a> {
        match Evaluator::new(node).evaluate(&self.expr, node) {
            Value::Nodes(items) => XPathValue::Nodes(nodes_only(items)),
            Value::Str(s) => XPathValue::String(s),
            Value::Num(n) => XPathValue::Number(n),
            Value::Bool(b) => XPathValue::Boolean(b),
        }
    }

    /// All selected nodes in document order; non-node results select nothing
    pub fn select_all<'a>(&self, node: Node<'a>) -> Vec<Node<'a>> {
        match self.evaluate(node) {
            XPathValue::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }

    /// The first selected node in document order
    pub fn select_first<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        self.select_all(node).into_iter().next()
    }

    /// The XPath string value of the result
    pub fn evaluate_string(&self, node: Node<'_>) -> String {
        Evaluator::new(node).evaluate(&self.expr, node).to_str()
    }
}

fn nodes_only(items: Vec<Item<'_>>) -> Vec<Node<'_>> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Item::Node(node) => Some(node),
            Item::Attr { .. } => None,
        })
        .collect()
}

impl fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPathExpr").field(&self.source).finish()
    }
}

impl FromStr for XPathExpr {
    type Err = ScrapeError;

    fn from_str(source: &str) -> Result<Self> {
        Self::compile(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, XmlDocument};

    const PAGE: &str = r#"<html><body>
        <ul id="list">
            <li class="item">One</li>
            <li class="item special">Two</li>
            <li class="item">Three</li>
        </ul>
        <p>Price: <span data-value="12.5">12.50</span></p>
        <a href="/a">A</a><a href="/b" rel="next">B</a>
        </body></html>"#;

    fn texts(nodes: &[Node<'_>]) -> Vec<String> {
        nodes.iter().map(|n| n.text_raw().trim().to_string()).collect()
    }

    fn select<'a>(doc: &'a HtmlDocument, xpath: &str) -> Vec<Node<'a>> {
        XPathExpr::compile(xpath).unwrap().select_all(doc.root())
    }

    #[test]
    fn test_paths_and_positions() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(texts(&select(&doc, "//li")), vec!["One", "Two", "Three"]);
        assert_eq!(texts(&select(&doc, "//li[2]")), vec!["Two"]);
        assert_eq!(texts(&select(&doc, "//li[last()]")), vec!["Three"]);
        assert_eq!(texts(&select(&doc, "//li[position() > 1]")), vec!["Two", "Three"]);
        assert_eq!(texts(&select(&doc, "/html/body/ul/li[1]")), vec!["One"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(texts(&select(&doc, "//a[@rel='next']")), vec!["B"]);
        assert_eq!(
            texts(&select(&doc, "//li[contains(@class, 'special')]")),
            vec!["Two"]
        );
        assert_eq!(texts(&select(&doc, "//span[@data-value > 10]")), vec!["12.50"]);
        assert_eq!(select(&doc, "//a[not(@rel)]").len(), 1);
    }

    #[test]
    fn test_attribute_results_are_dropped() {
        let doc = HtmlDocument::parse(PAGE);
        assert!(select(&doc, "//a/@href").is_empty());
        let mixed = select(&doc, "//a/@href | //a");
        assert_eq!(mixed.len(), 2);
        assert!(mixed.iter().all(|n| n.is_element()));
    }

    #[test]
    fn test_reverse_axes_and_union_order() {
        let doc = HtmlDocument::parse(PAGE);
        // Proximity position 1 on a reverse axis is the nearest node
        assert_eq!(
            texts(&select(&doc, "//li[3]/preceding-sibling::li[1]")),
            vec!["Two"]
        );
        assert_eq!(select(&doc, "//span/ancestor::*[1]")[0].name(), Some("p"));
        // Unions come back in document order without duplicates
        assert_eq!(
            texts(&select(&doc, "//li[3] | //li[1] | //li[1]")),
            vec!["One", "Three"]
        );
    }

    #[test]
    fn test_text_nodes_and_relative_context() {
        let doc = HtmlDocument::parse(PAGE);
        let ul = select(&doc, "//ul")[0];
        let xpath = XPathExpr::compile("li/text()").unwrap();
        let nodes = xpath.select_all(ul);
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.kind() == crate::dom::NodeKind::Text));

        let parent = XPathExpr::compile("..").unwrap().select_first(ul).unwrap();
        assert_eq!(parent.name(), Some("body"));
    }

    #[test]
    fn test_html_names_ignore_case() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(select(&doc, "//LI").len(), 3);
        assert_eq!(select(&doc, "//A[@HREF='/a']").len(), 1);
    }

    #[test]
    fn test_xml_names_are_exact() {
        let doc = XmlDocument::parse(
            r#"<feed><Entry>a</Entry><entry>b</entry><atom:link href="x"/></feed>"#,
        )
        .unwrap();
        let xpath = XPathExpr::compile("//entry").unwrap();
        assert_eq!(xpath.select_all(doc.root()).len(), 1);
        let xpath = XPathExpr::compile("//atom:link").unwrap();
        assert_eq!(xpath.select_all(doc.root()).len(), 1);
        let xpath = XPathExpr::compile("//atom:*").unwrap();
        assert_eq!(xpath.select_all(doc.root()).len(), 1);
    }

    #[test]
    fn test_scalar_results() {
        let doc = HtmlDocument::parse(PAGE);
        let root = doc.root();
        let eval = |x: &str| XPathExpr::compile(x).unwrap().evaluate(root);

        assert_eq!(eval("count(//li)"), XPathValue::Number(3.0));
        assert_eq!(eval("count(//li) * 2 - 1"), XPathValue::Number(5.0));
        assert_eq!(eval("7 mod 3"), XPathValue::Number(1.0));
        assert_eq!(eval("string(//a[2]/@href)"), XPathValue::String("/b".into()));
        assert_eq!(eval("normalize-space('  a   b ')"), XPathValue::String("a b".into()));
        assert_eq!(eval("substring('12345', 2, 3)"), XPathValue::String("234".into()));
        assert_eq!(eval("translate('abc', 'abc', 'AB')"), XPathValue::String("AB".into()));
        assert_eq!(eval("starts-with(name(//ul), 'u')"), XPathValue::Boolean(true));
        assert_eq!(eval("//li = 'Two'"), XPathValue::Boolean(true));
        assert_eq!(eval("sum(//span/@data-value)"), XPathValue::Number(12.5));

        let xpath = XPathExpr::compile("concat(name(//ul), '#', //ul/@id)").unwrap();
        assert_eq!(xpath.evaluate_string(root), "ul#list");
        assert!(xpath.select_all(root).is_empty());
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            XPathExpr::compile("  "),
            Err(ScrapeError::NullArgument(_))
        ));
        match XPathExpr::compile("//li[") {
            Err(ScrapeError::InvalidSelector { selector, .. }) => assert_eq!(selector, "//li["),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!("unknown-fn()".parse::<XPathExpr>().is_err());
        assert_eq!("//p".parse::<XPathExpr>().unwrap().to_string(), "//p");
    }
}
