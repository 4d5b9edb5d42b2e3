//! scrapekit: helpers for writing web scrapers
//!
//! - Typed HTTP content negotiation over `reqwest`: read a response as an
//!   HTML or XML document, JSON, text or bytes, guarded by its content type
//! - CSS and XPath node selection with select / or-fail / all variants
//! - Attribute and text accessors that decode entities and percent-escapes
//!   and coerce values into typed results
//! - A multi-value query-string builder and a canonicalizing URI normalizer

pub mod accessor;
pub mod coerce;
pub mod config;
pub mod decode;
pub mod dom;
pub mod error;
pub mod http;
pub mod logging;
pub mod selector;
pub mod uri;
pub mod xpath;

pub use accessor::NodesExt;
pub use coerce::{FromAttrValue, Parsed};
pub use config::Config;
pub use dom::{Element, FromNode, HtmlDocument, Node, NodeKind, NodeList, TextNode, XmlDocument};
pub use error::{Result, ScrapeError};
pub use http::{FetchedResponse, FromResponse, Json, ResponseExt, ScrapeClient};
pub use selector::{NodeSelector, Selector};
pub use uri::{normalize_str, normalize_uri, normalize_uri_as_string, IntoAbsoluteUrl, QueryBuilder};
pub use xpath::{XPathExpr, XPathValue};
