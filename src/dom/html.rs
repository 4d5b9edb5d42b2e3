//! HTML documents parsed with scraper, with document and base URLs

use scraper::{Html, Selector};
use url::Url;

use super::Node;

/// A parsed HTML document together with its document and base URLs
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    html: Html,
    url: Option<Url>,
    base_url: Option<Url>,
}

impl HtmlDocument {
    /// Parse a full HTML document without a document URL
    pub fn parse(html: &str) -> Self {
        Self::parse_with_url(html, None)
    }

    /// Parse a full HTML document fetched from `url`
    pub fn parse_with_url(html: &str, url: Option<Url>) -> Self {
        Self::from_html(Html::parse_document(html), url)
    }

    /// Parse an HTML fragment; its root is treated as the document node
    pub fn parse_fragment(html: &str) -> Self {
        Self::from_html(Html::parse_fragment(html), None)
    }

    fn from_html(html: Html, url: Option<Url>) -> Self {
        let base_url = resolve_base(&html, url.as_ref());
        Self {
            html,
            url,
            base_url,
        }
    }

    /// URL the document was fetched from
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// URL relative references resolve against: the first `<base href>`,
    /// otherwise the document URL
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The underlying scraper document
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The document node
    pub fn root(&self) -> Node<'_> {
        Node::from_html(self, self.html.tree.root())
    }

    pub fn document_element(&self) -> Option<Node<'_>> {
        self.root().document_element()
    }

    /// Trimmed text of the first non-empty `<title>`
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|title| !title.is_empty())
    }
}

fn resolve_base(html: &Html, url: Option<&Url>) -> Option<Url> {
    let selector = match Selector::parse("base[href]") {
        Ok(s) => s,
        Err(_) => return url.cloned(),
    };

    let Some(href) = html
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
    else {
        return url.cloned();
    };

    let resolved = match url {
        Some(url) => url.join(href.trim()),
        None => Url::parse(href.trim()),
    };
    match resolved {
        Ok(base) => Some(base),
        Err(e) => {
            tracing::debug!("Ignoring unusable <base href=\"{}\">: {}", href, e);
            url.cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_defaults_to_document_url() {
        let url = Url::parse("https://example.com/a/page.html").unwrap();
        let doc = HtmlDocument::parse_with_url("<p>x</p>", Some(url.clone()));
        assert_eq!(doc.url(), Some(&url));
        assert_eq!(doc.base_url(), Some(&url));
    }

    #[test]
    fn test_base_element_is_resolved_against_document_url() {
        let url = Url::parse("https://example.com/a/page.html").unwrap();
        let doc = HtmlDocument::parse_with_url(
            r#"<head><base href="/static/"><base href="/ignored/"></head>"#,
            Some(url),
        );
        assert_eq!(
            doc.base_url().map(Url::as_str),
            Some("https://example.com/static/")
        );
    }

    #[test]
    fn test_relative_base_without_document_url() {
        let doc = HtmlDocument::parse(r#"<base href="/static/"><p>x</p>"#);
        assert_eq!(doc.base_url(), None);

        let doc = HtmlDocument::parse(r#"<base href="http://cdn.example/"><p>x</p>"#);
        assert_eq!(doc.base_url().map(Url::as_str), Some("http://cdn.example/"));
    }

    #[test]
    fn test_title() {
        let doc = HtmlDocument::parse("<title>  Hello  </title><h1>Other</h1>");
        assert_eq!(doc.title().as_deref(), Some("Hello"));
        assert_eq!(HtmlDocument::parse("<p>no title</p>").title(), None);
    }

    #[test]
    fn test_fragment_root_is_document() {
        let doc = HtmlDocument::parse_fragment("<li>a</li><li>b</li>");
        assert!(doc.root().is_document());
        assert!(doc.document_element().is_some());
    }
}
