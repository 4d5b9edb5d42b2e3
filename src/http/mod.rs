//! HTTP content negotiation
//!
//! A content-type guard over response headers, typed readers on
//! [`reqwest::Response`] ([`ResponseExt`], [`FromResponse`]) and a thin
//! client wrapper ([`ScrapeClient`]) that picks the reader from the requested
//! result type.

mod client;
mod response;

pub use client::ScrapeClient;
pub use response::{FetchedResponse, FromResponse, Json, ResponseExt};

use reqwest::header::{HeaderMap, CONTENT_TYPE};

use crate::error::{Result, ScrapeError};

/// Media types the typed readers accept
pub mod mime {
    pub const TEXT_HTML: &str = "text/html";
    pub const APPLICATION_XHTML: &str = "application/xhtml+xml";
    pub const TEXT_XML: &str = "text/xml";
    pub const APPLICATION_XML: &str = "application/xml";
    pub const IMAGE_SVG: &str = "image/svg+xml";
    pub const APPLICATION_JSON: &str = "application/json";
    pub const TEXT_PLAIN: &str = "text/plain";

    pub const HTML: &[&str] = &[TEXT_HTML, APPLICATION_XHTML];
    pub const XML: &[&str] = &[TEXT_XML, APPLICATION_XML, IMAGE_SVG];
    pub const JSON: &[&str] = &[APPLICATION_JSON];
}

/// The declared media type, lowercased and without parameters
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = value.split(';').next().unwrap_or("").trim();
    if media_type.is_empty() {
        None
    } else {
        Some(media_type.to_ascii_lowercase())
    }
}

/// Fail unless the declared media type is one of `expected`
pub fn ensure_content_type(headers: &HeaderMap, expected: &[&str]) -> Result<()> {
    if expected.is_empty() {
        return Err(ScrapeError::NullArgument("expected"));
    }

    let received = media_type(headers);
    let matched = received
        .as_deref()
        .is_some_and(|mt| expected.iter().any(|e| e.eq_ignore_ascii_case(mt)));
    if matched {
        return Ok(());
    }

    let expected = expected.join(", ");
    tracing::debug!(
        "Rejecting response with content type {:?}, expected {}",
        received,
        expected
    );
    Err(ScrapeError::ContentTypeMismatch { expected, received })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_media_type_strips_parameters() {
        assert_eq!(
            media_type(&headers("Text/HTML; charset=utf-8")).as_deref(),
            Some("text/html")
        );
        assert_eq!(media_type(&HeaderMap::new()), None);
        assert_eq!(media_type(&headers("; charset=utf-8")), None);
    }

    #[test]
    fn test_ensure_content_type_accepts_any_expected() {
        let h = headers("application/xml");
        assert!(ensure_content_type(&h, mime::XML).is_ok());
        assert!(ensure_content_type(&h, &["APPLICATION/XML"]).is_ok());
    }

    #[test]
    fn test_ensure_content_type_mismatch() {
        match ensure_content_type(&headers("text/plain"), mime::HTML) {
            Err(ScrapeError::ContentTypeMismatch { expected, received }) => {
                assert_eq!(expected, "text/html, application/xhtml+xml");
                assert_eq!(received.as_deref(), Some("text/plain"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_ensure_content_type_missing_header() {
        let err = ensure_content_type(&HeaderMap::new(), mime::JSON).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::ContentTypeMismatch { received: None, .. }
        ));
        assert_eq!(
            err.to_string(),
            "Invalid content type, expected 'application/json', found: ''"
        );
    }

    #[test]
    fn test_ensure_content_type_requires_expected() {
        assert!(matches!(
            ensure_content_type(&headers("text/html"), &[]),
            Err(ScrapeError::NullArgument(_))
        ));
    }
}
