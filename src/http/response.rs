//! Typed response readers and the materialized response type

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use super::mime;
use crate::dom::{HtmlDocument, XmlDocument};
use crate::error::{Result, ScrapeError};

/// A response read to the end
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// URL after redirects
    pub final_url: Url,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Media type without parameters
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedResponse {
    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// JSON body deserialized into `T`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// A value a response can be read into.
///
/// The implementation picks the content-type guard and the parser; callers
/// choose it through the requested type, as in
/// `client.get::<HtmlDocument>(url)`. `max_size` bounds the body, failing
/// with [`ScrapeError::ContentTooLarge`] beyond it.
#[async_trait]
pub trait FromResponse: Sized {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self>;
}

/// Read the whole body, enforcing `max_size` on the declared length and on
/// the bytes actually received
async fn read_body(mut response: Response, max_size: Option<usize>) -> Result<Bytes> {
    let Some(limit) = max_size else {
        return Ok(response.bytes().await?);
    };

    if let Some(len) = response.content_length() {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > limit {
            return Err(ScrapeError::ContentTooLarge(len));
        }
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        let len = body.len() + chunk.len();
        if len > limit {
            return Err(ScrapeError::ContentTooLarge(len));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

async fn read_text(response: Response, max_size: Option<usize>) -> Result<String> {
    let body = read_body(response, max_size).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl FromResponse for HtmlDocument {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        super::ensure_content_type(response.headers(), mime::HTML)?;
        let url = response.url().clone();
        let text = read_text(response, max_size).await?;
        Ok(HtmlDocument::parse_with_url(&text, Some(url)))
    }
}

#[async_trait]
impl FromResponse for XmlDocument {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        super::ensure_content_type(response.headers(), mime::XML)?;
        let url = response.url().clone();
        let text = read_text(response, max_size).await?;
        XmlDocument::parse_with_url(&text, Some(url))
    }
}

#[async_trait]
impl FromResponse for serde_json::Value {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        super::ensure_content_type(response.headers(), mime::JSON)?;
        let body = read_body(response, max_size).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl<T> FromResponse for Json<T>
where
    T: DeserializeOwned + Send,
{
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        super::ensure_content_type(response.headers(), mime::JSON)?;
        let body = read_body(response, max_size).await?;
        Ok(Json(serde_json::from_slice(&body)?))
    }
}

/// Any content type
#[async_trait]
impl FromResponse for String {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        read_text(response, max_size).await
    }
}

#[async_trait]
impl FromResponse for Bytes {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        read_body(response, max_size).await
    }
}

#[async_trait]
impl FromResponse for FetchedResponse {
    async fn from_response(response: Response, max_size: Option<usize>) -> Result<Self> {
        let final_url = response.url().clone();
        let status_code = response.status().as_u16();
        let content_type = super::media_type(response.headers());
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = read_body(response, max_size).await?;

        Ok(FetchedResponse {
            final_url,
            status_code,
            headers,
            content_type,
            body,
        })
    }
}

/// The response itself, body unread
#[async_trait]
impl FromResponse for Response {
    async fn from_response(response: Response, _max_size: Option<usize>) -> Result<Self> {
        Ok(response)
    }
}

/// Typed readers on a received response
#[async_trait]
pub trait ResponseExt: Sized {
    /// Fail unless the declared media type is one of `expected`
    fn ensure_content_type(&self, expected: &[&str]) -> Result<()>;

    /// `text/html` or `application/xhtml+xml`, parsed with the final URL as
    /// document URL
    async fn read_as_html(self) -> Result<HtmlDocument>;

    /// `text/xml`, `application/xml` or `image/svg+xml`
    async fn read_as_xml(self) -> Result<XmlDocument>;

    /// `application/json`
    async fn read_as_json(self) -> Result<serde_json::Value>;

    /// Body text regardless of content type
    async fn read_as_text(self) -> Result<String>;

    async fn into_fetched(self) -> Result<FetchedResponse>;
}

#[async_trait]
impl ResponseExt for Response {
    fn ensure_content_type(&self, expected: &[&str]) -> Result<()> {
        super::ensure_content_type(self.headers(), expected)
    }

    async fn read_as_html(self) -> Result<HtmlDocument> {
        HtmlDocument::from_response(self, None).await
    }

    async fn read_as_xml(self) -> Result<XmlDocument> {
        XmlDocument::from_response(self, None).await
    }

    async fn read_as_json(self) -> Result<serde_json::Value> {
        serde_json::Value::from_response(self, None).await
    }

    async fn read_as_text(self) -> Result<String> {
        String::from_response(self, None).await
    }

    async fn into_fetched(self) -> Result<FetchedResponse> {
        FetchedResponse::from_response(self, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(headers: &[(&str, &str)], status_code: u16) -> FetchedResponse {
        FetchedResponse {
            final_url: Url::parse("https://example.com/").unwrap(),
            status_code,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            content_type: None,
            body: Bytes::from_static(b"caf\xc3\xa9 \xff"),
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = fetched(&[("content-type", "text/html"), ("X-Trace", "abc")], 200);
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert_eq!(response.header("x-trace"), Some("abc"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_status_and_text() {
        assert!(fetched(&[], 204).is_success());
        assert!(!fetched(&[], 404).is_success());
        assert_eq!(fetched(&[], 200).text(), "café \u{FFFD}");
    }

    #[test]
    fn test_json_wrapper() {
        assert_eq!(Json(vec![1, 2]).into_inner(), vec![1, 2]);
    }
}
