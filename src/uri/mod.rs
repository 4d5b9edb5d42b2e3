//! URI helpers: query-string building and canonicalization
//!
//! - `QueryBuilder`: mutable multi-value query builder over an absolute URI
//! - `normalize_uri`: canonical form for deduplicating URIs
//!
//! Both share the form-decoding parser and the two escaping flavours below:
//! the form escaping used when a query is written into a `Url`, and the
//! "safe unescaped" escaping used for canonical string output.

mod normalize;
mod query;

pub use normalize::{normalize_str, normalize_uri, normalize_uri_as_string};
pub use query::{QueryBuilder, ToQueryValue};

use percent_encoding::percent_decode_str;
use url::{Position, Url};

use crate::error::{Result, ScrapeError};

/// Conversion into an absolute URL, failing for relative or malformed input
pub trait IntoAbsoluteUrl {
    fn into_absolute_url(self) -> Result<Url>;
}

impl IntoAbsoluteUrl for &str {
    fn into_absolute_url(self) -> Result<Url> {
        // url::Url only ever parses absolute URIs; relative input reports
        // RelativeUrlWithoutBase
        Url::parse(self).map_err(|e| ScrapeError::invalid_uri(self, e))
    }
}

impl IntoAbsoluteUrl for String {
    fn into_absolute_url(self) -> Result<Url> {
        self.as_str().into_absolute_url()
    }
}

impl IntoAbsoluteUrl for &String {
    fn into_absolute_url(self) -> Result<Url> {
        self.as_str().into_absolute_url()
    }
}

impl IntoAbsoluteUrl for Url {
    fn into_absolute_url(self) -> Result<Url> {
        Ok(self)
    }
}

impl IntoAbsoluteUrl for &Url {
    fn into_absolute_url(self) -> Result<Url> {
        Ok(self.clone())
    }
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn push_escaped(out: &mut String, byte: u8) {
    out.push('%');
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}

/// Form-escape a query name or value.
///
/// ASCII alphanumerics and `-_.!*()` pass through, space becomes `+`,
/// everything else is percent-escaped with lowercase hex.
pub(crate) fn form_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(byte as char),
            b'-' | b'_' | b'.' | b'!' | b'*' | b'(' | b')' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => push_escaped(&mut out, byte),
        }
    }
    out
}

/// Escape only what is syntactically significant inside a query component
pub(crate) fn safe_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        match byte {
            b' ' => out.push('+'),
            b'%' | b'&' | b'=' | b'+' | b'#' | b'"' | b'<' | b'>' | b'`' => {
                push_escaped(&mut out, byte)
            }
            0x00..=0x1f | 0x7f..=0xff => push_escaped(&mut out, byte),
            _ => out.push(byte as char),
        }
    }
    out
}

/// Decode a form-encoded component: `+` is a space, invalid escapes stay literal
pub(crate) fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Split a raw query into decoded `(name, value)` pairs.
///
/// A segment without `=` is a bare flag and is reported under the empty name.
/// Empty segments are skipped.
pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => (form_decode(name), form_decode(value)),
            None => (String::new(), form_decode(segment)),
        })
        .collect()
}

/// Join pairs into a query string; an empty name writes the value alone
pub(crate) fn join_query<'a, I>(pairs: I, encode: fn(&str) -> String) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (name, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        if name.is_empty() {
            out.push_str(&encode(value));
        } else {
            out.push_str(&encode(name));
            out.push('=');
            out.push_str(&encode(value));
        }
    }
    out
}

/// Render `url` with `query` substituted verbatim, keeping the fragment
pub(crate) fn render_with_query(url: &Url, query: &str) -> String {
    let mut out = String::with_capacity(url.as_str().len() + query.len() + 1);
    out.push_str(&url[..Position::AfterPath]);
    if !query.is_empty() {
        out.push('?');
        out.push_str(query);
    }
    out.push_str(&url[Position::AfterQuery..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("<>"), "%3c%3e");
        assert_eq!(form_encode("a b"), "a+b");
        assert_eq!(form_encode("a+b"), "a%2bb");
        assert_eq!(form_encode("x-y_z.!*()"), "x-y_z.!*()");
        assert_eq!(form_encode("é"), "%c3%a9");
        assert_eq!(form_encode("a/b?c"), "a%2fb%3fc");
    }

    #[test]
    fn test_safe_encode_keeps_readable_characters() {
        assert_eq!(safe_encode("a/b?c:d"), "a/b?c:d");
        assert_eq!(safe_encode("a&b=c"), "a%26b%3dc");
        assert_eq!(safe_encode("<x>"), "%3cx%3e");
        assert_eq!(safe_encode("a b"), "a+b");
        assert_eq!(safe_encode("100%"), "100%25");
    }

    #[test]
    fn test_form_decode() {
        assert_eq!(form_decode("a+b"), "a b");
        assert_eq!(form_decode("%3c%3E"), "<>");
        assert_eq!(form_decode("100%"), "100%");
        assert_eq!(form_decode("%zz"), "%zz");
    }

    #[test]
    fn test_parse_query() {
        let pairs = parse_query("?b=c&flag&&a=&=x");
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "c".to_string()),
                (String::new(), "flag".to_string()),
                ("a".to_string(), String::new()),
                (String::new(), "x".to_string()),
            ]
        );
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_into_absolute_url_rejects_relative() {
        for input in ["", "/", "relative", "/relative/url", "relative/url", "%$", "^^"] {
            let err = input.into_absolute_url().unwrap_err();
            assert!(
                matches!(err, ScrapeError::InvalidUri { .. }),
                "expected InvalidUri for {:?}, got {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_render_with_query_keeps_fragment() {
        let url = Url::parse("http://example/path?old=1#frag").unwrap();
        assert_eq!(render_with_query(&url, "a=1"), "http://example/path?a=1#frag");
        assert_eq!(render_with_query(&url, ""), "http://example/path#frag");
    }
}
