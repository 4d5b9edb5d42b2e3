//! Canonical string form of absolute URIs
//!
//! Two URIs that differ only in query-parameter order, value order, host case
//! or an explicit default port normalize to the same string.

use url::Url;

use super::{join_query, parse_query, render_with_query, safe_encode, IntoAbsoluteUrl};
use crate::error::{Result, ScrapeError};

/// Normalize a URI into its canonical string.
///
/// - Query values are sorted ordinally within each name
/// - Query names are sorted ordinally (bare flags first)
/// - Empty `&` segments are dropped
/// - Scheme and host are lowercased and the default port removed
/// - The query is written safe-unescaped
/// - The fragment is kept as is
pub fn normalize_uri_as_string(uri: &Url) -> String {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (name, value) in parse_query(uri.query().unwrap_or_default()) {
        match grouped.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value),
            None => grouped.push((name, vec![value])),
        }
    }

    for (_, values) in grouped.iter_mut() {
        values.sort_unstable();
    }
    grouped.sort_by(|(a, _), (b, _)| a.cmp(b));

    let pairs = grouped
        .iter()
        .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str())))
        .filter(|(name, value)| !(name.is_empty() && value.is_empty()));
    let query = join_query(pairs, safe_encode);

    render_with_query(uri, &query)
}

/// Normalize a URI, returning the canonical form as a `Url`
pub fn normalize_uri(uri: &Url) -> Result<Url> {
    let canonical = normalize_uri_as_string(uri);
    Url::parse(&canonical).map_err(|e| ScrapeError::invalid_uri(canonical, e))
}

/// Normalize a URI given as text; relative or malformed input is rejected
pub fn normalize_str(uri: &str) -> Result<String> {
    let url = uri.into_absolute_url().map_err(|_| ScrapeError::InvalidUri {
        uri: uri.to_string(),
        reason: "the uri is not absolute".to_string(),
    })?;
    Ok(normalize_uri_as_string(&url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(input: &str) -> String {
        normalize_uri_as_string(&Url::parse(input).unwrap())
    }

    #[test]
    fn test_host_and_path() {
        assert_eq!(normalize("http://example"), "http://example/");
        assert_eq!(normalize("http://EXAMPLE"), "http://example/");
        assert_eq!(normalize("http://example/path"), "http://example/path");
        assert_eq!(normalize("http://example/path/"), "http://example/path/");
    }

    #[test]
    fn test_query_sorting() {
        assert_eq!(
            normalize("http://example/path?b=c&b=a&a=f"),
            "http://example/path?a=f&b=a&b=c"
        );
    }

    #[test]
    fn test_fragment_is_preserved() {
        assert_eq!(
            normalize("http://example/path?b=c&b=a&a=f#fragment-is-ignored"),
            "http://example/path?a=f&b=a&b=c#fragment-is-ignored"
        );
    }

    #[test]
    fn test_default_port_removed() {
        assert_eq!(normalize("http://Example.COM:80/a?x=1"), "http://example.com/a?x=1");
        assert_eq!(normalize("https://example.com:443/"), "https://example.com/");
        assert_eq!(normalize("https://example.com:8443/"), "https://example.com:8443/");
    }

    #[test]
    fn test_ordinal_comparison() {
        // Uppercase sorts before lowercase byte-wise
        assert_eq!(normalize("http://e/?b=1&B=2&a=3"), "http://e/?B=2&a=3&b=1");
        assert_eq!(normalize("http://e/?k=b&k=B&k=a"), "http://e/?k=B&k=a&k=b");
    }

    #[test]
    fn test_empty_segments_collapse() {
        assert_eq!(normalize("http://e/?&&b=1&&a=2&"), "http://e/?a=2&b=1");
        assert_eq!(normalize("http://e/path?&"), "http://e/path");
        assert_eq!(normalize("http://e/path?"), "http://e/path");
    }

    #[test]
    fn test_bare_flags_sort_first() {
        assert_eq!(normalize("http://e/?b=1&zflag&aflag"), "http://e/?aflag&zflag&b=1");
    }

    #[test]
    fn test_values_are_safe_unescaped() {
        assert_eq!(
            normalize("http://e/?next=%2Fa%2Fb&q=%3C%3E&amp=x%26y"),
            "http://e/?amp=x%26y&next=/a/b&q=%3c%3e"
        );
        assert_eq!(normalize("http://e/?q=a%20b"), "http://e/?q=a+b");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "http://EXAMPLE:80/x?b=%2F&a=1&a=0#f",
            "https://example.com/search?q=caf%C3%A9&lang=fr",
            "http://e/?flag&&x=%25",
            "http://example",
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_normalize_uri_returns_url() {
        let url = normalize_uri(&Url::parse("http://EXAMPLE/?b=2&a=1").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://example/?a=1&b=2");
    }

    #[test]
    fn test_normalize_str_rejects_relative() {
        let err = normalize_str("/relative/url").unwrap_err();
        match err {
            ScrapeError::InvalidUri { reason, .. } => assert_eq!(reason, "the uri is not absolute"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(normalize_str("http://EXAMPLE").unwrap(), "http://example/");
    }
}
