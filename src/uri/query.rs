//! Mutable builder over the query string of an absolute URI

use std::fmt;
use std::str::FromStr;

use url::Url;

use super::{form_encode, join_query, parse_query, render_with_query, safe_encode, IntoAbsoluteUrl};
use crate::error::{Result, ScrapeError};

/// Conversion of a value into its query-string text.
///
/// `Display` formatting is used for primitives, which is locale-invariant.
/// `None` converts to the empty string.
pub trait ToQueryValue {
    fn to_query_value(&self) -> String;
}

impl ToQueryValue for str {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl ToQueryValue for String {
    fn to_query_value(&self) -> String {
        self.clone()
    }
}

impl ToQueryValue for Url {
    fn to_query_value(&self) -> String {
        self.as_str().to_string()
    }
}

impl<T: ToQueryValue + ?Sized> ToQueryValue for &T {
    fn to_query_value(&self) -> String {
        (**self).to_query_value()
    }
}

impl<T: ToQueryValue> ToQueryValue for Option<T> {
    fn to_query_value(&self) -> String {
        self.as_ref().map(T::to_query_value).unwrap_or_default()
    }
}

macro_rules! display_query_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToQueryValue for $ty {
                fn to_query_value(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_query_value!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

/// Builds the query of an absolute URI.
///
/// Parameter names keep their first insertion order and each name holds an
/// ordered list of values. The builder is mutated in place and can be read
/// with [`QueryBuilder::uri`] or `to_string()` at any point.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    /// Base URI with the query removed
    base: Url,
    params: Vec<(String, Vec<String>)>,
}

impl QueryBuilder {
    /// Create a builder from an absolute URI, importing its existing query
    pub fn new(uri: impl IntoAbsoluteUrl) -> Result<Self> {
        let mut base = uri.into_absolute_url()?;
        let pairs = parse_query(base.query().unwrap_or_default());
        base.set_query(None);

        let mut builder = Self {
            base,
            params: Vec::new(),
        };
        for (name, value) in pairs {
            builder.add(&name, value);
        }
        Ok(builder)
    }

    /// True if at least one value is set for `name`
    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Append a value for `name`, keeping existing values
    pub fn add<V: ToQueryValue>(&mut self, name: &str, value: V) -> &mut Self {
        let value = value.to_query_value();
        match self.position(name) {
            Some(idx) => self.params[idx].1.push(value),
            None => self.params.push((name.to_string(), vec![value])),
        }
        self
    }

    /// Replace every value of `name` with a single value
    pub fn set<V: ToQueryValue>(&mut self, name: &str, value: V) -> &mut Self {
        let value = value.to_query_value();
        match self.position(name) {
            Some(idx) => self.params[idx].1 = vec![value],
            None => self.params.push((name.to_string(), vec![value])),
        }
        self
    }

    /// Remove every value of `name`; no-op when absent
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.params.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    /// Values of `name` in insertion order
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.params[idx].1.as_slice())
    }

    /// Parameter names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Remove all parameters
    pub fn clear(&mut self) -> &mut Self {
        self.params.clear();
        self
    }

    /// Number of distinct parameter names
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Ordered `(name, values)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// The absolute URI with the current query, form-escaped
    pub fn uri(&self) -> Url {
        let mut url = self.base.clone();
        let query = self.encoded(form_encode);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&query));
        }
        url
    }

    fn encoded(&self, encode: fn(&str) -> String) -> String {
        let pairs = self.params.iter().flat_map(|(name, values)| {
            values
                .iter()
                .map(move |value| (name.as_str(), value.as_str()))
        });
        join_query(pairs, encode)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for QueryBuilder {
    /// The URI in its safe-unescaped form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_with_query(&self.base, &self.encoded(safe_encode)))
    }
}

impl<'a> IntoIterator for &'a QueryBuilder {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl TryFrom<&str> for QueryBuilder {
    type Error = ScrapeError;

    fn try_from(uri: &str) -> Result<Self> {
        Self::new(uri)
    }
}

impl TryFrom<Url> for QueryBuilder {
    type Error = ScrapeError;

    fn try_from(uri: Url) -> Result<Self> {
        Self::new(uri)
    }
}

impl FromStr for QueryBuilder {
    type Err = ScrapeError;

    fn from_str(uri: &str) -> Result<Self> {
        Self::new(uri)
    }
}
