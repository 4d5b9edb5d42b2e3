//! Error type shared by every module of the crate

use thiserror::Error;

/// Errors produced by query building, normalization, selection,
/// attribute coercion and response negotiation.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required argument was absent or empty
    #[error("Argument '{0}' must not be empty")]
    NullArgument(&'static str),

    /// The input is not a well-formed absolute URI
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A required attribute is missing on the node
    #[error("Missing '{name}' attribute.")]
    AttributeNotFound { name: String },

    /// A required selection produced no match
    #[error("Select '{selector}' not found.")]
    NodeNotFound { selector: String },

    /// The operation needs an element and the node is something else
    #[error("Node is not an element")]
    NotAnElement,

    /// The response declared a media type outside the expected set
    #[error("Invalid content type, expected '{expected}', found: '{}'", received.as_deref().unwrap_or(""))]
    ContentTypeMismatch {
        expected: String,
        received: Option<String>,
    },

    /// No coercion strategy could convert the value
    #[error("Cannot convert '{value}' to {target}")]
    UnsupportedCoercion { value: String, target: &'static str },

    /// A CSS or XPath expression failed to compile
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The caller cancelled the operation; not a failure of the operation itself
    #[error("Operation cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub(crate) fn invalid_uri(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Name of the missing attribute, for `AttributeNotFound`
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Self::AttributeNotFound { name } => Some(name),
            _ => None,
        }
    }

    /// Display text of the failed selector, for `NodeNotFound`
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::NodeNotFound { selector } | Self::InvalidSelector { selector, .. } => {
                Some(selector)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_mismatch_message() {
        let err = ScrapeError::ContentTypeMismatch {
            expected: "text/html, application/xhtml+xml".to_string(),
            received: Some("application/json".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Invalid content type, expected 'text/html, application/xhtml+xml', found: 'application/json'"
        );

        let err = ScrapeError::ContentTypeMismatch {
            expected: "application/json".to_string(),
            received: None,
        };
        assert!(err.to_string().ends_with("found: ''"));
    }

    #[test]
    fn test_structured_fields() {
        let err = ScrapeError::AttributeNotFound {
            name: "href".to_string(),
        };
        assert_eq!(err.attribute_name(), Some("href"));
        assert_eq!(err.selector(), None);
        assert!(!err.is_cancelled());

        let err = ScrapeError::NodeNotFound {
            selector: "div.missing".to_string(),
        };
        assert_eq!(err.selector(), Some("div.missing"));
        assert!(ScrapeError::Cancelled.is_cancelled());
    }
}
