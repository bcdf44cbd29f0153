//! Percent-encoded query strings and fragments for share links

use std::borrow::Cow;

/// Ordered query-string builder
///
/// Keys are emitted as given; values are percent-encoded.
#[derive(Debug, Clone, Default)]
pub struct QueryString {
    pairs: Vec<(&'static str, String)>,
}

impl QueryString {
    /// Create an empty query string
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair
    pub fn push(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key, value.into()));
        self
    }

    /// Append a pair if the value is present and non-empty
    pub fn push_opt(&mut self, key: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.pairs.push((key, v.to_string()));
        }
        self
    }

    /// Append `key=1` when the flag is set
    pub fn push_flag(&mut self, key: &'static str, flag: bool) -> &mut Self {
        if flag {
            self.pairs.push((key, "1".into()));
        }
        self
    }

    /// Check if no pairs were added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode as `k=v&k=v` (no leading `?`)
    #[must_use]
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Encode with a leading `?`, or an empty string when there are no pairs
    #[must_use]
    pub fn to_query_suffix(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("?{}", self.encode())
        }
    }
}

/// Encode remarks as a URI fragment (`#...`), empty when there are no remarks
#[must_use]
pub fn fragment(remarks: &str) -> Cow<'static, str> {
    if remarks.is_empty() {
        Cow::Borrowed("")
    } else {
        Cow::Owned(format!("#{}", urlencoding::encode(remarks)))
    }
}
