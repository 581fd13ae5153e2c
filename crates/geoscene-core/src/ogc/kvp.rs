//! Key-value-pair query string folding.
//!
//! OGC KVP parameters are case-insensitive on the key. Keys fold to lower
//! case and repeated keys accumulate their values in request order instead
//! of overwriting each other.

use std::collections::HashMap;

/// A folded query string.
#[derive(Debug, Default, Clone)]
pub struct KvpQuery {
    params: HashMap<String, Vec<String>>,
}

impl KvpQuery {
    /// Parses a raw query string (without the leading `?`).
    ///
    /// Percent-encoding and `+`-as-space are decoded; keys fold to lower
    /// case; duplicate keys accumulate.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            params.entry(key.to_lowercase()).or_default().push(value.into_owned());
        }
        Self { params }
    }

    /// First value recorded for `key`, if any. `key` must already be lower
    /// case.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// First non-empty value for `key`; an empty string counts as absent.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.first(key).filter(|v| !v.is_empty())
    }

    /// All values recorded for `key`, in request order.
    #[must_use]
    pub fn all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }
}
