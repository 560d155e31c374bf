//! Query string parameters
//!
//! Multi-valued view of a URL query string with form decoding rules:
//! `+` is a space, percent escapes are decoded, and pairs without a
//! value are dropped.

use std::borrow::Cow;
use std::collections::HashMap;

/// Parameters of an inbound request, in arrival order per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`)
    pub fn parse(raw: &str) -> Self {
        let mut params = Self::new();

        for pair in raw.split('&') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };

            if value.is_empty() {
                continue;
            }

            params.append(decode_component(name), decode_component(value));
        }

        params
    }

    /// Build from already decoded pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (name, value) in pairs {
            params.append(name, value);
        }
        params
    }

    /// Add a value for a key, keeping earlier values
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// First value of a key
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a key
    pub fn all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Percent-decode a string, replacing invalid UTF-8
pub fn percent_decode(input: &str) -> String {
    match urlencoding::decode_binary(input.as_bytes()) {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Cow::Owned(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn decode_component(input: &str) -> String {
    percent_decode(&input.replace('+', " "))
}
