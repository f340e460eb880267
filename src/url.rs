//! Query-string helpers.
//!
//! Values are encoded with the `encodeURIComponent` unreserved set and
//! decoded leniently: malformed escapes are kept as-is instead of failing.
//!
//! [`format`] walks array values from the last element to the first and
//! [`parse`] walks segments from the end of the string backwards. The two
//! reversals cancel out, so `parse(&format(&m)) == m`.

use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::env::Environment;

/// Characters escaped by `encodeURIComponent`.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A decoded query value: one string, or several when the key repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// The first stored value.
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(v) => v,
            QueryValue::Multiple(vs) => vs.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Whether this value expands into repeated pairs.
    pub fn is_array(&self) -> bool {
        matches!(self, QueryValue::Multiple(_))
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self { QueryValue::Single(s.to_string()) }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self { QueryValue::Single(s) }
}

impl From<Vec<&str>> for QueryValue {
    fn from(vs: Vec<&str>) -> Self {
        QueryValue::Multiple(vs.into_iter().map(String::from).collect())
    }
}

/// Key → value mapping produced by [`parse`] and consumed by [`format`].
pub type QueryMapping = BTreeMap<String, QueryValue>;

pub fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

pub fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Returns the decoded value of `key` inside `url`, or `""` when absent.
///
/// The key must be preceded by the start of the string, `?` or `&`, and the
/// value runs until the next `&`, `#` or the end. Keys match ASCII
/// case-insensitively.
pub fn get_query(url: &str, key: &str) -> String {
    let pattern = format!(r"(?i)(?:^|[?&]){}=([^&#]*)", regex::escape(key));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("get_query: cannot build matcher for {key:?}: {e}");
            return String::new();
        }
    };

    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_uri_component(m.as_str()))
        .unwrap_or_default()
}

/// Like [`get_query`], reading the current page's query string from `env`.
pub fn get_query_from(env: &dyn Environment, key: &str) -> String {
    get_query(&env.read_query_string(), key)
}

/// Serializes `mapping` as `key=value` pairs joined with `&`.
///
/// Keys are written verbatim, values are URI-component encoded.
pub fn format(mapping: &QueryMapping) -> String {
    let mut pairs = Vec::new();
    for (key, value) in mapping {
        match value {
            QueryValue::Single(v) => pairs.push(format!("{}={}", key, encode_uri_component(v))),
            QueryValue::Multiple(vs) => {
                for v in vs.iter().rev() {
                    pairs.push(format!("{}={}", key, encode_uri_component(v)));
                }
            }
        }
    }
    pairs.join("&")
}

/// Parses a query string into a [`QueryMapping`].
///
/// A leading `?` is ignored, as are empty segments. A segment without `=`
/// maps its key to the empty string.
pub fn parse(query: &str) -> QueryMapping {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut mapping = QueryMapping::new();

    for segment in query.split('&').rev().filter(|s| !s.is_empty()) {
        let (key, raw) = segment.split_once('=').unwrap_or((segment, ""));
        let value = decode_uri_component(raw);

        match mapping.remove(key) {
            None => {
                mapping.insert(key.to_string(), QueryValue::Single(value));
            }
            Some(QueryValue::Single(first)) => {
                mapping.insert(key.to_string(), QueryValue::Multiple(vec![first, value]));
            }
            Some(QueryValue::Multiple(mut vs)) => {
                vs.push(value);
                mapping.insert(key.to_string(), QueryValue::Multiple(vs));
            }
        }
    }

    mapping
}
