//! Query-string decoding into a nested parameter tree
//!
//! `category=design` is a scalar, `tag=a&tag=b` (or `tag[]=a&tag[]=b`) a
//! list, and `age[gte]=5` a nested map:
//!
//! ```rust
//! use serde_json::json;
//! use trusty_cms::query::QueryParams;
//!
//! let params = QueryParams::parse("category=design&age[gte]=5&tag=a&tag=b").unwrap();
//! assert_eq!(
//!     params.to_json(),
//!     json!({ "category": "design", "age": { "gte": "5" }, "tag": ["a", "b"] })
//! );
//! ```

use axum::extract::FromRequestParts;
use http::request::Parts;
use serde_json::{Map, Value};

use super::QueryError;
use crate::handlers::ApiError;

/// Deepest accepted bracket nesting (`a[b][c][d][e][f]`)
const MAX_DEPTH: usize = 5;

/// Decoded query parameters in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Map<String, Value>,
}

impl QueryParams {
    /// Decodes a raw (still percent-encoded) query string
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(raw).map_err(|e| QueryError::Malformed(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    /// Builds the tree from decoded key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = Map::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let (base, path) = split_key(key);
            if base.is_empty() {
                continue;
            }
            if path.len() > MAX_DEPTH {
                return Err(QueryError::TooDeep(key.to_string()));
            }
            insert(&mut entries, key, base, &path, value.into())?;
        }
        Ok(Self { entries })
    }

    /// Raw value of a parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Scalar text of a parameter; lists are joined with commas
    pub fn text(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            _ => None,
        }
    }

    /// Copy of the tree without the given keys
    pub fn without(&self, keys: &[&str]) -> Map<String, Value> {
        self.entries
            .iter()
            .filter(|(key, _)| !keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// True when no parameters were given
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The tree as JSON
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

/// `a[b][c]` → (`a`, [`b`, `c`]); `a[]` → (`a`, [``]); anything else is a plain key
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    let (base, mut rest) = key.split_at(open);
    let mut path = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (base, path)
}

fn insert(
    target: &mut Map<String, Value>,
    full_key: &str,
    name: &str,
    path: &[&str],
    value: String,
) -> Result<(), QueryError> {
    let conflict = || QueryError::Conflict(full_key.to_string());

    match path.split_first() {
        None => push_scalar(target, name, value, false).map_err(|_| conflict()),
        Some((&"", rest)) if rest.is_empty() => push_scalar(target, name, value, true).map_err(|_| conflict()),
        Some((&"", _)) => Err(conflict()),
        Some((child, rest)) => {
            let slot = target
                .entry(name.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(map) => insert(map, full_key, child, rest, value),
                _ => Err(conflict()),
            }
        }
    }
}

fn push_scalar(target: &mut Map<String, Value>, name: &str, value: String, as_list: bool) -> Result<(), ()> {
    match target.get_mut(name) {
        None if as_list => {
            target.insert(name.to_string(), Value::Array(vec![Value::String(value)]));
        }
        None => {
            target.insert(name.to_string(), Value::String(value));
        }
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing @ Value::String(_)) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, Value::String(value)]);
        }
        Some(_) => return Err(()),
    }
    Ok(())
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        Self::parse(raw).map_err(ApiError::from)
    }
}
