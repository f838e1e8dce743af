//! Sorting, projection and windowing for store queries
//!
//! ```rust
//! use trusty_cms::repository::{FindOptions, OrderDirection, Projection, SortSpec};
//!
//! let options = FindOptions::new()
//!     .with_sort(SortSpec::parse("-createdAt,title"))
//!     .with_projection(Projection::parse("title,slug").unwrap())
//!     .with_window(5, Some(5));
//!
//! assert_eq!(options.sort.keys()[0].direction, OrderDirection::Descending);
//! ```

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use super::filter::{field_value, Document};

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field path
    pub field: String,
    /// Direction
    pub direction: OrderDirection,
}

impl SortKey {
    /// Ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }
}

/// Ordered sort keys; empty keeps insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Sort from explicit keys
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    /// Parses `-createdAt,title`
    ///
    /// Keys may be separated by commas or whitespace. A leading `-` sorts
    /// descending, a leading `+` (or nothing) ascending.
    pub fn parse(raw: &str) -> Self {
        let keys = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|token| {
                if let Some(field) = token.strip_prefix('-') {
                    (!field.is_empty()).then(|| SortKey::desc(field))
                } else {
                    let field = token.strip_prefix('+').unwrap_or(token);
                    (!field.is_empty()).then(|| SortKey::asc(field))
                }
            })
            .collect();
        Self { keys }
    }

    /// The keys in priority order
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// True when no ordering is requested
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compares two documents by every key in turn
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(field_value(a, &key.field), field_value(b, &key.field));
            let ordering = match key.direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .keys
            .iter()
            .map(|key| match key.direction {
                OrderDirection::Ascending => key.field.clone(),
                OrderDirection::Descending => format!("-{}", key.field),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

/// Cross-type ordering: missing < null < numbers < strings < objects < arrays < booleans
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Bool(_)) => 6,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(Some(left), Some(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Which fields to return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Every field
    #[default]
    All,
    /// Only these fields (plus `id`)
    Include(Vec<String>),
    /// Every field except these (never `id`)
    Exclude(Vec<String>),
}

/// Mixed `a,-b` projections cannot be expressed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Projection cannot mix included and excluded fields")]
pub struct ProjectionError;

impl Projection {
    /// Parses `title,slug` (include) or `-content,-image` (exclude)
    pub fn parse(raw: &str) -> Result<Self, ProjectionError> {
        let tokens: Vec<&str> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty() && *token != "-")
            .collect();
        if tokens.is_empty() {
            return Ok(Self::All);
        }
        let excluded = tokens.iter().filter(|token| token.starts_with('-')).count();
        if excluded == 0 {
            Ok(Self::Include(tokens.into_iter().map(str::to_string).collect()))
        } else if excluded == tokens.len() {
            Ok(Self::Exclude(
                tokens
                    .into_iter()
                    .map(|token| token.trim_start_matches('-').to_string())
                    .collect(),
            ))
        } else {
            Err(ProjectionError)
        }
    }

    /// Applies the projection to a document
    pub fn apply(&self, document: Document) -> Document {
        match self {
            Self::All => document,
            Self::Include(fields) => document
                .into_iter()
                .filter(|(key, _)| key == "id" || fields.iter().any(|field| field == key))
                .collect(),
            Self::Exclude(fields) => document
                .into_iter()
                .filter(|(key, _)| key == "id" || !fields.iter().any(|field| field == key))
                .collect(),
        }
    }
}

/// Everything besides the filter that shapes a find
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort order, applied before windowing
    pub sort: SortSpec,
    /// Returned fields
    pub projection: Projection,
    /// Documents to skip
    pub skip: u64,
    /// Maximum documents to return; `None` returns the rest
    pub limit: Option<u64>,
}

impl FindOptions {
    /// All documents in insertion order
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sort order
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Set the projection
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Set the skip/limit window
    #[must_use]
    pub fn with_window(mut self, skip: u64, limit: Option<u64>) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_sort() {
        let sort = SortSpec::parse("-createdAt, title +order");
        assert_eq!(
            sort.keys(),
            &[SortKey::desc("createdAt"), SortKey::asc("title"), SortKey::asc("order")]
        );
        assert_eq!(sort.to_string(), "-createdAt,title,order");
        assert!(SortSpec::parse(" , -").is_empty());
    }

    #[test]
    fn test_compare_multiple_keys() {
        let sort = SortSpec::parse("category,-order");
        let a = doc(json!({ "category": "a", "order": 1 }));
        let b = doc(json!({ "category": "a", "order": 2 }));
        let c = doc(json!({ "category": "b", "order": 9 }));
        assert_eq!(sort.compare(&a, &b), Ordering::Greater);
        assert_eq!(sort.compare(&a, &c), Ordering::Less);
    }

    #[test]
    fn test_missing_fields_sort_first() {
        let sort = SortSpec::parse("order");
        let missing = doc(json!({}));
        let present = doc(json!({ "order": 0 }));
        assert_eq!(sort.compare(&missing, &present), Ordering::Less);
    }

    #[test]
    fn test_projection_keeps_id() {
        let projection = Projection::parse("title,slug").unwrap();
        let projected = projection.apply(doc(json!({
            "id": "blog_1", "title": "T", "slug": "t", "content": "long"
        })));
        assert_eq!(projected, doc(json!({ "id": "blog_1", "title": "T", "slug": "t" })));

        let exclude = Projection::parse("-content").unwrap();
        let projected = exclude.apply(doc(json!({ "id": "blog_1", "content": "long", "title": "T" })));
        assert_eq!(projected, doc(json!({ "id": "blog_1", "title": "T" })));
    }

    #[test]
    fn test_projection_rejects_mixed() {
        assert_eq!(Projection::parse("title,-content"), Err(ProjectionError));
        assert_eq!(Projection::parse(""), Ok(Projection::All));
    }
}
