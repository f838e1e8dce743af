//! Filter descriptors and document matching
//!
//! A [`FilterDescriptor`] maps field names to a [`Condition`]: either a literal
//! the field must equal, or a set of comparison operators. Its JSON form is the
//! document-store dialect, with operators written `$gt`, `$gte`, `$lt`, `$lte`
//! and `$in`:
//!
//! ```rust
//! use serde_json::json;
//! use trusty_cms::repository::FilterDescriptor;
//!
//! let filter = FilterDescriptor::from_json(&json!({
//!     "category": "design",
//!     "rating": { "$gte": "4" }
//! }))
//! .unwrap();
//!
//! let doc = json!({ "category": "design", "rating": 5 });
//! assert!(filter.matches(doc.as_object().unwrap()));
//! assert_eq!(FilterDescriptor::from_json(&filter.to_json()).unwrap(), filter);
//! ```
//!
//! Matching coerces string operands to the type of the stored value, so the
//! string `"4"` compares numerically against a numeric field. Array fields
//! match when any element matches.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// A stored document: an ordered mapping of field name to value
pub type Document = Map<String, Value>;

/// Comparison operators understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Equal to any value in a list
    In,
}

impl CompareOp {
    /// Every operator, in canonical order
    pub const ALL: [CompareOp; 5] = [Self::Gt, Self::Gte, Self::Lt, Self::Lte, Self::In];

    /// Parses a bare (`gte`) or store-prefixed (`$gte`) operator token
    pub fn from_token(token: &str) -> Option<Self> {
        let bare = token.strip_prefix('$').unwrap_or(token);
        Self::ALL.into_iter().find(|op| op.token() == bare)
    }

    /// Bare token as written in query strings
    pub fn token(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
        }
    }

    /// Token in the store's operator namespace
    pub fn store_key(self) -> &'static str {
        match self {
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::In => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_key())
    }
}

/// What a single field must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the literal
    Equals(Value),
    /// Field satisfies every operator
    Compare(Vec<(CompareOp, Value)>),
}

impl Condition {
    /// Field equals any of the values
    pub fn any_of(values: Vec<Value>) -> Self {
        Self::Compare(vec![(CompareOp::In, Value::Array(values))])
    }

    fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => equals(actual, expected),
            Self::Compare(ops) => ops.iter().all(|(op, operand)| compare(actual, *op, operand)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Equals(value) => value.clone(),
            Self::Compare(ops) => Value::Object(
                ops.iter()
                    .map(|(op, operand)| (op.store_key().to_string(), operand.clone()))
                    .collect(),
            ),
        }
    }
}

/// Reasons a filter cannot be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Nested key is not one of the comparison operators
    #[error("Unsupported filter operator '{operator}' on field '{field}'")]
    UnsupportedOperator {
        /// Field the operator was applied to
        field: String,
        /// The offending key
        operator: String,
    },

    /// Operand has a shape the operator cannot use
    #[error("Invalid operand for '{operator}' on field '{field}'")]
    InvalidOperand {
        /// Field the operator was applied to
        field: String,
        /// Operator token
        operator: String,
    },

    /// Nested condition without any operator
    #[error("Empty filter condition on field '{0}'")]
    EmptyCondition(String),

    /// Field name is empty or uses the operator namespace
    #[error("Unsupported filter field '{0}'")]
    InvalidField(String),

    /// Filter JSON is not an object
    #[error("Filter must be a JSON object")]
    NotAnObject,
}

/// Field-to-condition mapping, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDescriptor {
    conditions: Vec<(String, Condition)>,
}

impl FilterDescriptor {
    /// Filter matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a descriptor from its store JSON form
    ///
    /// Top-level scalars are literal equality targets. Top-level arrays mean
    /// "equal to any". Objects must only contain operator keys, bare or
    /// `$`-prefixed. The `in` operand may be an array or a comma-separated
    /// string.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        let map = value.as_object().ok_or(FilterError::NotAnObject)?;
        let mut filter = Self::new();
        for (field, value) in map {
            if field.is_empty() || field.starts_with('$') {
                return Err(FilterError::InvalidField(field.clone()));
            }
            filter.set(field.clone(), parse_condition(field, value)?);
        }
        Ok(filter)
    }

    /// Store JSON form, the inverse of [`FilterDescriptor::from_json`]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.conditions
                .iter()
                .map(|(field, condition)| (field.clone(), condition.to_json()))
                .collect(),
        )
    }

    /// Sets the condition for a field, replacing any existing one in place
    pub fn set(&mut self, field: impl Into<String>, condition: Condition) {
        let field = field.into();
        match self.conditions.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = condition,
            None => self.conditions.push((field, condition)),
        }
    }

    /// Adds an equality condition
    #[must_use]
    pub fn with_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, Condition::Equals(value.into()));
        self
    }

    /// Adds an "equal to any" condition
    #[must_use]
    pub fn with_any_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.set(field, Condition::any_of(values));
        self
    }

    /// Condition on a field, if any
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, condition)| condition)
    }

    /// Iterate conditions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(field, c)| (field.as_str(), c))
    }

    /// True when the filter matches everything
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of constrained fields
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether a document satisfies every condition
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, condition)| condition.matches(field_value(document, field)))
    }
}

impl fmt::Display for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn parse_condition(field: &str, value: &Value) -> Result<Condition, FilterError> {
    match value {
        Value::Object(ops) => {
            if ops.is_empty() {
                return Err(FilterError::EmptyCondition(field.to_string()));
            }
            let mut parsed: Vec<(CompareOp, Value)> = Vec::with_capacity(ops.len());
            for (key, operand) in ops {
                let op = CompareOp::from_token(key).ok_or_else(|| FilterError::UnsupportedOperator {
                    field: field.to_string(),
                    operator: key.clone(),
                })?;
                let operand = parse_operand(field, op, operand)?;
                match parsed.iter_mut().find(|(existing, _)| *existing == op) {
                    Some((_, slot)) => *slot = operand,
                    None => parsed.push((op, operand)),
                }
            }
            Ok(Condition::Compare(parsed))
        }
        Value::Array(values) => Ok(Condition::any_of(values.clone())),
        literal => Ok(Condition::Equals(literal.clone())),
    }
}

fn parse_operand(field: &str, op: CompareOp, operand: &Value) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidOperand {
        field: field.to_string(),
        operator: op.token().to_string(),
    };
    match (op, operand) {
        (_, Value::Object(_)) => Err(invalid()),
        (CompareOp::In, Value::Array(items)) => {
            if items.iter().any(|item| item.is_object() || item.is_array()) {
                return Err(invalid());
            }
            Ok(operand.clone())
        }
        (CompareOp::In, Value::String(list)) => Ok(Value::Array(
            list.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        (CompareOp::In, Value::Null) => Err(invalid()),
        (CompareOp::In, scalar) => Ok(Value::Array(vec![scalar.clone()])),
        (_, Value::Array(_)) => Err(invalid()),
        (_, scalar) => Ok(scalar.clone()),
    }
}

/// Resolves a possibly dotted field path (`author.name`)
pub fn field_value<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None | Some(Value::Null) => expected.is_null(),
        Some(Value::Array(items)) => {
            actual == Some(expected) || items.iter().any(|item| scalar_eq(item, expected))
        }
        Some(value) => scalar_eq(value, expected),
    }
}

fn scalar_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(b)) => {
            b.trim().parse::<f64>().ok() == a.as_f64()
        }
        (Value::Bool(a), Value::String(b)) => b.parse::<bool>().ok() == Some(*a),
        (Value::String(a), Value::Number(b)) => a.trim().parse::<f64>().ok() == b.as_f64(),
        (Value::String(a), Value::Bool(b)) => a.parse::<bool>().ok() == Some(*b),
        _ => actual == expected,
    }
}

fn compare(actual: Option<&Value>, op: CompareOp, operand: &Value) -> bool {
    if op == CompareOp::In {
        return match operand {
            Value::Array(options) => options.iter().any(|option| equals(actual, option)),
            _ => false,
        };
    }
    match actual {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| ordering(item, operand).is_some_and(|o| op.accepts(o))),
        Some(value) => ordering(value, operand).is_some_and(|o| op.accepts(o)),
    }
}

/// Orders a stored value against an operand coerced to its type
fn ordering(actual: &Value, operand: &Value) -> Option<Ordering> {
    match (actual, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.trim().parse::<f64>().ok()?),
        (Value::String(a), Value::Number(b)) => a.trim().parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::String(b)) => Some(a.cmp(&b.parse::<bool>().ok()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("document must be an object"),
        }
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(CompareOp::from_token("gte"), Some(CompareOp::Gte));
        assert_eq!(CompareOp::from_token("$in"), Some(CompareOp::In));
        assert_eq!(CompareOp::from_token("gtee"), None);
        assert_eq!(CompareOp::from_token("eq"), None);
    }

    #[test]
    fn test_literal_operator_word_stays_literal() {
        let filter = FilterDescriptor::from_json(&json!({ "status": "gte" })).unwrap();
        assert_eq!(filter.get("status"), Some(&Condition::Equals(json!("gte"))));
        assert!(filter.matches(&doc(json!({ "status": "gte" }))));
        assert!(!filter.matches(&doc(json!({ "status": "read" }))));
    }

    #[test]
    fn test_numeric_coercion() {
        let filter = FilterDescriptor::from_json(&json!({ "rating": { "gte": "4" } })).unwrap();
        assert!(filter.matches(&doc(json!({ "rating": 4 }))));
        assert!(filter.matches(&doc(json!({ "rating": 5 }))));
        assert!(!filter.matches(&doc(json!({ "rating": 3 }))));
        assert!(!filter.matches(&doc(json!({ "name": "no rating" }))));

        let eq = FilterDescriptor::new().with_eq("order", "2");
        assert!(eq.matches(&doc(json!({ "order": 2 }))));
    }

    #[test]
    fn test_range_on_timestamps() {
        let filter = FilterDescriptor::from_json(&json!({
            "createdAt": { "$gte": "2024-01-01", "$lt": "2024-02-01" }
        }))
        .unwrap();
        assert!(filter.matches(&doc(json!({ "createdAt": "2024-01-15T10:00:00.000Z" }))));
        assert!(!filter.matches(&doc(json!({ "createdAt": "2024-02-03T10:00:00.000Z" }))));
    }

    #[test]
    fn test_in_accepts_comma_list_and_matches_arrays() {
        let filter = FilterDescriptor::from_json(&json!({ "tags": { "in": "rust, web" } })).unwrap();
        assert_eq!(filter.get("tags"), Some(&Condition::any_of(vec![json!("rust"), json!("web")])));
        assert!(filter.matches(&doc(json!({ "tags": ["design", "web"] }))));
        assert!(!filter.matches(&doc(json!({ "tags": ["design"] }))));
    }

    #[test]
    fn test_boolean_coercion() {
        let filter = FilterDescriptor::new().with_eq("featured", "true");
        assert!(filter.matches(&doc(json!({ "featured": true }))));
        assert!(!filter.matches(&doc(json!({ "featured": false }))));
    }

    #[test]
    fn test_unsupported_operator_is_rejected() {
        let err = FilterDescriptor::from_json(&json!({ "age": { "ne": "5" } })).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported filter operator 'ne' on field 'age'");

        let err = FilterDescriptor::from_json(&json!({ "age": { "gte": { "x": 1 } } })).unwrap_err();
        assert!(matches!(err, FilterError::InvalidOperand { .. }));

        let err = FilterDescriptor::from_json(&json!({ "$where": "1" })).unwrap_err();
        assert!(matches!(err, FilterError::InvalidField(_)));
    }

    #[test]
    fn test_json_form_is_idempotent() {
        let filter = FilterDescriptor::from_json(&json!({
            "category": "design",
            "age": { "gte": "5", "lt": "9" },
            "tags": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(
            filter.to_json(),
            json!({
                "category": "design",
                "age": { "$gte": "5", "$lt": "9" },
                "tags": { "$in": ["a", "b"] }
            })
        );
        let again = FilterDescriptor::from_json(&filter.to_json()).unwrap();
        assert_eq!(again, filter);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut filter = FilterDescriptor::new().with_eq("a", 1).with_eq("b", 2);
        filter.set("a", Condition::Equals(json!(3)));
        let fields: Vec<_> = filter.iter().map(|(f, _)| f.to_string()).collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(filter.get("a"), Some(&Condition::Equals(json!(3))));
    }

    #[test]
    fn test_dotted_paths() {
        let filter = FilterDescriptor::new().with_eq("author.name", "Ada");
        assert!(filter.matches(&doc(json!({ "author": { "id": "usr_1", "name": "Ada" } }))));
    }
}
