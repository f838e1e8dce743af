//! Query parameters to filter descriptor
//!
//! Compilation walks the parameter tree structurally. A bare operator word is
//! only an operator when it sits at a key position inside a field's nested
//! map, so `status=gte` filters on the literal string while `age[gte]=5`
//! becomes `{"age": {"$gte": "5"}}`.

use serde_json::Value;

use super::params::QueryParams;
use crate::repository::{Condition, FilterDescriptor, FilterError};

/// Parameters that shape a listing instead of filtering it
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Resource-specific filter parameter layered over the compiled filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdHocFilter {
    /// `param=value` → field equals value
    Exact {
        /// Query parameter
        param: &'static str,
        /// Document field
        field: &'static str,
    },
    /// `param=a,b` → field (a list) contains any of the values
    AnyOf {
        /// Query parameter
        param: &'static str,
        /// Document field
        field: &'static str,
    },
    /// `param=true` → boolean field is true; any other value is ignored
    Flag {
        /// Query parameter
        param: &'static str,
        /// Document field
        field: &'static str,
    },
}

impl AdHocFilter {
    /// Query parameter this filter consumes
    pub fn param(&self) -> &'static str {
        match self {
            Self::Exact { param, .. } | Self::AnyOf { param, .. } | Self::Flag { param, .. } => *param,
        }
    }

    fn condition(&self, value: &Value) -> Option<(&'static str, Condition)> {
        match (self, value) {
            (Self::Exact { field, .. }, Value::String(s)) => {
                Some((*field, Condition::Equals(Value::String(s.clone()))))
            }
            (Self::Exact { field, .. } | Self::AnyOf { field, .. }, Value::Array(items)) => {
                Some((*field, Condition::any_of(split_items(items))))
            }
            (Self::AnyOf { field, .. }, Value::String(s)) => {
                Some((*field, Condition::any_of(split_items(&[Value::String(s.clone())]))))
            }
            (Self::Flag { field, .. }, Value::String(s)) if s == "true" => {
                Some((*field, Condition::Equals(Value::Bool(true))))
            }
            _ => None,
        }
    }
}

fn split_items(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter_map(Value::as_str)
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Value::String(item.to_string()))
        .collect()
}

/// Compiles every non-reserved parameter into a filter
///
/// `consumed` lists extra parameter names handled elsewhere (the ad-hoc
/// filters) that must not become generic field conditions.
pub fn compile(params: &QueryParams, consumed: &[&str]) -> Result<FilterDescriptor, FilterError> {
    let mut skipped: Vec<&str> = RESERVED_KEYS.to_vec();
    skipped.extend_from_slice(consumed);
    FilterDescriptor::from_json(&Value::Object(params.without(&skipped)))
}

/// Compiles the generic filter, then layers the ad-hoc filters over it
///
/// An ad-hoc parameter given in operator form (`category[in]=a,b`) is left to
/// the generic compiler. Ad-hoc conditions replace generic ones on the same
/// field.
pub fn compile_with(params: &QueryParams, ad_hoc: &[AdHocFilter]) -> Result<FilterDescriptor, FilterError> {
    let consumed: Vec<&str> = ad_hoc
        .iter()
        .map(AdHocFilter::param)
        .filter(|param| !matches!(params.get(param), Some(Value::Object(_))))
        .collect();

    let mut filter = compile(params, &consumed)?;
    for rule in ad_hoc {
        let Some(value) = params.get(rule.param()) else {
            continue;
        };
        if let Some((field, condition)) = rule.condition(value) {
            filter.set(field, condition);
        }
    }
    Ok(filter)
}
