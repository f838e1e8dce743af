//! Field validation for resource documents
//!
//! Rules are declared on the records with `#[derive(Validate)]`;
//! [`ValidationErrors::check`] runs them and turns the result into the
//! `{field, code, message}` list carried by 400 responses. Failures raised
//! while reading a payload (a rating that is not a number, say) are recorded
//! on the same collector so a client sees every problem at once.
//!
//! ```rust
//! use trusty_cms::validation::{not_blank, ValidationErrors, EMAIL_PATTERN};
//! use validator::Validate;
//!
//! #[derive(Validate)]
//! struct Signup {
//!     #[validate(custom(function = "not_blank", message = "Please add a name"))]
//!     name: String,
//!     #[validate(regex(path = *EMAIL_PATTERN, code = "INVALID_FORMAT", message = "Please add a valid email"))]
//!     email: String,
//! }
//!
//! let signup = Signup { name: " ".into(), email: "not-an-email".into() };
//! let err = ValidationErrors::check("Contact", &signup).unwrap_err();
//! assert_eq!(err.errors().len(), 2);
//! assert_eq!(
//!     err.to_string(),
//!     "Contact validation failed: email: Please add a valid email, name: Please add a name"
//! );
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrorsKind};

/// Address pattern accepted for email fields
pub static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$")
        .expect("email pattern is valid")
});

/// Code recorded for blank required fields
pub const REQUIRED: &str = "REQUIRED";

/// Whether `value` looks like an email address
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Rejects empty and whitespace-only values
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(REQUIRED));
    }
    Ok(())
}

/// Field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in JSON
    pub field: String,
    /// Error code (e.g., "REQUIRED", "INVALID_FORMAT", "TOO_LONG")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Every validation failure for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    resource: String,
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Empty collector for a resource ("Blog", "Contact", …)
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            errors: Vec::new(),
        }
    }

    /// Runs the derived rules of `record`
    pub fn check<T: Validate>(resource: impl Into<String>, record: &T) -> Result<(), Self> {
        let mut errors = Self::new(resource);
        if let Err(failed) = record.validate() {
            errors.absorb(&failed);
        }
        errors.into_result()
    }

    /// Records the failures reported by `validator`
    ///
    /// Fields come out in name order. A blank required field reports only
    /// that it is required.
    pub fn absorb(&mut self, failed: &validator::ValidationErrors) {
        let mut fields: Vec<_> = failed
            .errors()
            .iter()
            .filter_map(|(field, kind)| match kind {
                ValidationErrorsKind::Field(errors) => Some((json_name(field), errors)),
                _ => None,
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, errors) in fields {
            let blank = errors.iter().any(|e| e.code == REQUIRED);
            for error in errors.iter().filter(|e| !blank || e.code == REQUIRED) {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"));
                self.add(field.clone(), error.code.to_uppercase(), message);
            }
        }
    }

    /// Records a failure
    pub fn add(&mut self, field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        });
    }

    /// Records failures raised while reading the payload
    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.errors.extend(errors);
    }

    /// Unwraps a typed payload read, recording its failure
    pub fn accept<T>(&mut self, read: Result<Option<T>, FieldError>) -> Option<T> {
        match read {
            Ok(value) => value,
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    /// Recorded failures
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True when anything failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// `Ok` when nothing failed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

/// `logo_image` → `logoImage`
fn json_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed: ", self.resource)?;
        let details: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&details.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}
