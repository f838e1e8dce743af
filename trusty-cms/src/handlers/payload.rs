//! Request body extractor for create and update endpoints
//!
//! Accepts `application/json`, `multipart/form-data` and
//! `application/x-www-form-urlencoded` bodies. Text fields land in one map
//! whatever the encoding; multipart file parts are kept aside as
//! [`UploadedFile`]s for the media backend.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::media::{MediaError, UploadedFile};
use crate::query::QueryParams;
use crate::state::AppState;
use crate::validation::FieldError;

/// Decoded create/update body
#[derive(Debug, Clone, Default)]
pub struct Payload {
    fields: Map<String, Value>,
    files: Vec<UploadedFile>,
}

impl Payload {
    /// Payload from already-decoded fields
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// Adds an uploaded file
    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Whether the body carried `key` at all
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Text of a field; numbers and booleans are rendered, lists joined with commas
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(scalar_text)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            other => scalar_text(other),
        }
    }

    /// Text of a field with surrounding whitespace removed
    pub fn trimmed(&self, key: &str) -> Option<String> {
        self.text(key).map(|s| s.trim().to_string())
    }

    /// List field: a JSON array, repeated form fields, or one comma-separated string
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(scalar_text)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            other => Some(
                scalar_text(other)
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    /// Boolean field; `"true"`/`"false"` strings are accepted
    pub fn flag(&self, key: &str) -> Result<Option<bool>, FieldError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" | "on" | "1" => Ok(Some(true)),
                "false" | "off" | "0" => Ok(Some(false)),
                _ => Err(type_error(key, "must be true or false")),
            },
            Some(_) => Err(type_error(key, "must be true or false")),
        }
    }

    /// Whole-number field
    pub fn integer(&self, key: &str) -> Result<Option<i64>, FieldError> {
        match self.number(key)? {
            None => Ok(None),
            Some(n) if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 => Ok(Some(n as i64)),
            Some(_) => Err(type_error(key, "must be a whole number")),
        }
    }

    /// Numeric field
    pub fn number(&self, key: &str) -> Result<Option<f64>, FieldError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| type_error(key, "must be a number")),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| type_error(key, "must be a number")),
            Some(_) => Err(type_error(key, "must be a number")),
        }
    }

    /// Date field: RFC 3339, or `YYYY-MM-DD` taken as midnight UTC
    pub fn date(&self, key: &str) -> Result<Option<DateTime<Utc>>, FieldError> {
        let Some(raw) = self.trimmed(key).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Some(dt.and_utc()))
            .ok_or_else(|| type_error(key, "must be a date"))
    }

    /// First file uploaded under `field`
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    /// Every file uploaded under `field`
    pub fn files<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == field)
    }

    fn push_field(&mut self, key: String, value: String) {
        match self.fields.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                self.fields.insert(key, Value::String(value));
            }
        }
    }

    async fn from_multipart(mut multipart: Multipart, limit_bytes: usize, limit_mb: usize) -> Result<Self, ApiError> {
        let mut payload = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::from_status(e.status(), e.body_text()))?
        {
            let name = field.name().unwrap_or_default().trim_end_matches("[]").to_string();
            if name.is_empty() {
                continue;
            }

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::from_status(e.status(), e.body_text()))?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    if bytes.len() > limit_bytes {
                        return Err(MediaError::TooLarge { limit_mb }.into());
                    }
                    payload.files.push(UploadedFile {
                        field: name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::from_status(e.status(), e.body_text()))?;
                    payload.push_field(name, text);
                }
            }
        }
        Ok(payload)
    }

    fn from_urlencoded(bytes: &Bytes) -> Result<Self, ApiError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(bytes).map_err(|e| ApiError::bad_request(e.to_string()))?;
        let params = QueryParams::from_pairs(pairs).map_err(|e| ApiError::bad_request(e.to_string()))?;
        match params.to_json() {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            _ => Ok(Self::default()),
        }
    }

    fn from_json(bytes: &Bytes) -> Result<Self, ApiError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Ok(Self::from_fields(fields)),
            Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
            Err(e) => Err(ApiError::bad_request(format!("Invalid JSON body: {e}"))),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn type_error(key: &str, what: &str) -> FieldError {
    FieldError {
        field: key.to_string(),
        code: "INVALID_TYPE".to_string(),
        message: format!("{key} {what}"),
    }
}

impl FromRequest<AppState> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let media = &state.config().media;
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::from_status(e.status(), e.body_text()))?;
            return Self::from_multipart(multipart, media.max_file_size_bytes(), media.max_file_size_mb).await;
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::from_status(e.status(), e.body_text()))?;

        if content_type.starts_with("application/x-www-form-urlencoded") {
            Self::from_urlencoded(&bytes)
        } else {
            Self::from_json(&bytes)
        }
    }
}
