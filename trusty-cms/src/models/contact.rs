use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{timestamp, Model};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::mail::{escape_html, Notification};
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors, EMAIL_PATTERN};
use validator::Validate;

/// Handling state of a contact submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Unread,
    Read,
    Replied,
}

impl ContactStatus {
    pub const ALL: [&'static str; 3] = ["unread", "read", "replied"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unread" => Some(Self::Unread),
            "read" => Some(Self::Read),
            "replied" => Some(Self::Replied),
            _ => None,
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unread => write!(f, "unread"),
            Self::Read => write!(f, "read"),
            Self::Replied => write!(f, "replied"),
        }
    }
}

/// A contact form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a name"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Please add an email"))]
    #[validate(regex(path = *EMAIL_PATTERN, code = "INVALID_FORMAT", message = "Please add a valid email"))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "Please add a subject"))]
    pub subject: String,
    #[validate(custom(function = "not_blank", message = "Please add a message"))]
    pub message: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for Contact {
    const COLLECTION: &'static str = "contacts";
    const LABEL: &'static str = "contact";
    const ID_PREFIX: &'static str = "contact";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Contact {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Contact", self)
    }

    /// Operator notification for a new submission
    pub fn notification(&self) -> Notification {
        let phone = if self.phone.is_empty() {
            String::new()
        } else {
            format!("<p><strong>Phone:</strong> {}</p>", escape_html(&self.phone))
        };
        let html = format!(
            "<h2>New contact form submission</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             {}\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Message:</strong></p><p>{}</p>",
            escape_html(&self.name),
            escape_html(&self.email),
            phone,
            escape_html(&self.subject),
            escape_html(&self.message),
        );
        Notification {
            subject: format!("New contact form submission: {}", self.subject),
            html,
            reply_to: Some(self.email.clone()),
        }
    }
}

fn read_status(errors: &mut ValidationErrors, payload: &Payload) -> Option<ContactStatus> {
    let raw = payload.trimmed("status").filter(|s| !s.is_empty())?;
    let status = ContactStatus::parse(&raw);
    if status.is_none() {
        errors.add(
            "status",
            "INVALID_CHOICE",
            format!("Status must be one of {}", ContactStatus::ALL.join(", ")),
        );
    }
    status
}

impl Model for Contact {
    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new("Contact");
        let status = read_status(&mut errors, payload).unwrap_or_default();
        errors.into_result()?;

        let contact = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            name: payload.trimmed("name").unwrap_or_default(),
            email: payload.trimmed("email").unwrap_or_default(),
            subject: payload.text("subject").unwrap_or_default(),
            message: payload.text("message").unwrap_or_default(),
            phone: payload.trimmed("phone").unwrap_or_default(),
            status,
            created_at: timestamp::now(),
        };
        contact.validate()?;
        Ok(contact)
    }

    /// Only the status of a submission can change
    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new("Contact");
        let status = read_status(&mut errors, payload);
        errors.into_result()?;
        if let Some(status) = status {
            self.status = status;
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn payload(value: Value) -> Payload {
        Payload::from_fields(value.as_object().cloned().unwrap())
    }

    fn submission() -> Value {
        json!({ "name": "Kofi", "email": "kofi@example.com", "subject": "Quote", "message": "<hi>" })
    }

    #[test]
    fn test_defaults_to_unread() {
        let contact = Contact::from_payload(&payload(submission())).unwrap();
        assert_eq!(contact.status, ContactStatus::Unread);
        assert_eq!(serde_json::to_value(&contact).unwrap()["status"], "unread");
    }

    #[test]
    fn test_invalid_email_and_status() {
        let mut body = submission();
        body["email"] = json!("kofi@example");
        let err = Contact::from_payload(&payload(body)).unwrap_err();
        assert_eq!(err.errors()[0].message, "Please add a valid email");

        let mut contact = Contact::from_payload(&payload(submission())).unwrap();
        assert!(contact.apply(&payload(json!({ "status": "archived" }))).is_err());
        contact.apply(&payload(json!({ "status": "replied", "name": "Ignored" }))).unwrap();
        assert_eq!(contact.status, ContactStatus::Replied);
        assert_eq!(contact.name, "Kofi");
    }

    #[test]
    fn test_notification_escapes_fields() {
        let contact = Contact::from_payload(&payload(submission())).unwrap();
        let notification = contact.notification();
        assert_eq!(notification.subject, "New contact form submission: Quote");
        assert_eq!(notification.reply_to.as_deref(), Some("kofi@example.com"));
        assert!(notification.html.contains("&lt;hi&gt;"));
        assert!(!notification.html.contains("Phone"));
    }
}
