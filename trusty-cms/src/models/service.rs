use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors};
use validator::Validate;

/// A service offered by the group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a title"))]
    #[validate(length(max = 100, code = "TOO_LONG", message = "Title cannot be more than 100 characters"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Please add a description"))]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Position in listings, ascending
    #[serde(default)]
    pub order: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for Service {
    const COLLECTION: &'static str = "services";
    const LABEL: &'static str = "service";
    const ID_PREFIX: &'static str = "svc";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Service {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Service", self)
    }
}

impl Model for Service {
    const UPLOADS: &'static [UploadSlot] = &[UploadSlot::single("image", "general")];

    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new("Service");
        let order = errors.accept(payload.integer("order")).unwrap_or(0);
        errors.into_result()?;

        let service = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            title: payload.trimmed("title").unwrap_or_default(),
            description: payload.text("description").unwrap_or_default(),
            icon: payload.trimmed("icon").unwrap_or_default(),
            image: payload.text("image").unwrap_or_default(),
            features: payload.list("features").unwrap_or_default(),
            order,
            created_at: timestamp::now(),
        };
        service.validate()?;
        Ok(service)
    }

    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new("Service");
        let order = errors.accept(payload.integer("order"));
        errors.into_result()?;

        overwrite(&mut self.title, payload.trimmed("title"));
        overwrite(&mut self.description, payload.text("description"));
        overwrite(&mut self.icon, payload.trimmed("icon"));
        overwrite(&mut self.image, payload.text("image"));
        if let Some(features) = payload.list("features") {
            self.features = features;
        }
        if let Some(order) = order {
            self.order = order;
        }
        self.validate()
    }

    fn attach(&mut self, field: &str, mut urls: Vec<String>) {
        if field == "image" {
            if let Some(url) = urls.pop() {
                self.image = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_and_update() {
        let payload = Payload::from_fields(
            json!({ "title": "Architecture", "description": "Plans", "features": ["a", "b"], "order": "2" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let mut service = Service::from_payload(&payload).unwrap();
        assert!(service.id.starts_with("svc_"));
        assert_eq!(service.order, 2);
        assert_eq!(service.features, vec!["a", "b"]);

        let update = Payload::from_fields(json!({ "order": 1, "icon": "ruler" }).as_object().cloned().unwrap());
        service.apply(&update).unwrap();
        assert_eq!(service.order, 1);
        assert_eq!(service.icon, "ruler");
        assert_eq!(service.title, "Architecture");
    }

    #[test]
    fn test_non_numeric_order_is_rejected() {
        let payload = Payload::from_fields(json!({ "title": "t", "description": "d", "order": "first" }).as_object().cloned().unwrap());
        let err = Service::from_payload(&payload).unwrap_err();
        assert_eq!(err.errors()[0].field, "order");
    }
}
