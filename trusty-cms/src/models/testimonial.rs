use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors};
use validator::Validate;

/// A client testimonial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a name"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Please add a position"))]
    pub position: String,
    #[validate(custom(function = "not_blank", message = "Please add a company"))]
    pub company: String,
    #[validate(custom(function = "not_blank", message = "Please add testimonial content"))]
    pub content: String,
    /// 1 to 5
    #[validate(range(min = 1, max = 5, code = "OUT_OF_RANGE", message = "Rating must be between 1 and 5"))]
    pub rating: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for Testimonial {
    const COLLECTION: &'static str = "testimonials";
    const LABEL: &'static str = "testimonial";
    const ID_PREFIX: &'static str = "tst";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Testimonial {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Testimonial", self)
    }
}

impl Model for Testimonial {
    const UPLOADS: &'static [UploadSlot] = &[UploadSlot::single("image", "general")];

    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new("Testimonial");
        let rating = errors.accept(payload.integer("rating"));
        let featured = errors.accept(payload.flag("featured")).unwrap_or(false);
        let order = errors.accept(payload.integer("order")).unwrap_or(0);
        if rating.is_none() && !errors.has_errors() {
            errors.add("rating", "REQUIRED", "Please add a rating");
        }
        errors.into_result()?;

        let testimonial = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            name: payload.trimmed("name").unwrap_or_default(),
            position: payload.trimmed("position").unwrap_or_default(),
            company: payload.trimmed("company").unwrap_or_default(),
            content: payload.text("content").unwrap_or_default(),
            rating: rating.unwrap_or_default(),
            image: payload.text("image").unwrap_or_default(),
            featured,
            order,
            created_at: timestamp::now(),
        };
        testimonial.validate()?;
        Ok(testimonial)
    }

    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new("Testimonial");
        let rating = errors.accept(payload.integer("rating"));
        let featured = errors.accept(payload.flag("featured"));
        let order = errors.accept(payload.integer("order"));
        errors.into_result()?;

        overwrite(&mut self.name, payload.trimmed("name"));
        overwrite(&mut self.position, payload.trimmed("position"));
        overwrite(&mut self.company, payload.trimmed("company"));
        overwrite(&mut self.content, payload.text("content"));
        overwrite(&mut self.image, payload.text("image"));
        if let Some(rating) = rating {
            self.rating = rating;
        }
        if let Some(featured) = featured {
            self.featured = featured;
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
    use serde_json::{json, Value};

    fn payload(value: Value) -> Payload {
        Payload::from_fields(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_rating_bounds() {
        let body = json!({ "name": "A", "position": "CEO", "company": "B", "content": "Great", "rating": 6 });
        let err = Testimonial::from_payload(&payload(body)).unwrap_err();
        assert_eq!(err.errors()[0].code, "OUT_OF_RANGE");

        let body = json!({ "name": "A", "position": "CEO", "company": "B", "content": "Great" });
        let err = Testimonial::from_payload(&payload(body)).unwrap_err();
        assert_eq!(err.errors()[0].message, "Please add a rating");
    }

    #[test]
    fn test_featured_from_form_text() {
        let body = json!({
            "name": "A", "position": "CEO", "company": "B", "content": "Great",
            "rating": "5", "featured": "true", "order": "3"
        });
        let testimonial = Testimonial::from_payload(&payload(body)).unwrap();
        assert!(testimonial.featured);
        assert_eq!(testimonial.order, 3);
        assert!(testimonial.id.starts_with("tst_"));
    }
}
