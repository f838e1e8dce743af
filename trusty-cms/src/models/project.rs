use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors};
use validator::Validate;

const COMPLETED: &str = "Completed";
const NOT_COMPLETED: &str = "Not Completed";
const MAX_UPLOADS_PER_FIELD: usize = 10;

/// A portfolio project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a title"))]
    #[validate(length(max = 100, code = "TOO_LONG", message = "Title cannot be more than 100 characters"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Please add a description"))]
    pub description: String,
    #[validate(custom(function = "not_blank", message = "Please add a client name"))]
    pub client: String,
    #[validate(custom(function = "not_blank", message = "Please add a category"))]
    pub category: String,
    #[validate(custom(function = "not_blank", message = "Please add a size"))]
    pub size: String,
    #[validate(custom(function = "not_blank", message = "Please add a duration"))]
    pub duration: String,
    #[validate(custom(function = "not_blank", message = "Please add a timeframe"))]
    pub timeframe: String,
    #[validate(range(min = 0.0, code = "OUT_OF_RANGE", message = "Budget cannot be negative"))]
    pub budget: f64,
    #[validate(range(min = 0, code = "OUT_OF_RANGE", message = "Team size cannot be negative"))]
    pub team_size: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image
    #[serde(default)]
    pub image: String,
    /// Gallery images
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub link: String,
    /// "Yes" or "No"
    #[serde(default = "default_featured")]
    pub featured: String,
    #[serde(with = "timestamp::option", default)]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub testimonial: String,
    pub completion: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_featured() -> String {
    "No".to_string()
}

impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const LABEL: &'static str = "project";
    const ID_PREFIX: &'static str = "prj";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Project {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Project", self)
    }

    fn set_completion_date(&mut self, date: Option<DateTime<Utc>>) {
        self.completion_date = date;
        self.completion = if date.is_some() { COMPLETED } else { NOT_COMPLETED }.to_string();
    }
}

impl Model for Project {
    const UPLOADS: &'static [UploadSlot] = &[
        UploadSlot {
            field: "image",
            folder: "projects",
            max_count: MAX_UPLOADS_PER_FIELD,
        },
        UploadSlot {
            field: "gallery",
            folder: "projects/gallery",
            max_count: MAX_UPLOADS_PER_FIELD,
        },
    ];

    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new("Project");
        let budget = errors.accept(payload.number("budget"));
        let team_size = errors.accept(payload.integer("teamSize"));
        let completion_date = errors.accept(payload.date("completionDate"));
        if budget.is_none() && payload.number("budget").is_ok() {
            errors.add("budget", "REQUIRED", "Please add a budget");
        }
        if team_size.is_none() && payload.integer("teamSize").is_ok() {
            errors.add("teamSize", "REQUIRED", "Please add a team size");
        }

        let mut project = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            title: payload.trimmed("title").unwrap_or_default(),
            description: payload.text("description").unwrap_or_default(),
            client: payload.trimmed("client").unwrap_or_default(),
            category: payload.trimmed("category").unwrap_or_default(),
            size: payload.trimmed("size").unwrap_or_default(),
            duration: payload.trimmed("duration").unwrap_or_default(),
            timeframe: payload.trimmed("timeframe").unwrap_or_default(),
            budget: budget.unwrap_or_default(),
            team_size: team_size.unwrap_or_default(),
            tags: payload.list("tags").unwrap_or_default(),
            image: payload.text("image").unwrap_or_default(),
            images: payload.list("images").unwrap_or_default(),
            link: payload.trimmed("link").unwrap_or_default(),
            featured: payload
                .trimmed("featured")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_featured),
            completion_date: None,
            testimonial: payload.text("testimonial").unwrap_or_default(),
            completion: NOT_COMPLETED.to_string(),
            created_at: timestamp::now(),
        };
        project.set_completion_date(completion_date);

        if let Err(invalid) = project.validate() {
            errors.extend(invalid.errors().iter().cloned());
        }
        errors.into_result()?;
        Ok(project)
    }

    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new("Project");
        let budget = errors.accept(payload.number("budget"));
        let team_size = errors.accept(payload.integer("teamSize"));
        let completion_date = errors.accept(payload.date("completionDate"));
        errors.into_result()?;

        overwrite(&mut self.title, payload.trimmed("title"));
        overwrite(&mut self.description, payload.text("description"));
        overwrite(&mut self.client, payload.trimmed("client"));
        overwrite(&mut self.category, payload.trimmed("category"));
        overwrite(&mut self.size, payload.trimmed("size"));
        overwrite(&mut self.duration, payload.trimmed("duration"));
        overwrite(&mut self.timeframe, payload.trimmed("timeframe"));
        overwrite(&mut self.image, payload.text("image"));
        overwrite(&mut self.link, payload.trimmed("link"));
        overwrite(&mut self.featured, payload.trimmed("featured"));
        overwrite(&mut self.testimonial, payload.text("testimonial"));
        if let Some(tags) = payload.list("tags") {
            self.tags = tags;
        }
        if let Some(images) = payload.list("images") {
            self.images = images;
        }
        if let Some(budget) = budget {
            self.budget = budget;
        }
        if let Some(team_size) = team_size {
            self.team_size = team_size;
        }
        if payload.has("completionDate") {
            self.set_completion_date(completion_date);
        }
        self.validate()
    }

    fn attach(&mut self, field: &str, mut urls: Vec<String>) {
        match field {
            "image" => {
                if let Some(url) = urls.pop() {
                    self.image = url;
                }
            }
            "gallery" if !urls.is_empty() => self.images = urls,
            _ => {}
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

    fn body() -> Value {
        json!({
            "title": "Ridge Tower", "description": "Offices", "client": "Ridge",
            "category": "commercial", "size": "12 floors", "duration": "18 months",
            "timeframe": "2022-2023", "budget": "2500000", "teamSize": "40"
        })
    }

    #[test]
    fn test_completion_follows_completion_date() {
        let mut project = Project::from_payload(&payload(body())).unwrap();
        assert_eq!(project.completion, "Not Completed");
        assert_eq!(project.featured, "No");
        assert_eq!(project.team_size, 40);

        project.apply(&payload(json!({ "completionDate": "2023-12-01" }))).unwrap();
        assert_eq!(project.completion, "Completed");

        project.apply(&payload(json!({ "completionDate": "" }))).unwrap();
        assert_eq!(project.completion, "Not Completed");
        assert_eq!(project.completion_date, None);
    }

    #[test]
    fn test_missing_numbers_are_required() {
        let mut b = body();
        b.as_object_mut().unwrap().remove("budget");
        b["teamSize"] = json!("many");
        let err = Project::from_payload(&payload(b)).unwrap_err();
        let codes: Vec<_> = err.errors().iter().map(|e| (e.field.as_str(), e.code.as_str())).collect();
        assert_eq!(codes, vec![("teamSize", "INVALID_TYPE"), ("budget", "REQUIRED")]);
    }

    #[test]
    fn test_gallery_upload_replaces_images() {
        let mut project = Project::from_payload(&payload(body())).unwrap();
        project.attach("gallery", vec!["a.png".into(), "b.png".into()]);
        project.attach("gallery", Vec::new());
        assert_eq!(project.images, vec!["a.png", "b.png"]);
    }
}
