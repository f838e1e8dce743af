use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors};
use validator::Validate;

/// A member of the team page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a name"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Please add a role"))]
    pub role: String,
    #[validate(custom(function = "not_blank", message = "Please add a description"))]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for TeamMember {
    const COLLECTION: &'static str = "team";
    const LABEL: &'static str = "team member";
    const ID_PREFIX: &'static str = "team";

    fn id(&self) -> &str {
        &self.id
    }
}

impl TeamMember {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Team", self)
    }
}

impl Model for TeamMember {
    const UPLOADS: &'static [UploadSlot] = &[UploadSlot::single("image", "team/profiles")];

    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let member = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            name: payload.trimmed("name").unwrap_or_default(),
            role: payload.trimmed("role").unwrap_or_default(),
            description: payload.text("description").unwrap_or_default(),
            image: payload.text("image").unwrap_or_default(),
            created_at: timestamp::now(),
        };
        member.validate()?;
        Ok(member)
    }

    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        overwrite(&mut self.name, payload.trimmed("name"));
        overwrite(&mut self.role, payload.trimmed("role"));
        overwrite(&mut self.description, payload.text("description"));
        overwrite(&mut self.image, payload.text("image"));
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
