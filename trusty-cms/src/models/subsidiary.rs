use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite_non_blank, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors, EMAIL_PATTERN};
use validator::Validate;

/// A company in the group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Subsidiary {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add the subsidiary name"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Please add a telephone number"))]
    pub telephone: String,
    #[validate(custom(function = "not_blank", message = "Please add an email address"))]
    #[validate(regex(path = *EMAIL_PATTERN, code = "INVALID_FORMAT", message = "Please add a valid email address"))]
    pub email: String,
    /// URL of the uploaded logo
    #[validate(custom(function = "not_blank", message = "Please upload a logo image"))]
    pub logo_image: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Resource for Subsidiary {
    const COLLECTION: &'static str = "subsidiaries";
    const LABEL: &'static str = "subsidiary";
    const ID_PREFIX: &'static str = "sub";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Subsidiary {
    pub const LOGO_FIELD: &'static str = "logoImage";

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Subsidiary", self)
    }

    /// Validation of the text fields, before the logo is uploaded
    fn validate_details(&self) -> Result<(), ValidationErrors> {
        match self.validate() {
            Err(errors) => {
                let mut details = ValidationErrors::new("Subsidiary");
                details.extend(errors.errors().iter().filter(|e| e.field != "logoImage").cloned());
                details.into_result()
            }
            Ok(()) => Ok(()),
        }
    }
}

impl Model for Subsidiary {
    const UPLOADS: &'static [UploadSlot] = &[UploadSlot::single(Subsidiary::LOGO_FIELD, "general")];

    /// The logo is attached after upload; only the details are checked here
    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let subsidiary = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            name: payload.trimmed("name").unwrap_or_default(),
            telephone: payload.trimmed("telephone").unwrap_or_default(),
            email: payload.trimmed("email").unwrap_or_default(),
            logo_image: String::new(),
            created_at: timestamp::now(),
        };
        subsidiary.validate_details()?;
        Ok(subsidiary)
    }

    /// Blank fields keep their stored value
    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        overwrite_non_blank(&mut self.name, payload.trimmed("name"));
        overwrite_non_blank(&mut self.telephone, payload.trimmed("telephone"));
        overwrite_non_blank(&mut self.email, payload.trimmed("email"));
        self.validate()
    }

    fn attach(&mut self, field: &str, mut urls: Vec<String>) {
        if field == Self::LOGO_FIELD {
            if let Some(url) = urls.pop() {
                self.logo_image = url;
            }
        }
    }
}
