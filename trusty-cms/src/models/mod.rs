//! Resource documents
//!
//! Each resource is a plain struct, serialized camelCase into its store
//! collection. Building an entity from a request body and checking it are
//! separate steps: [`Model::from_payload`] and [`Model::apply`] read the
//! fields, then run the resource's `validate`.
//!
//! Files are uploaded only after the text fields validate, and the entity is
//! written only after every upload succeeded, so a failed upload leaves the
//! store untouched.

pub mod timestamp;

mod blog;
mod contact;
mod project;
mod service;
mod subsidiary;
mod team;
mod testimonial;
mod user;

pub use blog::{slugify, BlogPost};
pub use contact::{Contact, ContactStatus};
pub use project::Project;
pub use service::Service;
pub use subsidiary::Subsidiary;
pub use team::TeamMember;
pub use testimonial::Testimonial;
pub use user::{hash_password, PublicUser, Registration, User};

use crate::handlers::Payload;
use crate::repository::Resource;
use crate::validation::ValidationErrors;

/// A form file field and the media folder it is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSlot {
    /// Multipart field name
    pub field: &'static str,
    /// Target folder on the media backend
    pub folder: &'static str,
    /// Most files accepted in one request
    pub max_count: usize,
}

impl UploadSlot {
    /// Slot taking at most one file
    pub const fn single(field: &'static str, folder: &'static str) -> Self {
        Self { field, folder, max_count: 1 }
    }
}

/// A resource editable through create and update requests
pub trait Model: Resource + Clone {
    /// File fields accepted by create and update
    const UPLOADS: &'static [UploadSlot] = &[];

    /// New entity from a create body, with id and timestamps assigned
    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors>;

    /// Overwrites the fields present in an update body, then re-validates
    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors>;

    /// Records the stored URLs of files uploaded under `field`
    fn attach(&mut self, field: &str, urls: Vec<String>) {
        let _ = (field, urls);
    }
}

/// Sets `target` when the body carries the field
pub(crate) fn overwrite(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Sets `target` when the body carries a non-blank value
pub(crate) fn overwrite_non_blank(target: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = value;
    }
}
