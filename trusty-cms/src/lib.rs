//! # trusty-cms
//!
//! Content management API behind the Trusty Group corporate site: blog posts,
//! services, contact submissions, testimonials, team members, subsidiaries,
//! projects and user accounts, all served as JSON under `/api`.
//!
//! ## Features
//!
//! - **List engine**: query-string filters, sorting, projection and pagination
//!   compiled once and run against any collection
//! - **Flexible bodies**: JSON, URL-encoded and multipart requests share one extractor
//! - **Media**: uploads go to the local disk or to Cloudinary
//! - **Notifications**: contact submissions are mailed to the operators over SMTP
//! - **Health checks**: liveness and readiness endpoints
//! - **Graceful shutdown**: SIGTERM and SIGINT drain in-flight requests
//!
//! ## Example
//!
//! ```rust,no_run
//! use trusty_cms::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config).build().await?;
//!     Server::new(state).serve().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod mail;
pub mod media;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod query;
pub mod repository;
pub mod resources;
pub mod server;
pub mod state;
pub mod validation;

/// Commonly used items
pub mod prelude {
    pub use crate::config::{Config, MailConfig, MediaBackend, MediaConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind, Deleted, ItemResponse, ListResponse, Payload};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{DocumentId, MakeTypedRequestId, RequestId};
    pub use crate::mail::{Mailer, Notification, SmtpMailer};
    pub use crate::media::{MediaStorage, UploadedFile};
    pub use crate::models::{
        BlogPost, Contact, ContactStatus, Model, Project, PublicUser, Service, Subsidiary, TeamMember,
        Testimonial, User,
    };
    pub use crate::observability::init_tracing;
    pub use crate::query::{ListQuery, ListRules, QueryParams};
    pub use crate::repository::{DocumentStore, MemoryStore, RelationLoader, Resource};
    pub use crate::server::{app, Server};
    pub use crate::state::AppState;

    pub use axum::{routing::get, Router};
    pub use tokio;
    pub use tracing::{debug, error, info, warn};
}
