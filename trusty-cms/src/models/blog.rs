use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{overwrite, timestamp, Model, UploadSlot};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors};
use validator::Validate;

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    #[validate(custom(function = "not_blank", message = "Please add a title"))]
    #[validate(length(max = 200, code = "TOO_LONG", message = "Title cannot be more than 200 characters"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Please add a summary"))]
    #[validate(length(max = 500, code = "TOO_LONG", message = "Summary cannot be more than 500 characters"))]
    pub summary: String,
    #[validate(custom(function = "not_blank", message = "Please add content"))]
    pub content: String,
    /// Unique URL key
    #[validate(custom(function = "not_blank", message = "Please add a slug"))]
    pub slug: String,
    #[serde(default)]
    pub image: String,
    /// Author name or user id
    #[validate(custom(function = "not_blank", message = "Please add an author"))]
    pub author: String,
    #[validate(custom(function = "not_blank", message = "Please add a category"))]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    /// Set the first time the post is published, never changed afterwards
    #[serde(with = "timestamp::option", default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Resource for BlogPost {
    const COLLECTION: &'static str = "blog_posts";
    const LABEL: &'static str = "blog post";
    const ID_PREFIX: &'static str = "blog";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Lowercase, drop everything but word characters, spaces and hyphens, hyphenate spaces
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

fn default_slug(title: &str, at: &DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().to_string();
    if title.is_empty() {
        return format!("blog-{millis}");
    }
    let suffix = &millis[millis.len().saturating_sub(6)..];
    format!("{}-{}", slugify(title), suffix)
}

impl BlogPost {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ValidationErrors::check("Blog", self)
    }

    /// Flips `published`, stamping `publishedAt` on the first publication
    pub fn toggle_published(&mut self) {
        let now = timestamp::now();
        self.published = !self.published;
        self.stamp_publication(now);
        self.updated_at = now;
    }

    fn stamp_publication(&mut self, at: DateTime<Utc>) {
        if self.published && self.published_at.is_none() {
            self.published_at = Some(at);
        }
    }
}

impl Model for BlogPost {
    const UPLOADS: &'static [UploadSlot] = &[UploadSlot::single("image", "general")];

    fn from_payload(payload: &Payload) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new("Blog");
        let published = errors.accept(payload.flag("published")).unwrap_or(false);
        errors.into_result()?;

        let now = timestamp::now();
        let title = payload.trimmed("title").unwrap_or_default();
        let slug = payload
            .trimmed("slug")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_slug(&title, &now));

        let mut post = Self {
            id: DocumentId::generate(Self::ID_PREFIX).into(),
            title,
            summary: payload.text("summary").unwrap_or_default(),
            content: payload.text("content").unwrap_or_default(),
            slug,
            image: payload.text("image").unwrap_or_default(),
            author: payload.trimmed("author").unwrap_or_default(),
            category: payload.trimmed("category").unwrap_or_default(),
            tags: payload.list("tags").unwrap_or_default(),
            published,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        post.stamp_publication(now);
        post.validate()?;
        Ok(post)
    }

    fn apply(&mut self, payload: &Payload) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new("Blog");
        let published = errors.accept(payload.flag("published"));
        errors.into_result()?;

        overwrite(&mut self.title, payload.trimmed("title"));
        overwrite(&mut self.summary, payload.text("summary"));
        overwrite(&mut self.content, payload.text("content"));
        overwrite(&mut self.slug, payload.trimmed("slug"));
        overwrite(&mut self.image, payload.text("image"));
        overwrite(&mut self.author, payload.trimmed("author"));
        overwrite(&mut self.category, payload.trimmed("category"));
        if let Some(tags) = payload.list("tags") {
            self.tags = tags;
        }
        if let Some(published) = published {
            self.published = published;
        }

        let now = timestamp::now();
        self.stamp_publication(now);
        self.updated_at = now;
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
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn payload(value: Value) -> Payload {
        Payload::from_fields(value.as_object().cloned().unwrap())
    }

    fn draft() -> Value {
        json!({
            "title": "  Designing Offices  ",
            "summary": "How we plan",
            "content": "Body",
            "author": "Ama",
            "category": "design",
            "tags": "office, planning"
        })
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!  Again"), "hello-world-again");
        assert_eq!(slugify("Día de obra"), "da-de-obra");
    }

    #[test]
    fn test_default_slug_uses_last_six_millis_digits() {
        let at = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        assert_eq!(default_slug("Big News", &at), "big-news-123456");
        assert_eq!(default_slug("", &at), "blog-1700000123456");
    }

    #[test]
    fn test_create_unpublished_leaves_published_at_unset() {
        let post = BlogPost::from_payload(&payload(draft())).unwrap();
        assert!(post.id.starts_with("blog_"));
        assert_eq!(post.title, "Designing Offices");
        assert!(post.slug.starts_with("designing-offices-"));
        assert_eq!(post.tags, vec!["office", "planning"]);
        assert!(!post.published);
        assert_eq!(post.published_at, None);
    }

    #[test]
    fn test_first_publication_is_stamped_once() {
        let mut post = BlogPost::from_payload(&payload(draft())).unwrap();
        post.apply(&payload(json!({ "published": "true" }))).unwrap();
        let first = post.published_at.expect("stamped on first publication");

        post.apply(&payload(json!({ "published": false }))).unwrap();
        post.apply(&payload(json!({ "published": true }))).unwrap();
        assert_eq!(post.published_at, Some(first));

        post.toggle_published();
        post.toggle_published();
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn test_validation_failures_are_collected() {
        let err = BlogPost::from_payload(&payload(json!({ "title": "x".repeat(201) }))).unwrap_err();
        let fields: Vec<_> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["author", "category", "content", "summary", "title"]);
        assert!(err.to_string().starts_with("Blog validation failed: author: Please add an author"));
        assert!(err.to_string().ends_with("title: Title cannot be more than 200 characters"));
    }

    #[test]
    fn test_update_revalidates() {
        let mut post = BlogPost::from_payload(&payload(draft())).unwrap();
        assert!(post.apply(&payload(json!({ "summary": "" }))).is_err());
    }
}
