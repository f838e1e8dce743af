//! Shared harness for the HTTP tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, Router};
use http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use trusty_cms::mail::{MailError, Mailer, Notification};
use trusty_cms::media::{MediaError, MediaStorage, UploadedFile};
use trusty_cms::prelude::{app, AppState, Config, DocumentStore, MemoryStore};
use trusty_cms::repository::{Document, FilterDescriptor, FindOptions, RepositoryError, RepositoryResult};

pub const BOUNDARY: &str = "trusty-test-boundary";

/// Media backend that hands out predictable URLs
#[derive(Default)]
pub struct FakeMedia {
    pub stored: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MediaStorage for FakeMedia {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn store(&self, file: &UploadedFile, folder: &str) -> Result<String, MediaError> {
        self.stored
            .lock()
            .unwrap()
            .push((folder.to_string(), file.file_name.clone()));
        Ok(format!("https://media.test/{folder}/{}", file.file_name))
    }
}

/// Media backend whose host always refuses the upload
pub struct BrokenMedia;

#[async_trait]
impl MediaStorage for BrokenMedia {
    fn backend(&self) -> &'static str {
        "broken"
    }

    async fn store(&self, _: &UploadedFile, _: &str) -> Result<String, MediaError> {
        Err(MediaError::Rejected {
            status: 500,
            message: "media host is down".to_string(),
        })
    }
}

/// Mailer that records every notification
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Store wrapper whose `users` collection cannot be read
pub struct UsersOffline(pub MemoryStore);

#[async_trait]
impl DocumentStore for UsersOffline {
    async fn find(&self, collection: &str, filter: &FilterDescriptor, options: &FindOptions) -> RepositoryResult<Vec<Document>> {
        if collection == "users" {
            return Err(RepositoryError::connection_failed("users shard offline"));
        }
        self.0.find(collection, filter, options).await
    }
    async fn count(&self, collection: &str, filter: &FilterDescriptor) -> RepositoryResult<u64> {
        self.0.count(collection, filter).await
    }
    async fn find_by_id(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>> {
        self.0.find_by_id(collection, id).await
    }
    async fn insert(&self, collection: &str, document: Document) -> RepositoryResult<Document> {
        self.0.insert(collection, document).await
    }
    async fn replace(&self, collection: &str, id: &str, document: Document) -> RepositoryResult<Option<Document>> {
        self.0.replace(collection, id, document).await
    }
    async fn delete(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>> {
        self.0.delete(collection, id).await
    }
    async fn ping(&self) -> RepositoryResult<()> {
        self.0.ping().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn DocumentStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(Arc::new(MemoryStore::new()), Arc::new(FakeMedia::default()), None).await
    }

    pub async fn with(
        store: Arc<dyn DocumentStore>,
        media: Arc<dyn MediaStorage>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let mut builder = AppState::builder()
            .config(Config::default())
            .store(Arc::clone(&store))
            .media(media);
        if let Some(mailer) = mailer {
            builder = builder.mailer(mailer);
        }
        let state = builder.build().await.unwrap();
        Self {
            router: app(state).unwrap(),
            store,
        }
    }

    pub async fn seed(&self, collection: &str, document: Value) {
        self.store
            .insert(collection, document.as_object().cloned().unwrap())
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, fields: &[(&str, &str)], files: &[(&str, &str)]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        self.send(request).await
    }
}

/// Form body with text `fields` and PNG `files` given as (field, file name)
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    for (name, file_name) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\nnot-really-a-png\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}
