//! Application state management

use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    mail::{Mailer, SmtpMailer},
    media::{self, MediaStorage},
    models::{BlogPost, User},
    repository::{Collection, DocumentStore, MemoryStore, Resource},
};

/// Shared handles passed to every handler
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaStorage>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl AppState {
    /// Create a builder for constructing AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The document store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Typed handle over one resource's collection
    pub fn collection<R: Resource>(&self) -> Collection<R> {
        Collection::new(Arc::clone(&self.store))
    }

    /// The media backend
    pub fn media(&self) -> &Arc<dyn MediaStorage> {
        &self.media
    }

    /// The mailer, when `[mail]` is configured
    pub fn mailer(&self) -> Option<&Arc<dyn Mailer>> {
        self.mailer.as_ref()
    }
}

/// Builder for AppState
///
/// Collaborators not supplied explicitly are built from the configuration.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn DocumentStore>>,
    media: Option<Arc<dyn MediaStorage>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this store instead of one built from `[store]`
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this media backend instead of one built from `[media]`
    pub fn media(mut self, media: Arc<dyn MediaStorage>) -> Self {
        self.media = Some(media);
        self
    }

    /// Use this mailer instead of one built from `[mail]`
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Build the AppState
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(open_store(&config).await?),
        };

        let media = match self.media {
            Some(media) => media,
            None => media::from_config(&config.media)?,
        };

        let mailer = match (self.mailer, &config.mail) {
            (Some(mailer), _) => Some(mailer),
            (None, Some(mail)) => Some(Arc::new(SmtpMailer::new(mail)?) as Arc<dyn Mailer>),
            (None, None) => {
                tracing::warn!("No [mail] section configured; contact notifications are disabled");
                None
            }
        };

        tracing::info!(
            media = media.backend(),
            persistent = config.store.data_dir.is_some(),
            mail = mailer.is_some(),
            "Application state ready"
        );

        Ok(AppState {
            config: Arc::new(config),
            store,
            media,
            mailer,
        })
    }
}

/// Memory store with the unique indexes the resources rely on
pub async fn open_store(config: &Config) -> Result<MemoryStore> {
    let store = match &config.store.data_dir {
        Some(dir) => MemoryStore::open(dir.clone()).await?,
        None => MemoryStore::new(),
    };
    Ok(store
        .with_unique(BlogPost::COLLECTION, "slug")
        .with_unique(User::COLLECTION, "email"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_defaults() {
        let state = AppState::builder().build().await.unwrap();
        assert_eq!(state.config().service.port, 5000);
        assert_eq!(state.media().backend(), "local");
        assert!(state.mailer().is_none());
        assert!(state.store().ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_persistent_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.data_dir = Some(dir.path().to_path_buf());
        let state = AppState::builder().config(config).build().await.unwrap();
        assert!(state.store().ping().await.is_ok());
    }
}
