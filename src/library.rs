//! The library instance: shared store, settings common to all resources, and the mounted routes.

use crate::config::{validate_collection_name, DialInfo, LibrarySettings};
use crate::document::Document;
use crate::error::{AppError, ConfigError};
use crate::resource::Resource;
use crate::store::{DocumentStore, PgDocumentStore};
use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

pub struct Library {
    store: Arc<dyn DocumentStore>,
    settings: LibrarySettings,
    routes: Router,
    mounted: HashSet<String>,
}

impl Library {
    /// Library over an existing store. Empty context keys fall back to the defaults.
    pub fn new(store: Arc<dyn DocumentStore>, settings: LibrarySettings) -> Self {
        Library {
            store,
            settings: settings.normalized(),
            routes: Router::new(),
            mounted: HashSet::new(),
        }
    }

    /// Default settings: mounted at `/`, keys `request` and `response`.
    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, LibrarySettings::default())
    }

    /// Dials PostgreSQL and builds a library over it.
    pub async fn connect(dial: &DialInfo, settings: LibrarySettings) -> Result<Self, AppError> {
        let store = PgDocumentStore::connect(dial).await?;
        Ok(Self::new(Arc::new(store), settings))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    /// New resource for collection `name`, routed under the base path.
    /// Register its operations, then hand it to [`Library::mount`].
    pub fn resource<D: Document>(&self, name: &str) -> Result<Resource<D>, ConfigError> {
        validate_collection_name(name)?;
        Ok(Resource::new(
            name,
            self.settings.collection_path(name),
            self.store.clone(),
            &self.settings.request_key,
            &self.settings.response_key,
        ))
    }

    /// Creates the resource's collection if needed and adds its routes.
    /// Each collection can be mounted once.
    pub async fn mount<D: Document>(&mut self, resource: Resource<D>) -> Result<(), AppError> {
        if self.mounted.contains(resource.name()) {
            return Err(ConfigError::DuplicateCollection(resource.name().to_string()).into());
        }
        self.store.ensure_collection(resource.name()).await?;
        self.mounted.insert(resource.name().to_string());
        tracing::info!(collection = %resource.name(), path = %resource.path(), "resource mounted");
        let routes = resource
            .into_router()
            .layer(RequestBodyLimitLayer::new(self.settings.body_limit));
        self.routes = std::mem::take(&mut self.routes).merge(routes);
        Ok(())
    }

    /// Every mounted resource route, ready to merge into an application router.
    pub fn router(&self) -> Router {
        self.routes.clone()
    }

    /// Closes the shared store. Routers handed out earlier stop working against it.
    pub async fn terminate(self) {
        self.store.close().await;
        tracing::info!("library terminated");
    }
}
