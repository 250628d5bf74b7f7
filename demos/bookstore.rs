//! Bookstore demo: dials PostgreSQL from env (`DATABASE_URL` etc.), ensures the database exists,
//! and serves a `books` resource at /v1/books plus the common routes.
//!
//! Set `DOCREST_MEMORY=1` to run against the in-memory store instead.

use axum::Router;
use docrest::{
    common_routes_with_ready, ensure_database_exists, from_fn, AppError, DialInfo, Document, DocumentBase, Library,
    LibrarySettings, MemoryStore, RequestContext,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Book {
    #[serde(flatten)]
    base: DocumentBase,
    title: String,
    author: String,
    #[serde(default)]
    publisher: String,
}

impl Document for Book {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn set_id(&mut self, id: String) {
        self.base.set_id(id)
    }
}

fn require_title(ctx: &mut RequestContext) -> Result<(), AppError> {
    let book: &Book = ctx.must_get(docrest::DEFAULT_REQUEST_CTX_KEY)?;
    if book.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docrest=info,bookstore=info")),
        )
        .init();

    let settings = LibrarySettings::new("/v1");
    let mut lib = if std::env::var("DOCREST_MEMORY").is_ok() {
        Library::new(Arc::new(MemoryStore::new()), settings)
    } else {
        let dial = DialInfo::from_env()?;
        ensure_database_exists(&dial).await?;
        Library::connect(&dial, settings).await?
    };

    let books = lib
        .resource::<Book>("books")?
        .create(vec![from_fn(require_title)])
        .read(vec![])
        .update(vec![from_fn(require_title)])
        .delete(vec![])
        .list(vec![]);
    lib.mount(books).await?;

    let app = Router::new()
        .merge(common_routes_with_ready(lib.store().clone()))
        .merge(lib.router());

    let listener = TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    lib.terminate().await;
    Ok(())
}
