//! docrest: REST CRUD resources for JSON document collections.
//!
//! A [`Library`] owns the shared [`DocumentStore`]; each [`Resource`] binds a [`Document`] type to a
//! collection and registers create/read/update/delete/list routes that run a fixed middleware chain
//! over a per-request [`RequestContext`].

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod library;
pub mod middleware;
pub mod resource;
pub mod routes;
pub mod store;

pub use config::{DialInfo, LibrarySettings, DEFAULT_REQUEST_CTX_KEY, DEFAULT_RESPONSE_CTX_KEY};
pub use context::{ContextError, RequestContext, ID_PATH_PARAM};
pub use document::{new_id, Document, DocumentBase};
pub use error::{AppError, ConfigError, INTERNAL_ERROR_MESSAGE};
pub use library::Library;
pub use middleware::{from_fn, Middleware};
pub use resource::{Operation, Resource};
pub use routes::{common_routes, common_routes_with_ready};
pub use store::{ensure_database_exists, DocumentStore, MemoryStore, PgDocumentStore, StoreSession};
