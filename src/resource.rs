//! A document type bound to a collection and its five CRUD routes.

use crate::context::{RequestContext, ID_PATH_PARAM};
use crate::document::{new_id, Document};
use crate::error::AppError;
use crate::middleware::{handle_errors, parse_request, run_chain, serialize_response, Middleware};
use crate::store::DocumentStore;
use axum::{
    body::Bytes,
    extract::State,
    response::Response,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    /// Create and update read a document from the body.
    pub fn parses_body(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        };
        f.write_str(s)
    }
}

/// What an update body looked like before middleware ran: the keys the client sent and the
/// parsed document in JSON form.
struct UpdateBaseline {
    sent: HashSet<String>,
    parsed: Value,
}

impl UpdateBaseline {
    fn capture<D: Document>(ctx: &RequestContext, request_key: &str, body: &Bytes) -> Option<Self> {
        let sent = match serde_json::from_slice::<Value>(body).ok()? {
            Value::Object(map) => map.into_iter().map(|(k, _)| k).collect(),
            _ => return None,
        };
        let parsed = serde_json::to_value(ctx.get::<D>(request_key)?).ok()?;
        Some(UpdateBaseline { sent, parsed })
    }

    /// Drops fields the client left out and middleware did not touch, so stored values survive.
    fn restrict(&self, fields: &mut Value) {
        if let Value::Object(map) = fields {
            map.retain(|k, v| self.sent.contains(k) || self.parsed.get(k) != Some(&*v));
        }
    }
}

struct ResourceShared<D> {
    name: String,
    store: Arc<dyn DocumentStore>,
    request_key: String,
    response_key: String,
    _doc: PhantomData<fn() -> D>,
}

impl<D: Document> ResourceShared<D> {
    fn path_id(ctx: &RequestContext) -> Result<String, AppError> {
        ctx.id()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest(format!("missing :{} path parameter", ID_PATH_PARAM)))
    }

    fn take_request(&self, ctx: &mut RequestContext) -> Result<D, AppError> {
        ctx.take::<D>(&self.request_key)
            .ok_or_else(|| AppError::MissingContext(self.request_key.clone()))
    }

    /// One store round-trip for `op`. The session is released when this returns.
    async fn execute(
        &self,
        op: Operation,
        ctx: &mut RequestContext,
        baseline: Option<&UpdateBaseline>,
    ) -> Result<(), AppError> {
        let mut session = self.store.session(&self.name).await?;
        match op {
            Operation::Create => {
                let mut doc = self.take_request(ctx)?;
                doc.set_id(new_id());
                session.insert(doc.id(), &serde_json::to_value(&doc)?).await?;
                tracing::debug!(collection = %self.name, id = %doc.id(), "document created");
                ctx.set(self.response_key.clone(), doc);
            }
            Operation::Read => {
                let id = Self::path_id(ctx)?;
                let doc: D = serde_json::from_value(session.find_id(&id).await?)?;
                ctx.set(self.response_key.clone(), doc);
            }
            Operation::Update => {
                let id = Self::path_id(ctx)?;
                let mut doc = self.take_request(ctx)?;
                doc.set_id(id.clone());
                let mut fields = serde_json::to_value(&doc)?;
                if let Some(baseline) = baseline {
                    baseline.restrict(&mut fields);
                }
                let merged = session.update_id(&id, &fields).await?;
                let doc: D = serde_json::from_value(merged)?;
                tracing::debug!(collection = %self.name, id = %id, "document updated");
                ctx.set(self.response_key.clone(), doc);
            }
            Operation::Delete => {
                let id = Self::path_id(ctx)?;
                session.remove_id(&id).await?;
                tracing::debug!(collection = %self.name, id = %id, "document deleted");
                ctx.set(self.response_key.clone(), ());
            }
            Operation::List => {
                let docs = session
                    .find_all()
                    .await?
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<D>, _>>()?;
                ctx.set(self.response_key.clone(), docs);
            }
        }
        Ok(())
    }
}

/// State of one registered route: the operation and the middleware given for it.
struct RouteState<D> {
    shared: Arc<ResourceShared<D>>,
    op: Operation,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl<D: Document> RouteState<D> {
    async fn dispatch(&self, mut ctx: RequestContext, body: Bytes) -> Response {
        let shared = &self.shared;
        if self.op.parses_body() {
            parse_request::<D>(&mut ctx, &shared.request_key, &body);
        }
        let baseline = match self.op {
            Operation::Update if !ctx.is_aborted() => {
                UpdateBaseline::capture::<D>(&ctx, &shared.request_key, &body)
            }
            _ => None,
        };
        run_chain(&mut ctx, &self.middleware).await;
        if !ctx.is_aborted() {
            if let Err(e) = shared.execute(self.op, &mut ctx, baseline.as_ref()).await {
                ctx.abort_with(e);
            }
        }
        let response = serialize_response(&mut ctx, &shared.response_key);
        handle_errors(&ctx, response)
    }
}

async fn handle<D: Document>(
    State(route): State<Arc<RouteState<D>>>,
    ctx: RequestContext,
    body: Bytes,
) -> Response {
    route.dispatch(ctx, body).await
}

/// CRUD routes for documents of type `D` in one collection.
///
/// Each operation method registers its route with the middleware to run before the
/// operation handler; operations that are never called stay unrouted.
pub struct Resource<D> {
    shared: Arc<ResourceShared<D>>,
    collection_path: String,
    router: Router,
}

impl<D: Document> Resource<D> {
    pub(crate) fn new(
        name: &str,
        collection_path: String,
        store: Arc<dyn DocumentStore>,
        request_key: &str,
        response_key: &str,
    ) -> Self {
        Resource {
            shared: Arc::new(ResourceShared {
                name: name.to_string(),
                store,
                request_key: request_key.to_string(),
                response_key: response_key.to_string(),
                _doc: PhantomData,
            }),
            collection_path,
            router: Router::new(),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Route of the collection, e.g. `/v1/books`.
    pub fn path(&self) -> &str {
        &self.collection_path
    }

    fn method_router(&self, op: Operation, middleware: Vec<Arc<dyn Middleware>>) -> MethodRouter {
        let state = Arc::new(RouteState {
            shared: self.shared.clone(),
            op,
            middleware,
        });
        let method = match op {
            Operation::Create => post(handle::<D>),
            Operation::Read | Operation::List => get(handle::<D>),
            Operation::Update => put(handle::<D>),
            Operation::Delete => delete(handle::<D>),
        };
        method.with_state(state)
    }

    fn route_collection(mut self, op: Operation, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        let mr = self.method_router(op, middleware);
        let with_slash = format!("{}/", self.collection_path);
        self.router = self
            .router
            .route(&self.collection_path, mr.clone())
            .route(&with_slash, mr);
        self
    }

    fn route_item(mut self, op: Operation, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        let mr = self.method_router(op, middleware);
        let path = format!("{}/:{}", self.collection_path, ID_PATH_PARAM);
        self.router = self.router.route(&path, mr);
        self
    }

    /// `POST <path>`: parse body, run `middleware`, insert with a fresh id. 200 with the stored document.
    pub fn create(self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.route_collection(Operation::Create, middleware)
    }

    /// `GET <path>/:id`: 200 with the document, 404 when missing.
    pub fn read(self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.route_item(Operation::Read, middleware)
    }

    /// `PUT <path>/:id`: parse body, run `middleware`, set the fields the client sent (and any
    /// middleware changed) on the stored document. 200 with the merged document, 404 when missing.
    pub fn update(self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.route_item(Operation::Update, middleware)
    }

    /// `DELETE <path>/:id`: 204, 404 when missing.
    pub fn delete(self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.route_item(Operation::Delete, middleware)
    }

    /// `GET <path>`: 200 with every document in the collection.
    pub fn list(self, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        self.route_collection(Operation::List, middleware)
    }

    /// All five operations without extra middleware.
    pub fn all(self) -> Self {
        self.create(Vec::new())
            .read(Vec::new())
            .update(Vec::new())
            .delete(Vec::new())
            .list(Vec::new())
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_create_and_update_parse_bodies() {
        assert!(Operation::Create.parses_body());
        assert!(Operation::Update.parses_body());
        assert!(!Operation::Read.parses_body());
        assert!(!Operation::Delete.parses_body());
        assert!(!Operation::List.parses_body());
        assert_eq!(Operation::List.to_string(), "list");
    }

    #[test]
    fn update_fields_keep_sent_and_changed_keys() {
        let baseline = UpdateBaseline {
            sent: ["title".to_string()].into_iter().collect(),
            parsed: json!({"id": "", "title": "Dune", "author": "", "pages": 0}),
        };
        let mut fields = json!({"id": "abc", "title": "Dune", "author": "", "pages": 412});
        baseline.restrict(&mut fields);
        assert_eq!(fields, json!({"id": "abc", "title": "Dune", "pages": 412}));
    }
}
