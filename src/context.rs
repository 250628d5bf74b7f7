//! Per-request state passed down a resource's middleware chain.

use crate::error::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, HeaderMap, Method, StatusCode, Uri},
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;

/// Path parameter holding a document id.
pub const ID_PATH_PARAM: &str = "id";

/// An error recorded on the request along with the status to send for it.
#[derive(Debug)]
pub struct ContextError {
    pub error: AppError,
    pub status: StatusCode,
}

type ToJson = fn(&(dyn Any + Send + Sync + 'static)) -> Option<Result<Value, serde_json::Error>>;

fn to_json<T: Serialize + Any>(value: &(dyn Any + Send + Sync + 'static)) -> Option<Result<Value, serde_json::Error>> {
    value.downcast_ref::<T>().map(serde_json::to_value)
}

/// A stored value plus, for serializable values, how to turn it into JSON.
struct Slot {
    value: Box<dyn Any + Send + Sync>,
    to_json: Option<ToJson>,
}

/// Request-scoped storage: string-keyed typed values, recorded errors and the abort flag.
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    id: Option<String>,
    values: HashMap<String, Slot>,
    errors: Vec<ContextError>,
    aborted: bool,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, id: Option<String>) -> Self {
        RequestContext {
            method,
            uri,
            headers,
            id,
            values: HashMap::new(),
            errors: Vec::new(),
            aborted: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `:id` path segment, for routes that have one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Stores `value` under `key`, replacing any previous value.
    /// Any value set this way can be written out as the response.
    pub fn set<T: Serialize + Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(
            key.into(),
            Slot {
                value: Box::new(value),
                to_json: Some(to_json::<T>),
            },
        );
    }

    /// Stores a value that has no JSON form (handles, clients, ...).
    pub fn set_opaque<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(
            key.into(),
            Slot {
                value: Box::new(value),
                to_json: None,
            },
        );
    }

    /// Value under `key` if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.value.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.value.downcast_mut::<T>()
    }

    /// JSON form of the value under `key`: `None` when absent,
    /// `Some(Err(..))` when it was stored opaque or fails to serialize.
    pub fn json(&self, key: &str) -> Option<Result<Value, AppError>> {
        let slot = self.values.get(key)?;
        let json = slot.to_json.and_then(|f| f(slot.value.as_ref()));
        Some(match json {
            Some(res) => res.map_err(AppError::from),
            None => Err(AppError::Internal(format!("value under '{}' has no JSON form", key))),
        })
    }

    /// Like [`RequestContext::get`] but an absent or mistyped value is an error.
    pub fn must_get<T: Any>(&self, key: &str) -> Result<&T, AppError> {
        self.get(key).ok_or_else(|| AppError::MissingContext(key.to_string()))
    }

    /// Removes and returns the value under `key`. A value of another type stays in place.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        let Slot { value, to_json } = self.values.remove(key)?;
        match value.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(value) => {
                self.values.insert(key.to_string(), Slot { value, to_json });
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Records `error` with `status` and stops the rest of the chain.
    pub fn abort_with_error(&mut self, error: AppError, status: StatusCode) {
        tracing::debug!(error = %error, status = status.as_u16(), "request aborted");
        self.errors.push(ContextError { error, status });
        self.aborted = true;
    }

    /// [`RequestContext::abort_with_error`] with the error's own status.
    pub fn abort_with(&mut self, error: AppError) {
        let status = error.status_code();
        self.abort_with_error(error, status);
    }

    /// Stops the chain without recording an error.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn errors(&self) -> &[ContextError] {
        &self.errors
    }

    pub fn errors_exist(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let id = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(mut params)| params.remove(ID_PATH_PARAM));
        Ok(RequestContext::new(
            parts.method.clone(),
            parts.uri.clone(),
            parts.headers.clone(),
            id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, Uri::from_static("/books/1"), HeaderMap::new(), Some("1".into()))
    }

    #[test]
    fn typed_values_round_trip_by_key() {
        let mut c = ctx();
        c.set("count", 3u32);
        assert_eq!(c.get::<u32>("count"), Some(&3));
        assert_eq!(c.get::<String>("count"), None);
        *c.get_mut::<u32>("count").unwrap() += 1;
        assert_eq!(c.must_get::<u32>("count").unwrap(), &4);
        assert!(matches!(c.must_get::<u32>("other"), Err(AppError::MissingContext(_))));
    }

    #[test]
    fn take_leaves_mistyped_values_alone() {
        let mut c = ctx();
        c.set("name", String::from("dune"));
        assert_eq!(c.take::<u32>("name"), None);
        assert!(c.contains("name"));
        assert_eq!(c.take::<String>("name").as_deref(), Some("dune"));
        assert!(!c.contains("name"));
        assert!(!c.remove("name"));
    }

    #[test]
    fn serializable_values_have_a_json_form() {
        let mut c = ctx();
        c.set("title", String::from("dune"));
        c.set("nothing", ());
        assert_eq!(c.json("title").unwrap().unwrap(), Value::String("dune".into()));
        assert_eq!(c.json("nothing").unwrap().unwrap(), Value::Null);
        assert!(c.json("absent").is_none());
    }

    #[test]
    fn opaque_values_have_no_json_form() {
        struct Handle;
        let mut c = ctx();
        c.set_opaque("handle", Handle);
        assert!(c.get::<Handle>("handle").is_some());
        assert!(matches!(c.json("handle"), Some(Err(AppError::Internal(_)))));
    }

    #[test]
    fn abort_records_errors_in_order() {
        let mut c = ctx();
        assert!(!c.is_aborted());
        c.abort_with(AppError::NotFound("books/1".into()));
        c.abort_with_error(AppError::BadRequest("late".into()), StatusCode::CONFLICT);
        assert!(c.is_aborted());
        assert!(c.errors_exist());
        assert_eq!(c.errors()[0].status, StatusCode::NOT_FOUND);
        assert_eq!(c.errors()[1].status, StatusCode::CONFLICT);
    }

    #[test]
    fn plain_abort_has_no_errors() {
        let mut c = ctx();
        c.abort();
        assert!(c.is_aborted());
        assert!(!c.errors_exist());
        assert_eq!(c.id(), Some("1"));
    }
}
