//! Middleware for resource routes.
//!
//! Every resource route runs the same fixed chain:
//!
//! 1. [`parse_request`] (create and update only) stores the JSON body under the request key;
//! 2. user middleware, in the order given;
//! 3. the operation handler, which stores its result under the response key.
//!
//! The chain stops at the first abort. Afterwards [`serialize_response`] writes the response
//! value and [`handle_errors`] replaces it with the first recorded error, if any.

use crate::context::RequestContext;
use crate::document::Document;
use crate::error::{error_response, AppError};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// A step in a resource's chain. Returning `Err` aborts the chain with the error's own status;
/// call [`RequestContext::abort_with_error`] directly to pick another one.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), AppError>;
}

#[async_trait]
impl<F> Middleware for F
where
    F: Fn(&mut RequestContext) -> Result<(), AppError> + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        (self)(ctx)
    }
}

/// Boxes a closure as middleware.
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&mut RequestContext) -> Result<(), AppError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs `chain` in order until one aborts.
pub async fn run_chain(ctx: &mut RequestContext, chain: &[Arc<dyn Middleware>]) {
    for mw in chain {
        if ctx.is_aborted() {
            return;
        }
        if let Err(e) = mw.handle(ctx).await {
            ctx.abort_with(e);
        }
    }
}

/// Parses the body as a `D` and stores it under `request_key`. Bad JSON aborts with 400.
pub fn parse_request<D: Document>(ctx: &mut RequestContext, request_key: &str, body: &Bytes) {
    match serde_json::from_slice::<D>(body) {
        Ok(doc) => ctx.set(request_key, doc),
        Err(e) => ctx.abort_with_error(AppError::BadRequest(e.to_string()), StatusCode::BAD_REQUEST),
    }
}

/// Writes the value under `response_key` as JSON with 200, or an empty 204 when there is
/// none or it serializes to null (e.g. `()`).
///
/// Returns `None` when errors were recorded, leaving the response to [`handle_errors`].
pub fn serialize_response(ctx: &mut RequestContext, response_key: &str) -> Option<Response> {
    if ctx.errors_exist() {
        return None;
    }
    match ctx.json(response_key) {
        None | Some(Ok(serde_json::Value::Null)) => Some(StatusCode::NO_CONTENT.into_response()),
        Some(Ok(value)) => Some((StatusCode::OK, Json(value)).into_response()),
        Some(Err(e)) => {
            ctx.abort_with(e);
            None
        }
    }
}

/// Turns the first recorded error into the response; otherwise passes `response` through.
pub fn handle_errors(ctx: &RequestContext, response: Option<Response>) -> Response {
    let Some(first) = ctx.errors().first() else {
        return response.unwrap_or_else(|| StatusCode::NO_CONTENT.into_response());
    };
    if first.status.is_server_error() {
        tracing::error!(
            method = %ctx.method(),
            uri = %ctx.uri(),
            error = %first.error,
            "internal error"
        );
    } else {
        tracing::debug!(status = first.status.as_u16(), error = %first.error, "request failed");
    }
    error_response(first.status, first.error.to_string())
}
