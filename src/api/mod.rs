//! HTTP handlers and their payloads.
//!
//! Handlers turn every outcome into a response: invalid input becomes a 400, a failing use case
//! a 500. Both are logged at error severity with the request context of the caller.

use crate::context::RequestContext;
use crate::logging::{FIELD_STATUS_CODE, FIELD_USER_ID, LogField, Logger};
use crate::web::error::ApiError;
use crate::web::filters::json_response;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;

pub mod dto;
pub mod health;
pub mod limiter;
pub mod user;

pub const INVALID_REQUEST_BODY: &str = "Invalid request body";

/// Logs and renders a request which failed to bind or validate.
fn invalid_request(
    logger: &Logger,
    ctx: &RequestContext,
    prefix: &str,
    err: &anyhow::Error,
) -> Response {
    let mut api_error = ApiError::from_error(err);
    api_error.status = StatusCode::BAD_REQUEST;

    logger.error(ctx, prefix, [LogField::error(&api_error.error)]);

    api_error.with_prefix(prefix).into_response()
}

/// Logs and renders a failed use case.
fn use_case_failed(
    logger: &Logger,
    ctx: &RequestContext,
    operation: &str,
    user_id: i64,
    err: &anyhow::Error,
) -> Response {
    logger.error(
        ctx,
        operation,
        [LogField::error(err), LogField::int(FIELD_USER_ID, user_id)],
    );

    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
        .with_prefix(operation)
        .into_response()
}

/// Logs the outcome of a successful operation and renders its result.
fn succeeded<S: Serialize>(
    logger: &Logger,
    ctx: &RequestContext,
    message: &str,
    user_id: i64,
    status: StatusCode,
    data: &S,
    extra_fields: impl IntoIterator<Item = LogField>,
) -> Response {
    logger.info(
        ctx,
        message,
        [
            LogField::int(FIELD_USER_ID, user_id),
            LogField::int(FIELD_STATUS_CODE, status.as_u16()),
        ]
        .into_iter()
        .chain(extra_fields),
    );

    json_response(status, data)
}
