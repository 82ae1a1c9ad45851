//! Reusable warp filters and reply helpers.

use crate::context::{CorrelationContext, RequestContext};
use crate::web::error::ApiError;
use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use std::convert::Infallible;
use warp::http::header::CONTENT_TYPE;
use warp::http::{HeaderValue, StatusCode};
use warp::reject::{LengthRequired, PayloadTooLarge};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

pub fn with_cloneable<C: Clone + Send>(
    value: C,
) -> impl Filter<Extract = (C,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// Provides the [`RequestContext`] of the current request.
///
/// Requests which did not pass the lifecycle middleware get a background context.
pub fn with_request_context() -> impl Filter<Extract = (RequestContext,), Error = Infallible> + Clone
{
    warp::ext::optional::<CorrelationContext>().map(RequestContext::from)
}

/// Provides the raw request body, which must declare its length and stay within the limit.
pub fn with_body(max_body_size: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(max_body_size).and(warp::body::bytes())
}

/// Serializes `data` as JSON with the given status.
///
/// A serialization failure yields a 500 instead.
pub fn json_response<S: Serialize>(status: StatusCode, data: &S) -> Response {
    match serde_json::to_vec(data).context("Failed to serialize data") {
        Ok(data) => {
            let mut res = Response::new(data.into());
            *res.status_mut() = status;
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            res
        }
        Err(err) => {
            let body = serde_json::json!({ "error": format!("{:#}", err) }).to_string();
            let mut res = Response::new(body.into());
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            res
        }
    }
}

/// Renders rejections which clients can act upon as `{"error": "..."}`.
///
/// Everything else (unknown path, wrong method) keeps warp's default response.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        Ok(api_error.clone().into_response())
    } else if err.find::<PayloadTooLarge>().is_some() {
        Ok(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "The given request data is too large",
        )
        .into_response())
    } else if err.find::<LengthRequired>().is_some() {
        Ok(ApiError::new(StatusCode::LENGTH_REQUIRED, "A content-length header is required")
            .into_response())
    } else {
        Err(err)
    }
}

/// Combines the given filters via [`Filter::or`], left to right.
#[macro_export]
macro_rules! routes {
    [$route:expr] => {
        $route
    };
    [$route:expr, $($rest:expr),+] => {
        warp::Filter::or($route, routes![$($rest),+])
    };
}

/// Turns any reply into a plain [`Response`].
pub fn into_response(reply: impl Reply) -> Response {
    reply.into_response()
}
