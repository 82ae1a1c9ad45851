//! Error types and helpers for mapping errors to HTTP responses.
//!
//! The [`ApiError`] type carries both an HTTP status code and a message.
//! Use [`ResultExt`] to attach status codes to `anyhow::Error` chains,
//! or the [`client_bail!`] macro for early returns.

use crate::web::filters::json_response;
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::Response;

/// An error that is returned to clients as `{"error": "..."}`.
///
/// The `status` field determines the HTTP status code but is not serialized.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Reject for ApiError {}

impl ApiError {
    pub fn new(status: StatusCode, message: impl ToString) -> Self {
        ApiError {
            status,
            error: message.to_string(),
        }
    }

    /// Extracts the [`ApiError`] attached to an error chain.
    ///
    /// Errors without one become a 500 carrying the whole chain as message.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(api_error) => api_error.clone(),
            None => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)),
        }
    }

    /// Prepends a description of the failed operation: `"<prefix>: <message>"`.
    pub fn with_prefix(self, prefix: &str) -> Self {
        ApiError {
            error: format!("{}: {}", prefix, self.error),
            ..self
        }
    }

    pub fn into_response(self) -> Response {
        json_response(self.status, &self)
    }
}

/// Extension trait for attaching HTTP status codes to error results.
pub trait ResultExt<T> {
    /// Wraps the error with an [`ApiError`] carrying the given status code.
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error>;

    /// Convenience method for `with_status(StatusCode::BAD_REQUEST)`.
    fn mark_client_error(self) -> Result<T, anyhow::Error>;
}

impl<T, E: Into<anyhow::Error>> ResultExt<T> for Result<T, E> {
    fn with_status(self, status: StatusCode) -> Result<T, anyhow::Error> {
        self.map_err(|err| {
            let err = err.into();
            let message = format!("{:#}", err);
            err.context(ApiError {
                status,
                error: message,
            })
        })
    }

    fn mark_client_error(self) -> Result<T, anyhow::Error> {
        self.with_status(StatusCode::BAD_REQUEST)
    }
}

/// Early return with a 400 Bad Request error.
#[macro_export]
macro_rules! client_bail {
    ($err:expr $(,)?) => {
        return $crate::web::error::ResultExt::mark_client_error(Err::<_, ::anyhow::Error>(::anyhow::anyhow!($err)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return $crate::web::error::ResultExt::mark_client_error(Err::<_, ::anyhow::Error>(::anyhow::anyhow!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn failing_lookup() -> anyhow::Result<()> {
        Err(anyhow::anyhow!("No user with id {}", 7)).with_status(StatusCode::NOT_FOUND)
    }

    #[test]
    fn attached_status_is_recovered_from_the_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("boom"))
            .context("Failed to parse")
            .mark_client_error()
            .unwrap_err();

        let api_error = ApiError::from_error(&err);
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error, "Failed to parse: boom");
    }

    #[test]
    fn plain_errors_become_internal_errors() {
        let api_error = ApiError::from_error(&anyhow::anyhow!("database offline"));

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error, "database offline");
    }

    #[test]
    fn with_status_attaches_the_given_status() {
        let api_error = ApiError::from_error(&failing_lookup().unwrap_err());

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.error, "No user with id 7");
    }

    #[test]
    fn prefix_and_json_shape() {
        let api_error = ApiError::new(StatusCode::BAD_REQUEST, "missing field `id`")
            .with_prefix("Invalid request body");

        assert_eq!(
            serde_json::to_value(&api_error).unwrap(),
            serde_json::json!({"error": "Invalid request body: missing field `id`"})
        );
        assert_eq!(api_error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
