//! HTTP layer built on the Warp framework.
//!
//! Provides the request lifecycle middleware, error mapping, body validation and the server
//! bootstrap. Use [`server::run_webserver`] to serve a set of routes with graceful shutdown.

use bytesize::MB;

pub mod error;
pub mod filters;
pub mod middleware;
pub mod server;
pub mod validation;

/// Default limit for JSON request bodies (10 MB).
pub const DEFAULT_MAX_JSON_BODY_SIZE: u64 = 10 * MB;
