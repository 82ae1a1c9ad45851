//! A web service template with request correlation and structured logging.
//!
//! Every request passes the [lifecycle middleware](web::middleware), which assigns it a request
//! id and a trace id, logs its start and completion and echoes both ids on the response. The
//! ids travel with the [`RequestContext`](context::RequestContext) into handlers and use cases,
//! so each of their [log records](logging::Logger) can be joined to the request.
//!
//! At startup the [`Resolver`](resolver::Resolver) assembles the handlers. The Redis store is
//! optional: if it cannot be reached the service starts anyway and the use cases fall back to
//! their documented defaults.

pub mod api;
pub mod config;
pub mod context;
pub mod domain;
pub mod logging;
pub mod provider;
pub mod repo;
pub mod resolver;
pub mod router;
pub mod tools;
pub mod usecase;
pub mod web;
