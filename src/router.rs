//! The route table of the service.

use crate::api::health::HealthHandler;
use crate::api::limiter::LimiterHandler;
use crate::api::user::UserHandler;
use crate::context::{HEADER_REQUEST_ID, HEADER_TRACE_ID, RequestContext};
use crate::logging::Logger;
use crate::resolver::ServerContext;
use crate::routes;
use crate::web::DEFAULT_MAX_JSON_BODY_SIZE;
use crate::web::filters::{
    handle_rejection, into_response, with_body, with_cloneable, with_request_context,
};
use bytes::Bytes;
use std::sync::Arc;
use warp::Filter;
use warp::filters::BoxedFilter;
use warp::reply::Response;

const CORS_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "OPTIONS"];
const CORS_HEADERS: [&str; 5] = [
    "content-type",
    "authorization",
    "x-requested-with",
    HEADER_REQUEST_ID,
    HEADER_TRACE_ID,
];

/// Binds the handlers to their routes.
///
/// | Method | Path | Handler |
/// |--------|------|---------|
/// | GET | `/health` | [`HealthHandler::check`] |
/// | POST | `/api/v1/limit/check` | [`LimiterHandler::check_limit`] |
/// | POST | `/api/v1/limit/reset` | [`LimiterHandler::reset_limit`] |
/// | POST | `/api/v1/user` | [`UserHandler::create_user`] |
/// | GET | `/api/v1/user/{id}` | [`UserHandler::fetch_user`] |
pub fn routes(
    server_context: &ServerContext,
    app_name: &str,
    logger: &Logger,
) -> BoxedFilter<(Response,)> {
    let health = Arc::new(HealthHandler::new(app_name, logger.clone()));
    let limiter = server_context.limiter_handler.clone();
    let users = server_context.user_handler.clone();

    let health_check = warp::path!("health")
        .and(warp::get())
        .and(with_request_context())
        .and(with_cloneable(health))
        .map(|ctx: RequestContext, handler: Arc<HealthHandler>| handler.check(&ctx));

    let check_limit = warp::path!("api" / "v1" / "limit" / "check")
        .and(warp::post())
        .and(with_request_context())
        .and(with_body(DEFAULT_MAX_JSON_BODY_SIZE))
        .and(with_cloneable(limiter.clone()))
        .map(
            |ctx: RequestContext, body: Bytes, handler: Arc<LimiterHandler>| {
                handler.check_limit(&ctx, &body)
            },
        );

    let reset_limit = warp::path!("api" / "v1" / "limit" / "reset")
        .and(warp::post())
        .and(with_request_context())
        .and(with_body(DEFAULT_MAX_JSON_BODY_SIZE))
        .and(with_cloneable(limiter))
        .map(
            |ctx: RequestContext, body: Bytes, handler: Arc<LimiterHandler>| {
                handler.reset_limit(&ctx, &body)
            },
        );

    let create_user = warp::path!("api" / "v1" / "user")
        .and(warp::post())
        .and(with_request_context())
        .and(with_body(DEFAULT_MAX_JSON_BODY_SIZE))
        .and(with_cloneable(users.clone()))
        .map(
            |ctx: RequestContext, body: Bytes, handler: Arc<UserHandler>| {
                handler.create_user(&ctx, &body)
            },
        );

    let fetch_user = warp::path!("api" / "v1" / "user" / String)
        .and(warp::get())
        .and(with_request_context())
        .and(with_cloneable(users))
        .map(
            |id: String, ctx: RequestContext, handler: Arc<UserHandler>| {
                handler.fetch_user(&ctx, &id)
            },
        );

    routes![health_check, check_limit, reset_limit, create_user, fetch_user]
        .recover(handle_rejection)
        .with(cors())
        .map(|reply| into_response(reply))
        .boxed()
}

fn cors() -> warp::cors::Cors {
    warp::cors()
        .allow_any_origin()
        .allow_credentials(true)
        .allow_methods(CORS_METHODS)
        .allow_headers(CORS_HEADERS)
        .build()
}
