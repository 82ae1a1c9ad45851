use crate::api::dto::HealthResponse;
use crate::context::RequestContext;
use crate::logging::Logger;
use crate::web::filters::json_response;
use warp::http::StatusCode;
use warp::reply::Response;

/// Liveness endpoint. Answers as long as the process serves requests.
pub struct HealthHandler {
    service: String,
    logger: Logger,
}

impl HealthHandler {
    pub fn new(service: impl Into<String>, logger: Logger) -> Self {
        HealthHandler {
            service: service.into(),
            logger,
        }
    }

    pub fn check(&self, ctx: &RequestContext) -> Response {
        self.logger.debug(ctx, "Health check", []);

        json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "ok",
                service: self.service.clone(),
            },
        )
    }
}
