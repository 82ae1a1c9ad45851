use crate::api::dto::{CheckLimitRequest, CheckLimitResponse};
use crate::api::{INVALID_REQUEST_BODY, invalid_request, succeeded, use_case_failed};
use crate::context::RequestContext;
use crate::logging::{LogField, Logger};
use crate::usecase::limit::LimitUseCase;
use crate::web::validation::bind_json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;

pub const FIELD_LIMIT_AVAILABLE: &str = "limit_available";

pub struct LimiterHandler {
    limit: Arc<dyn LimitUseCase>,
    logger: Logger,
}

/// Messages describing one limit operation.
struct Operation {
    started: &'static str,
    succeeded: &'static str,
    failed: &'static str,
}

const CHECK: Operation = Operation {
    started: "Checking limit",
    succeeded: "Limit checked successfully",
    failed: "Failed to fetch limit",
};

const RESET: Operation = Operation {
    started: "Resetting limit",
    succeeded: "Limit reset successfully",
    failed: "Failed to reset limit",
};

impl LimiterHandler {
    pub fn new(limit: Arc<dyn LimitUseCase>, logger: Logger) -> Self {
        LimiterHandler { limit, logger }
    }

    /// `POST /api/v1/limit/check`
    pub fn check_limit(&self, ctx: &RequestContext, body: &[u8]) -> Response {
        self.handle(ctx, body, &CHECK, |request| self.limit.check_limit(request))
    }

    /// `POST /api/v1/limit/reset`
    pub fn reset_limit(&self, ctx: &RequestContext, body: &[u8]) -> Response {
        self.handle(ctx, body, &RESET, |request| self.limit.reset_limit(request))
    }

    fn handle(
        &self,
        ctx: &RequestContext,
        body: &[u8],
        operation: &Operation,
        use_case: impl FnOnce(&CheckLimitRequest) -> anyhow::Result<CheckLimitResponse>,
    ) -> Response {
        self.logger.info(ctx, operation.started, []);

        let request: CheckLimitRequest = match bind_json(body) {
            Ok(request) => request,
            Err(err) => return invalid_request(&self.logger, ctx, INVALID_REQUEST_BODY, &err),
        };

        match use_case(&request) {
            Ok(response) => succeeded(
                &self.logger,
                ctx,
                operation.succeeded,
                request.user_id,
                StatusCode::OK,
                &response,
                [LogField::int(FIELD_LIMIT_AVAILABLE, response.limit_available)],
            ),
            Err(err) => use_case_failed(&self.logger, ctx, operation.failed, request.user_id, &err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CaptureSink, FieldValue, LogLevel};
    use crate::usecase::limit::LimitService;

    struct BrokenLimits;

    impl LimitUseCase for BrokenLimits {
        fn check_limit(&self, _request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse> {
            anyhow::bail!("quota backend unavailable")
        }

        fn reset_limit(&self, _request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse> {
            anyhow::bail!("quota backend unavailable")
        }
    }

    fn handler(limit: Arc<dyn LimitUseCase>) -> (LimiterHandler, CaptureSink) {
        let sink = CaptureSink::new();
        let logger = Logger::new("svc", LogLevel::Info, Arc::new(sink.clone()));
        (LimiterHandler::new(limit, logger), sink)
    }

    async fn body(res: Response) -> String {
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn check_without_store_reports_the_default() {
        let (handler, sink) = handler(Arc::new(LimitService::new(None)));

        let res = handler.check_limit(&RequestContext::background(), br#"{"userID":123}"#);

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, r#"{"userID":123,"limitAvailable":0}"#);
        let record = &sink.find("Limit checked successfully")[0];
        assert_eq!(record.field("limit_available").and_then(FieldValue::as_i64), Some(0));
    }

    #[tokio::test]
    async fn reset_uses_its_own_messages() {
        let (handler, sink) = handler(Arc::new(LimitService::new(None)));

        let res = handler.reset_limit(&RequestContext::background(), br#"{"userID":7}"#);

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(sink.messages(), vec!["Resetting limit", "Limit reset successfully"]);
    }

    #[tokio::test]
    async fn missing_user_id_is_a_client_error() {
        let (handler, _) = handler(Arc::new(LimitService::new(None)));

        let res = handler.check_limit(&RequestContext::background(), b"{}");

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body(res).await.contains("Invalid request body: missing field `userID`"));
    }

    #[tokio::test]
    async fn failures_are_server_errors() {
        let (handler, sink) = handler(Arc::new(BrokenLimits));

        let res = handler.check_limit(&RequestContext::background(), br#"{"userID":5}"#);

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(res).await,
            r#"{"error":"Failed to fetch limit: quota backend unavailable"}"#
        );
        assert_eq!(
            sink.find("Failed to fetch limit")[0]
                .field("user_id")
                .and_then(FieldValue::as_i64),
            Some(5)
        );
    }
}
