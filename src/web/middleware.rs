//! Per-request middleware wrapped around the warp service.
//!
//! [`RequestLifecycle`] resolves the correlation ids of a request, makes them available to the
//! routes, logs the start and the completion of the request and echoes the ids on the response.
//! [`RequestDeadline`] answers requests which exceed the write timeout with a 503.

use crate::context::{CorrelationContext, RequestContext};
use crate::logging::{
    FIELD_DURATION, FIELD_IP, FIELD_METHOD, FIELD_PATH, FIELD_RESPONSE_SIZE, FIELD_STATUS_CODE,
    FIELD_USER_AGENT, LogField, Logger,
};
use crate::tools::watch::Watch;
use crate::web::error::ApiError;
use hyper::body::HttpBody;
use hyper::{Body, Request};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;
use tower::Service;
use tracing::{Instrument, Span, debug_span};
use warp::http::header::USER_AGENT;
use warp::http::{HeaderMap, StatusCode};
use warp::reply::Response;

/// Reported as status of requests whose client went away before a response was produced.
pub const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;

const HEADER_FORWARDED_FOR: &str = "x-forwarded-for";
const HEADER_REAL_IP: &str = "x-real-ip";

type BoxedResponseFuture = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

/// Wraps a service into the deadline and lifecycle middleware, outermost first.
pub fn with_lifecycle<S>(
    inner: S,
    logger: Logger,
    write_timeout: Duration,
    remote_addr: Option<SocketAddr>,
) -> RequestLifecycle<RequestDeadline<S>> {
    RequestLifecycle {
        inner: RequestDeadline {
            inner,
            timeout: write_timeout,
        },
        logger,
        remote_addr,
    }
}

/// The request lifecycle middleware. See the module docs.
#[derive(Clone)]
pub struct RequestLifecycle<S> {
    inner: S,
    logger: Logger,
    remote_addr: Option<SocketAddr>,
}

impl<S> Service<Request<Body>> for RequestLifecycle<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxedResponseFuture;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let watch = Watch::start();

        let correlation = CorrelationContext::resolve(req.headers());
        let ctx = RequestContext::for_request(correlation.clone());
        req.extensions_mut().insert(correlation.clone());

        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let ip = client_ip(req.headers(), self.remote_addr);
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        #[cfg_attr(not(feature = "open_telemetry"), allow(unused_mut))]
        let mut span = debug_span!(
            "http_request",
            http.method = %method,
            http.url = %path,
            http.status_code = tracing::field::Empty,
            request_id = %correlation.request_id(),
        );

        #[cfg(feature = "open_telemetry")]
        open_telemetry::extract_parent_context(req.headers(), &mut span);

        self.logger.info(
            &ctx,
            "Request started",
            [
                LogField::string(FIELD_METHOD, method.clone()),
                LogField::string(FIELD_PATH, path.clone()),
                LogField::string(FIELD_IP, ip),
                LogField::string(FIELD_USER_AGENT, user_agent),
            ],
        );

        // Logs on drop, so aborted requests are reported as well.
        let completion = CompletionLog {
            logger: self.logger.clone(),
            ctx,
            method,
            path,
            watch,
            status: None,
            response_size: 0,
        };

        let mut inner = self.inner.clone();
        let fut = async move {
            // Moves the whole guard into the future, not just the fields assigned below.
            let mut completion = completion;

            let mut response = inner.call(req).await?;
            correlation.apply(response.headers_mut());

            completion.status = Some(response.status());
            completion.response_size = response.body().size_hint().exact().unwrap_or(0);
            Span::current().record("http.status_code", response.status().as_u16() as i64);

            Ok(response)
        }
        .instrument(span);

        Box::pin(fut)
    }
}

struct CompletionLog {
    logger: Logger,
    ctx: RequestContext,
    method: String,
    path: String,
    watch: Watch,
    status: Option<StatusCode>,
    response_size: u64,
}

impl Drop for CompletionLog {
    fn drop(&mut self) {
        let status = self
            .status
            .map(|status| status.as_u16())
            .unwrap_or(STATUS_CLIENT_CLOSED_REQUEST);

        self.logger.info(
            &self.ctx,
            "Request completed",
            [
                LogField::string(FIELD_METHOD, std::mem::take(&mut self.method)),
                LogField::string(FIELD_PATH, std::mem::take(&mut self.path)),
                LogField::int(FIELD_STATUS_CODE, status),
                LogField::int(FIELD_DURATION, self.watch.elapsed_ms()),
                LogField::int(
                    FIELD_RESPONSE_SIZE,
                    i64::try_from(self.response_size).unwrap_or(i64::MAX),
                ),
            ],
        );
    }
}

/// Answers with `503 {"error":"Request timed out"}` once the timeout elapses.
#[derive(Clone)]
pub struct RequestDeadline<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<Request<Body>> for RequestDeadline<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxedResponseFuture;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let timeout = self.timeout;
        let fut = self.inner.call(req);

        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Request exceeded the deadline of {:?}", timeout);
                    Ok(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Request timed out")
                        .into_response())
                }
            }
        })
    }
}

/// Determines the client address: the first `X-Forwarded-For` entry, then `X-Real-IP`, then
/// the peer address of the connection.
pub fn client_ip(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header(HEADER_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| header(HEADER_REAL_IP))
        .map(str::to_string)
        .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

#[cfg(feature = "open_telemetry")]
mod open_telemetry {
    use opentelemetry::propagation::Extractor;
    use tracing::Span;
    use tracing_opentelemetry::OpenTelemetrySpanExt;
    use warp::http::HeaderMap;

    struct HeaderExtractor<'a> {
        headers: &'a HeaderMap,
    }

    impl Extractor for HeaderExtractor<'_> {
        fn get(&self, key: &str) -> Option<&str> {
            self.headers.get(key).and_then(|value| value.to_str().ok())
        }

        fn keys(&self) -> Vec<&str> {
            self.headers.keys().map(|header| header.as_str()).collect()
        }
    }

    /// Links the request span to the W3C trace context of the caller, if any.
    pub fn extract_parent_context(headers: &HeaderMap, span: &mut Span) {
        let extractor = HeaderExtractor { headers };
        let parent_cx =
            opentelemetry::global::get_text_map_propagator(|prop| prop.extract(&extractor));
        span.set_parent(parent_cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{HEADER_REQUEST_ID, HEADER_TRACE_ID};
    use crate::logging::{CaptureSink, FieldValue, LogLevel};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn logger() -> (Logger, CaptureSink) {
        let sink = CaptureSink::new();
        (Logger::new("svc", LogLevel::Info, Arc::new(sink.clone())), sink)
    }

    fn echo_request_id() -> impl Service<
        Request<Body>,
        Response = Response,
        Error = Infallible,
        Future: Send + 'static,
    > + Clone
    + Send
    + 'static {
        tower::service_fn(|req: Request<Body>| async move {
            let request_id = req
                .extensions()
                .get::<CorrelationContext>()
                .map(|correlation| correlation.request_id().to_string())
                .unwrap_or_default();
            Ok::<_, Infallible>(Response::new(Body::from(request_id)))
        })
    }

    fn field_str<'a>(record: &'a crate::logging::LogRecord, key: &str) -> &'a str {
        record.field(key).and_then(FieldValue::as_str).unwrap_or_default()
    }

    #[tokio::test]
    async fn ids_are_generated_and_echoed_on_the_response() {
        let (logger, _) = logger();
        let svc = with_lifecycle(echo_request_id(), logger, Duration::from_secs(5), None);

        let res = svc
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = |name: &str| res.headers().get(name).unwrap().to_str().unwrap().to_string();
        let request_id = header(HEADER_REQUEST_ID);
        let trace_id = header(HEADER_TRACE_ID);
        assert!(!request_id.is_empty());
        assert_ne!(request_id, trace_id);

        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(body, request_id.as_bytes());
    }

    #[tokio::test]
    async fn start_and_completion_records_share_ids() {
        let (logger, sink) = logger();
        let svc = with_lifecycle(echo_request_id(), logger, Duration::from_secs(5), None);

        let request = Request::post("/api/v1/user")
            .header("X-Request-ID", "abc-123")
            .header("User-Agent", "probe/1.0")
            .body(Body::empty())
            .unwrap();
        let res = svc.oneshot(request).await.unwrap();
        assert_eq!(res.headers().get(HEADER_REQUEST_ID).unwrap(), "abc-123");

        let started = &sink.find("Request started")[0];
        let completed = &sink.find("Request completed")[0];
        assert_eq!(field_str(started, "request-id"), "abc-123");
        assert_eq!(field_str(completed, "request-id"), "abc-123");
        assert_eq!(field_str(started, "trace-id"), field_str(completed, "trace-id"));
        assert_eq!(field_str(started, "method"), "POST");
        assert_eq!(field_str(started, "user_agent"), "probe/1.0");
        assert_eq!(
            completed.field_keys(),
            vec![
                "request-id",
                "trace-id",
                "method",
                "path",
                "status_code",
                "duration",
                "response_size"
            ]
        );
        assert_eq!(completed.field("status_code").and_then(FieldValue::as_i64), Some(200));
        assert_eq!(completed.field("response_size").and_then(FieldValue::as_i64), Some(7));
    }

    #[tokio::test]
    async fn completion_is_logged_after_the_handler_with_its_status() {
        let (logger, sink) = logger();
        let handler_logger = logger.clone();
        let created = tower::service_fn(move |_req: Request<Body>| {
            let logger = handler_logger.clone();
            async move {
                logger.info(&RequestContext::background(), "handler ran", []);
                let mut response = Response::new(Body::from("hello"));
                *response.status_mut() = StatusCode::CREATED;
                Ok::<_, Infallible>(response)
            }
        });
        let svc = with_lifecycle(created, logger, Duration::from_secs(5), None);

        let res = svc
            .oneshot(Request::post("/api/v1/user").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        assert_eq!(
            sink.messages(),
            vec!["Request started", "handler ran", "Request completed"]
        );
        let completed = &sink.find("Request completed")[0];
        assert_eq!(completed.field("status_code").and_then(FieldValue::as_i64), Some(201));
        assert_eq!(completed.field("response_size").and_then(FieldValue::as_i64), Some(5));
    }

    #[tokio::test]
    async fn slow_requests_are_cut_off() {
        let (logger, sink) = logger();
        let slow = tower::service_fn(|_req: Request<Body>| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let svc = with_lifecycle(slow, logger, Duration::from_millis(20), None);

        let res = svc
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(res.headers().contains_key(HEADER_TRACE_ID));
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Request timed out"}"#);

        let completed = &sink.find("Request completed")[0];
        assert_eq!(completed.field("status_code").and_then(FieldValue::as_i64), Some(503));
    }

    #[tokio::test]
    async fn abandoned_requests_are_still_logged() {
        let (logger, sink) = logger();
        let mut svc = with_lifecycle(echo_request_id(), logger, Duration::from_secs(5), None);

        let fut = svc.call(Request::get("/health").body(Body::empty()).unwrap());
        drop(fut);

        let completed = sink.find("Request completed");
        assert_eq!(completed.len(), 1);
        assert_eq!(
            completed[0].field("status_code").and_then(FieldValue::as_i64),
            Some(i64::from(STATUS_CLIENT_CLOSED_REQUEST))
        );
    }

    #[test]
    fn client_ip_prefers_forwarding_headers() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.1");
        assert_eq!(client_ip(&headers, None), "");

        headers.insert(HEADER_REAL_IP, "192.168.0.7".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.0.7");

        headers.insert(HEADER_FORWARDED_FOR, "203.0.113.9, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");
    }
}
