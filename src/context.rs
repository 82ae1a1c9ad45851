//! Request correlation.
//!
//! Every inbound request is assigned a [`CorrelationContext`]: a request id and a trace id,
//! each taken from its inbound header when present or freshly generated otherwise. Both are
//! echoed on the response. Downstream code receives the ids through an explicit
//! [`RequestContext`] argument.

use crate::tools::id_generator::correlation_id;
use warp::http::{HeaderMap, HeaderValue};

pub const HEADER_REQUEST_ID: &str = "x-request-id";
pub const HEADER_TRACE_ID: &str = "x-trace-id";

/// The correlation ids of a single request. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationContext {
    request_id: String,
    trace_id: String,
}

impl CorrelationContext {
    pub fn new(request_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        CorrelationContext {
            request_id: request_id.into(),
            trace_id: trace_id.into(),
        }
    }

    /// Derives the ids of a request from its headers.
    ///
    /// Each id is resolved independently. Inherited values are accepted verbatim as long as
    /// they are non-empty; a value which is not visible ASCII counts as absent.
    pub fn resolve(headers: &HeaderMap) -> Self {
        CorrelationContext {
            request_id: header_or_generate(headers, HEADER_REQUEST_ID),
            trace_id: header_or_generate(headers, HEADER_TRACE_ID),
        }
    }

    /// Writes both ids onto the given (response) headers, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in [
            (HEADER_REQUEST_ID, &self.request_id),
            (HEADER_TRACE_ID, &self.trace_id),
        ] {
            // Values either came from a valid header or from the id alphabet.
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

fn header_or_generate(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(correlation_id)
}

/// The request-scoped carrier handed to every handler, use case and log call.
///
/// Code running outside of a request uses [`RequestContext::background`], which yields no
/// correlation fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    correlation: Option<CorrelationContext>,
}

impl RequestContext {
    pub fn background() -> Self {
        RequestContext { correlation: None }
    }

    pub fn for_request(correlation: CorrelationContext) -> Self {
        RequestContext {
            correlation: Some(correlation),
        }
    }

    pub fn correlation(&self) -> Option<&CorrelationContext> {
        self.correlation.as_ref()
    }
}

impl From<Option<CorrelationContext>> for RequestContext {
    fn from(correlation: Option<CorrelationContext>) -> Self {
        RequestContext { correlation }
    }
}
