use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, Uri},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 64;

/// Per-request data shared with handlers through request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Reuse the caller's request id when it is sane, otherwise mint one, and
/// echo it back on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| is_acceptable_request_id(value))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn is_acceptable_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

/// Record response metrics and log every failed response with the error
/// report its handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let elapsed = start.elapsed();
    let status = response.status();

    counter!("quill_http_responses_total", "status" => status.as_u16().to_string()).increment(1);
    histogram!("quill_http_response_ms").record(elapsed.as_secs_f64() * 1000.0);

    if status.is_client_error() || status.is_server_error() {
        let failure = FailedResponse {
            status: status.as_u16(),
            method,
            uri,
            request_id,
            elapsed,
            report: response.extensions_mut().remove::<ErrorReport>(),
        };
        failure.log(status.is_server_error());
    }

    response
}

struct FailedResponse {
    status: u16,
    method: Method,
    uri: Uri,
    request_id: String,
    elapsed: Duration,
    report: Option<ErrorReport>,
}

impl FailedResponse {
    fn log(&self, server_error: bool) {
        let source = self.report.as_ref().map_or("unknown", |report| report.source);
        let chain: &[String] = self
            .report
            .as_ref()
            .map_or(&[], |report| report.messages.as_slice());
        let detail = chain.first().map_or("no diagnostic available", String::as_str);
        let elapsed_ms = self.elapsed.as_millis();

        if server_error {
            error!(
                target = "quill::http::response",
                status = self.status,
                method = %self.method,
                path = %self.uri.path(),
                elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                "request failed"
            );
        } else {
            warn!(
                target = "quill::http::response",
                status = self.status,
                method = %self.method,
                path = %self.uri.path(),
                elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                "request rejected"
            );
        }
    }
}
