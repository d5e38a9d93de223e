use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::{BodyExt, Limited};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies at or above this size are not echoed into the log.
const MAX_LOGGED_BODY: usize = 1024;

/// Tag every request with a trace ID (taken from `x-trace-id` when it parses
/// as a UUID) and log request/response lines inside an `http_request` span.
///
/// Small JSON bodies are buffered and logged at `debug`; everything else,
/// multipart uploads included, streams through untouched.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("request started");

        let (parts, body) = req.into_parts();
        let body = log_json_body("request", &parts.headers, body).await;
        let mut req = Request::from_parts(parts, body);
        if let Some(value) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let body = log_json_body("response", &parts.headers, body).await;
        let mut response = Response::from_parts(parts, body);
        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "response finished"
        );

        response
    }
    .instrument(span)
    .await
}

async fn log_json_body(direction: &'static str, headers: &HeaderMap, body: Body) -> Body {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.contains("application/json") {
        debug!(direction, content_type, "body not logged");
        return body;
    }

    // Only bodies of a known, small size are buffered; anything else streams
    // through so the route's own body limit still applies.
    let size = HttpBody::size_hint(&body).exact();
    if !size.is_some_and(|len| (len as usize) < MAX_LOGGED_BODY) {
        debug!(direction, size, "json body skipped");
        return body;
    }

    let bytes = match Limited::new(body, MAX_LOGGED_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(direction, error = %e, "failed to buffer body");
            return Body::empty();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => debug!(direction, body = text, "logged json body"),
        Err(_) => debug!(direction, size = bytes.len(), "json body skipped"),
    }

    Body::from(bytes)
}
