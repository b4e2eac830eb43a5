use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;

use crate::response::ErrorBody;

const MAX_CLIENT_ID_LEN: usize = 128;

/// Tags every request with an id (client-supplied or freshly minted), logs
/// one completion line inside the id's span, echoes the id back in the
/// `x-request-id` header, and stamps it into error bodies as `traceId`.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let trace_id = incoming_id(&req).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = tracing::info_span!("request", request_id = %trace_id);

    let mut response = {
        let _guard = span.enter();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let started = std::time::Instant::now();
        let response = next.run(req).await;

        tracing::info!(
            %method,
            path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response
    };

    if let Ok(value) = trace_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        stamp_error_body(response, &trace_id).await
    } else {
        response
    }
}

/// Client ids are accepted as-is up to 128 chars of alphanumerics, hyphens
/// and underscores; anything else is replaced with a fresh UUID.
fn incoming_id(req: &Request) -> Option<String> {
    let raw = req.headers().get("x-request-id")?.to_str().ok()?;
    let usable = !raw.is_empty()
        && raw.len() <= MAX_CLIENT_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    usable.then(|| raw.to_string())
}

/// Every error leaves with a JSON body carrying `traceId`. JSON bodies get
/// the field injected in place; plain-text errors (axum's own rejections,
/// the body-size limit) are rebuilt as an `ErrorBody`.
async fn stamp_error_body(response: Response, trace_id: &str) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    if is_json {
        if let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            if let Some(map) = value.as_object_mut() {
                map.insert(
                    "traceId".to_string(),
                    serde_json::Value::String(trace_id.to_string()),
                );
            }
            let patched = serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            return Response::from_parts(parts, Body::from(patched));
        }
        return Response::from_parts(parts, Body::from(bytes));
    }

    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        text
    };

    (
        status,
        axum::Json(ErrorBody {
            success: false,
            code: code_for(status).to_string(),
            message,
            trace_id: Some(trace_id.to_string()),
        }),
    )
        .into_response()
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "AUTH_UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::TOO_MANY_REQUESTS => "RATE_LIMITED",
        _ => "INTERNAL_ERROR",
    }
}
