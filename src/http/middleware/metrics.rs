//! Request metrics middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::metrics;

/// Count and time every request, labelled with the route template.
pub async fn track_requests(
    State(server): State<&'static str>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let id = request_id(&req).to_string();

    let response = next.run(req).await;
    let status = response.status().as_u16();

    tracing::debug!(
        request_id = %id,
        server,
        method = %method,
        path = %path,
        status,
        "Request completed"
    );
    metrics::record_request(server, &method, &path, status, start);
    response
}
