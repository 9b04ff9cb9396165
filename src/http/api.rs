//! Public HTTP API.
//!
//! Link shortening routes are not served yet; the only route is a
//! diagnostic that reads the database clock.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::http::middleware::track_requests;
use crate::http::request::with_request_id;
use crate::http::server::HttpServer;
use crate::service::{Service, ServiceBuilder, ServiceDependencies};
use crate::BoxError;

pub const WORKER_NAME: &str = "web";

#[derive(Clone)]
pub struct ApiState {
    pub db: Option<PgPool>,
}

#[derive(Debug, Deserialize)]
pub struct NowRequest {
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NowResponse {
    pub now: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error(code: StatusCode, message: impl Into<String>) -> Response {
    (
        code,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn router(state: ApiState) -> Router {
    let routes = Router::new()
        .route("/now", post(now))
        .route_layer(middleware::from_fn_with_state(WORKER_NAME, track_requests))
        .with_state(state);
    with_request_id(routes)
}

async fn now(State(state): State<ApiState>, Json(req): Json<NowRequest>) -> Response {
    if req.secret.as_deref().map_or(true, str::is_empty) {
        return error(StatusCode::BAD_REQUEST, "secret is required");
    }

    let Some(db) = state.db else {
        return error(StatusCode::SERVICE_UNAVAILABLE, "database is not configured");
    };

    match sqlx::query_scalar::<_, String>("SELECT now()::text")
        .fetch_one(&db)
        .await
    {
        Ok(now) => Json(NowResponse { now }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database clock query failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "database query failed")
        }
    }
}

/// Builds the `web` worker; absent when `web.enabled` is false.
pub struct WebBuilder;

impl ServiceBuilder for WebBuilder {
    fn name(&self) -> &'static str {
        WORKER_NAME
    }

    fn build(&self, deps: &ServiceDependencies) -> Result<Option<Arc<dyn Service>>, BoxError> {
        let config = &deps.config.web;
        if !config.enabled {
            return Ok(None);
        }

        let state = ApiState {
            db: deps.db.clone(),
        };
        let server = HttpServer::new(
            WORKER_NAME,
            config.bind_address(),
            router(state),
            config.timeouts,
        );
        Ok(Some(Arc::new(server)))
    }
}
