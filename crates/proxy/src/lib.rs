//! # geoweave proxy
//!
//! A same-origin relay. Browsers cannot read capability documents or WFS
//! responses from servers that do not send CORS headers, so the workbench
//! asks this service instead:
//!
//! ```text
//! GET /api/proxy?url=<absolute http(s) url>
//! ```
//!
//! The upstream status, body and `content-type` are returned as they came.
//! Relay-side failures answer with a JSON `{error, details}` body: 400 for a
//! missing or unusable `url`, 502 when the upstream could not be reached.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use geoweave_cloud::HttpTransport;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Path the relay is mounted on.
pub const RELAY_PATH: &str = "/api/proxy";

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    pub url: Option<String>,
}

/// JSON body of a relay-side failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayError {
    pub error: String,
    pub details: String,
}

impl RelayError {
    fn respond(status: StatusCode, error: &str, details: impl Into<String>) -> Response {
        let body = RelayError {
            error: error.to_string(),
            details: details.into(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the relay router over any transport.
pub fn router<T>(transport: Arc<T>) -> Router
where
    T: HttpTransport + 'static,
{
    Router::new()
        .route(RELAY_PATH, get(relay::<T>))
        .with_state(transport)
}

/// Accept only absolute http(s) targets.
fn target_url(raw: Option<&str>) -> Result<Url, String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err("query parameter 'url' is required".to_string());
    };
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("scheme '{}' is not allowed", other)),
    }
}

async fn relay<T>(State(transport): State<Arc<T>>, Query(params): Query<RelayParams>) -> Response
where
    T: HttpTransport + 'static,
{
    let target = match target_url(params.url.as_deref()) {
        Ok(url) => url,
        Err(details) => {
            warn!(%details, "rejected relay request");
            return RelayError::respond(StatusCode::BAD_REQUEST, "Invalid target URL", details);
        }
    };

    match transport.get(target.as_str()).await {
        Ok(upstream) => {
            info!(url = %target, status = upstream.status, bytes = upstream.body.len(), "relayed");
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = upstream
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            (status, [(header::CONTENT_TYPE, content_type)], upstream.body).into_response()
        }
        Err(e) => {
            warn!(url = %target, error = %e, "upstream request failed");
            RelayError::respond(
                StatusCode::BAD_GATEWAY,
                "Upstream request failed",
                e.to_string(),
            )
        }
    }
}
