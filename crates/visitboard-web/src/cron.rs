//! Scheduled collection endpoint
//!
//! Hit by an external scheduler (GET) or by hand (POST). When a secret is
//! configured the request must carry `Authorization: Bearer <secret>`.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use subtle::ConstantTimeEq;
use visitboard_core::CollectionReport;

use crate::error::ApiError;
use crate::AppState;

/// Whether `headers` satisfy the configured secret
pub fn authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(secret.as_bytes())))
}

pub async fn collect_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CollectionReport>, ApiError> {
    if !authorized(&headers, state.cron_secret.as_deref()) {
        tracing::warn!("Rejected collection request with missing or wrong secret");
        return Err(ApiError::unauthorized());
    }

    tracing::info!(days = state.collect_days, "Collecting analytics");
    let report = state.service.collector(state.collect_days).collect().await;

    Ok(Json(report))
}
