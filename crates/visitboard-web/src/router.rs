//! Web router using Axum

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use visitboard_core::analytics::{ComparePreset, Lookback, PeriodSpan};
use visitboard_core::models::parse_day;
use visitboard_core::service::{AggregatedResponse, CompareRequest, CompareResponse, HealthReport};
use visitboard_core::CoreError;

use crate::error::ApiError;
use crate::{cron, AppState};

/// Create the web router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/analytics/aggregated", get(aggregated_handler))
        .route("/api/analytics/compare", get(compare_handler))
        .route(
            "/api/cron/collect-analytics",
            get(cron::collect_handler).post(cron::collect_handler),
        )
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `?days=90&refresh=true`, kept as strings so bad input falls back instead of 400
#[derive(Debug, Default, Deserialize)]
pub struct AggregatedQuery {
    pub days: Option<String>,
    pub refresh: Option<String>,
}

impl AggregatedQuery {
    fn force_refresh(&self) -> bool {
        self.refresh
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

async fn aggregated_handler(
    State(state): State<AppState>,
    Query(query): Query<AggregatedQuery>,
) -> Json<AggregatedResponse> {
    let default_days = state.service.default_lookback().days();
    let lookback = Lookback::from_query(query.days.as_deref(), default_days);

    let response = state
        .service
        .aggregated(lookback, query.force_refresh())
        .await;

    tracing::debug!(
        days = lookback.days(),
        origin = %response.origin,
        weeks = response.data.weekly.len(),
        "Aggregated request served"
    );

    Json(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    pub preset: Option<String>,
    pub current_start: Option<String>,
    pub current_end: Option<String>,
    pub previous_start: Option<String>,
    pub previous_end: Option<String>,
}

impl CompareQuery {
    /// Preset if given; week when nothing is given; otherwise all four dates
    pub fn to_request(&self) -> Result<CompareRequest, ApiError> {
        if let Some(preset) = self.preset.as_deref().filter(|p| !p.is_empty()) {
            let preset: ComparePreset = preset.parse()?;
            return Ok(CompareRequest::Preset(preset));
        }

        if self.current_start.is_none() {
            return Ok(CompareRequest::Preset(ComparePreset::Week));
        }

        let (Some(cs), Some(ce), Some(ps), Some(pe)) = (
            self.current_start.as_deref(),
            self.current_end.as_deref(),
            self.previous_start.as_deref(),
            self.previous_end.as_deref(),
        ) else {
            return Err(ApiError::bad_request("Missing date parameters"));
        };

        let current = PeriodSpan::new(date_param(cs)?, date_param(ce)?)?;
        let previous = PeriodSpan::new(date_param(ps)?, date_param(pe)?)?;
        Ok(CompareRequest::Explicit { current, previous })
    }
}

fn date_param(value: &str) -> Result<chrono::NaiveDate, CoreError> {
    parse_day(value).ok_or_else(|| CoreError::InvalidDate {
        value: value.to_string(),
    })
}

async fn compare_handler(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareResponse>, ApiError> {
    let request = query.to_request()?;
    let response = state.service.compare(request).await?;
    Ok(Json(response))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}
