use crate::store::CandleStore;
use crate::views::DashboardTemplate;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};
use trustboard::dashboard::{filter_window, DashboardSummary};
use trustboard::data::{Candle, Source};

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 30;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CandleStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health_check))
        .route("/api/candles", get(candles))
        .route("/api/summary", get(summary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `?days=N&sources=coingecko,kraken`
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
    pub sources: Option<String>,
}

/// A validated dashboard window
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub days: u32,
    pub sources: Vec<Source>,
}

impl WindowQuery {
    /// Clamp `days` to 1..=30 and parse `sources`; empty means all sources
    pub fn window(&self) -> Result<Window, String> {
        let days = self
            .days
            .map(|d| d.clamp(1, i64::from(MAX_DAYS)) as u32)
            .unwrap_or(DEFAULT_DAYS);

        let mut sources = Vec::new();
        for name in self.sources.iter().flat_map(|s| s.split(',')) {
            if name.trim().is_empty() {
                continue;
            }
            let source: Source = name.parse()?;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        if sources.is_empty() {
            sources = Source::ALL.to_vec();
        }
        sources.sort();

        Ok(Window { days, sources })
    }
}

impl AppState {
    async fn load_window(&self, window: &Window, now: DateTime<Utc>) -> anyhow::Result<Vec<Candle>> {
        let since = now - Duration::days(i64::from(window.days));
        let candles = self.store.load_since(since).await?;
        let selected = filter_window(&candles, now, window.days, &window.sources);
        debug!("Window of {} days holds {} candles", window.days, selected.len());
        Ok(selected)
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn candles(State(state): State<AppState>, Query(query): Query<WindowQuery>) -> Response {
    let window = match query.window() {
        Ok(window) => window,
        Err(message) => return bad_request(message),
    };
    match state.load_window(&window, Utc::now()).await {
        Ok(candles) => Json(candles).into_response(),
        Err(e) => unavailable(e),
    }
}

async fn summary(State(state): State<AppState>, Query(query): Query<WindowQuery>) -> Response {
    let window = match query.window() {
        Ok(window) => window,
        Err(message) => return bad_request(message),
    };
    let now = Utc::now();
    match state.load_window(&window, now).await {
        Ok(candles) => match DashboardSummary::compute(&candles, now) {
            Some(summary) => Json(summary).into_response(),
            None => Json(json!({ "status": "no_data" })).into_response(),
        },
        Err(e) => unavailable(e),
    }
}

async fn dashboard(State(state): State<AppState>, Query(query): Query<WindowQuery>) -> Response {
    let window = match query.window() {
        Ok(window) => window,
        Err(message) => return bad_request(message),
    };
    let now = Utc::now();
    let page = match state.load_window(&window, now).await {
        Ok(candles) => {
            let summary = DashboardSummary::compute(&candles, now);
            DashboardTemplate::new(window.days, &window.sources, now, summary.as_ref())
        }
        Err(e) => {
            error!("Failed to read candles from {}: {:#}", state.store.describe(), e);
            DashboardTemplate::unavailable(window.days, &window.sources, now)
        }
    };

    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render dashboard").into_response()
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn unavailable(e: anyhow::Error) -> Response {
    error!("Failed to read candles: {:#}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "no_data", "error": "candle store unavailable" })),
    )
        .into_response()
}
