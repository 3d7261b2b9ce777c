// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/`. Every handler validates its query
// parameters, pulls candles through the cached market feed and hands them to
// the stateless signal engine.
//
// CORS is configured permissively so the dashboard can be served from any
// origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::binance::WeightSnapshot;
use crate::error::ApiError;
use crate::futures_intel::FundingSnapshot;
use crate::indicators::{IndicatorKind, IndicatorSet};
use crate::market_data::{check_exchange, normalize_symbol, CandleKey};
use crate::signals::Signal;
use crate::types::Candle;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/ohlcv", get(ohlcv))
        .route("/api/indicators", get(indicators))
        .route("/api/signals", get(signals))
        .route("/api/funding", get(funding))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Deserialize)]
struct MarketParams {
    symbol: String,
    timeframe: Option<String>,
    limit: Option<u32>,
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndicatorParams {
    symbol: String,
    timeframe: Option<String>,
    limit: Option<u32>,
    exchange: Option<String>,
    /// Comma-separated: RSI,MACD
    indicators: Option<String>,
}

/// Validated request target.
struct Target {
    key: CandleKey,
    exchange: String,
}

fn resolve(
    state: &AppState,
    symbol: &str,
    timeframe: Option<&str>,
    limit: Option<u32>,
    exchange: Option<&str>,
) -> Result<Target, ApiError> {
    let cfg = &state.runtime_config;
    let exchange = exchange.unwrap_or("binance").trim().to_lowercase();
    check_exchange(&exchange)?;

    let key = CandleKey::new(
        symbol,
        timeframe.unwrap_or(&cfg.default_timeframe),
        limit.unwrap_or(cfg.default_limit),
        cfg.max_limit,
    )?;

    Ok(Target { key, exchange })
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: i64,
    cached_series: usize,
    binance_weight: WeightSnapshot,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
        cached_series: state.feed.ohlcv_cache.len(),
        binance_weight: state.feed.binance().weight_tracker().snapshot(),
    })
}

// =============================================================================
// OHLCV
// =============================================================================

#[derive(Serialize)]
struct OhlcvResponse<'a> {
    symbol: &'a str,
    timeframe: &'a str,
    exchange: &'a str,
    data: &'a [Candle],
}

async fn ohlcv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MarketParams>,
) -> Result<impl IntoResponse, ApiError> {
    let target = resolve(
        &state,
        &params.symbol,
        params.timeframe.as_deref(),
        params.limit,
        params.exchange.as_deref(),
    )?;
    let series = state.feed.ohlcv(&target.key).await?;

    let body = serde_json::to_value(OhlcvResponse {
        symbol: &target.key.symbol,
        timeframe: &target.key.interval,
        exchange: &target.exchange,
        data: series.candles(),
    })
    .map_err(anyhow::Error::from)?;

    Ok(Json(body))
}

// =============================================================================
// Indicators
// =============================================================================

#[derive(Serialize)]
struct IndicatorsResponse {
    symbol: String,
    timeframe: String,
    exchange: String,
    #[serde(flatten)]
    indicators: IndicatorSet,
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<IndicatorsResponse>, ApiError> {
    // Reject unknown indicator names before any fetch happens.
    let kinds = IndicatorKind::parse_list(params.indicators.as_deref().unwrap_or(""))?;
    let target = resolve(
        &state,
        &params.symbol,
        params.timeframe.as_deref(),
        params.limit,
        params.exchange.as_deref(),
    )?;

    let series = state.feed.ohlcv(&target.key).await?;
    let indicators = state.engine.indicators(&series, &kinds)?;

    Ok(Json(IndicatorsResponse {
        symbol: target.key.symbol,
        timeframe: target.key.interval,
        exchange: target.exchange,
        indicators,
    }))
}

// =============================================================================
// Signals
// =============================================================================

#[derive(Serialize)]
struct SignalMeta {
    limit: u32,
    exchange: String,
    funding_available: bool,
}

#[derive(Serialize)]
struct SignalResponse {
    symbol: String,
    timeframe: String,
    #[serde(flatten)]
    signal: Signal,
    meta: SignalMeta,
}

async fn signals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MarketParams>,
) -> Result<Json<SignalResponse>, ApiError> {
    let target = resolve(
        &state,
        &params.symbol,
        params.timeframe.as_deref(),
        params.limit,
        params.exchange.as_deref(),
    )?;

    let series = state.feed.ohlcv(&target.key).await?;

    // Funding is optional input: without it the funding rules are skipped.
    let funding_pct = match state.feed.funding(&target.key.symbol).await {
        Ok(snapshot) => Some(snapshot.rate_pct()),
        Err(e) => {
            warn!(symbol = %target.key.symbol, error = %e, "funding unavailable, classifying without it");
            None
        }
    };

    let signal = state.engine.signal(&series, funding_pct)?;

    info!(
        key = %target.key,
        action = %signal.action,
        rsi = signal.scores.rsi,
        "signal computed"
    );

    Ok(Json(SignalResponse {
        symbol: target.key.symbol,
        timeframe: target.key.interval,
        signal,
        meta: SignalMeta {
            limit: target.key.limit,
            exchange: target.exchange,
            funding_available: funding_pct.is_some(),
        },
    }))
}

// =============================================================================
// Funding
// =============================================================================

#[derive(Debug, Deserialize)]
struct FundingParams {
    symbol: String,
    exchange: Option<String>,
}

async fn funding(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FundingParams>,
) -> Result<Json<FundingSnapshot>, ApiError> {
    check_exchange(params.exchange.as_deref().unwrap_or("binance"))?;
    let symbol = normalize_symbol(&params.symbol)?;
    let snapshot = state.feed.funding(&symbol).await?;
    Ok(Json(snapshot))
}
