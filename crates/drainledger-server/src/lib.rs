//! HTTP attribution server.
//!
//! Serves the drain ledger as a small JSON API. Each query triggers a
//! refresh over a cached on-disk snapshot, so a burst of requests reads one
//! coherent capture until a client explicitly invalidates it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use drainledger_core::{
    AccountingPeriod, CachedProvider, DrainEngine, EngineConfig, EngineError, EngineState,
    JsonFileProvider, Ledger, PowerProfile, RefreshRequest, SnapshotProvider, Uid, UserFilter,
    UserId,
};

/// The engine configuration every served deployment uses: a cached
/// file-backed snapshot source.
pub type ServerEngine = DrainEngine<CachedProvider<JsonFileProvider>>;

/// Build the served engine over a snapshot file and a coefficient profile.
pub fn server_engine(
    profile: PowerProfile,
    snapshot_path: impl Into<PathBuf>,
    config: EngineConfig,
) -> ServerEngine {
    DrainEngine::with_config(
        profile,
        CachedProvider::new(JsonFileProvider::new(snapshot_path)),
        config,
    )
}

/// Shared server state. The engine is not reentrant; handlers serialize
/// their refreshes on the mutex.
struct AppState {
    engine: Mutex<ServerEngine>,
}

#[derive(Deserialize)]
struct LedgerParams {
    /// Accounting period: boot, unplugged, charged (default).
    period: Option<String>,
    /// Comma-separated numeric user ids, or "all".
    users: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

fn engine_failure(err: EngineError) -> ApiError {
    warn!("refresh failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: err.to_string() }),
    )
}

fn parse_request(params: &LedgerParams) -> Result<RefreshRequest, String> {
    let period = match &params.period {
        Some(raw) => raw.parse::<AccountingPeriod>()?,
        None => AccountingPeriod::default(),
    };
    let user_filter = match params.users.as_deref() {
        None => UserFilter::default(),
        Some("all") => UserFilter::All,
        Some(raw) => {
            let mut users = BTreeSet::new();
            for part in raw.split(',') {
                let part = part.trim();
                let id: u32 = part
                    .parse()
                    .map_err(|_| format!("invalid user id: {part}"))?;
                users.insert(UserId(id));
            }
            UserFilter::Only(users)
        }
    };
    Ok(RefreshRequest {
        period,
        user_filter,
        anchors: None,
    })
}

#[derive(Serialize)]
struct SummaryResponse {
    period: AccountingPeriod,
    consumers: usize,
    total_power_mah: f64,
    computed_power_mah: f64,
    max_power_mah: f64,
    max_real_power_mah: f64,
    min_drained_power_mah: f64,
    max_drained_power_mah: f64,
    stats_period_us: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_time_remaining_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    charge_time_remaining_us: Option<u64>,
}

impl SummaryResponse {
    fn from_ledger(ledger: &Ledger) -> Self {
        SummaryResponse {
            period: ledger.period,
            consumers: ledger.consumers.len(),
            total_power_mah: ledger.total_power_mah,
            computed_power_mah: ledger.computed_power_mah,
            max_power_mah: ledger.max_power_mah,
            max_real_power_mah: ledger.max_real_power_mah,
            min_drained_power_mah: ledger.min_drained_power_mah,
            max_drained_power_mah: ledger.max_drained_power_mah,
            stats_period_us: ledger.stats_period_us(),
            battery_time_remaining_us: ledger.battery_time_remaining_us(),
            charge_time_remaining_us: ledger.charge_time_remaining_us(),
        }
    }
}

#[derive(Serialize)]
struct SignalingEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<Uid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    mobile_ms_per_packet: f64,
    mobile_active_time_ms: u64,
    rx_packets: u64,
    tx_packets: u64,
    mobile_radio_power_mah: f64,
}

#[derive(Serialize)]
struct SignalingResponse {
    period: AccountingPeriod,
    entries: Vec<SignalingEntry>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    engine_state: String,
    snapshot_available: bool,
    consumers: usize,
}

async fn handle_ledger(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LedgerParams>,
) -> Result<Json<Ledger>, ApiError> {
    let request = parse_request(&params).map_err(bad_request)?;
    let mut engine = state.engine.lock().await;
    let ledger = engine.refresh(&request).map_err(engine_failure)?;
    Ok(Json(ledger.clone()))
}

async fn handle_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LedgerParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let request = parse_request(&params).map_err(bad_request)?;
    let mut engine = state.engine.lock().await;
    let ledger = engine.refresh(&request).map_err(engine_failure)?;
    Ok(Json(SummaryResponse::from_ledger(ledger)))
}

async fn handle_signaling(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LedgerParams>,
) -> Result<Json<SignalingResponse>, ApiError> {
    let request = parse_request(&params).map_err(bad_request)?;
    let mut engine = state.engine.lock().await;
    let ledger = engine.refresh(&request).map_err(engine_failure)?;
    let entries = ledger
        .signaling
        .iter()
        .map(|record| SignalingEntry {
            uid: record.uid,
            label: record.label.clone(),
            mobile_ms_per_packet: record.mobile_ms_per_packet.unwrap_or(0.0),
            mobile_active_time_ms: record.mobile_active_time_ms,
            rx_packets: record.mobile_rx_packets,
            tx_packets: record.mobile_tx_packets,
            mobile_radio_power_mah: record.mobile_radio_power_mah,
        })
        .collect();
    Ok(Json(SignalingResponse {
        period: ledger.period,
        entries,
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut engine = state.engine.lock().await;
    let snapshot_available = engine.provider_mut().latest().is_some();
    let engine_state = match engine.state() {
        EngineState::Idle => "idle",
        EngineState::Published => "published",
    };
    Json(HealthResponse {
        status: if snapshot_available { "ready" } else { "no_data" }.to_string(),
        engine_state: engine_state.to_string(),
        snapshot_available,
        consumers: engine.ledger().consumers.len(),
    })
}

async fn handle_invalidate(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut engine = state.engine.lock().await;
    engine.provider_mut().invalidate();
    Json(serde_json::json!({ "invalidated": true }))
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "drainledger server",
        "version": drainledger_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/api/ledger": {
                "method": "GET",
                "description": "Refresh and return the full attribution ledger",
                "params": {
                    "period": "Accounting period: boot, unplugged, charged (default)",
                    "users": "Comma-separated user ids to rank individually, or \"all\"",
                }
            },
            "/api/summary": "Reconciliation scalars without consumer bodies",
            "/api/signaling": "Applications ranked by mobile signaling overhead",
            "/api/health": "Engine state and snapshot availability",
            "/api/invalidate": "POST: drop the cached snapshot; next refresh re-reads the source",
        },
        "examples": {
            "ledger": "/api/ledger?period=unplugged",
            "foreign_users": "/api/ledger?users=0,10",
            "summary": "/api/summary",
        }
    }))
}

/// Build the axum router.
fn build_router(engine: ServerEngine) -> Router {
    let state = Arc::new(AppState {
        engine: Mutex::new(engine),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/api/ledger", get(handle_ledger))
        .route("/api/summary", get(handle_summary))
        .route("/api/signaling", get(handle_signaling))
        .route("/api/health", get(handle_health))
        .route("/api/invalidate", post(handle_invalidate))
        .with_state(state)
}

/// Run the HTTP attribution server.
pub async fn run_server(engine: ServerEngine, host: &str, port: u16) {
    let app = build_router(engine);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(period: Option<&str>, users: Option<&str>) -> LedgerParams {
        LedgerParams {
            period: period.map(String::from),
            users: users.map(String::from),
        }
    }

    #[test]
    fn default_params_request_the_default_scope() {
        let request = parse_request(&params(None, None)).unwrap();
        assert_eq!(request.period, AccountingPeriod::SinceCharged);
        assert_eq!(request.user_filter, UserFilter::default());
    }

    #[test]
    fn period_and_users_parse_into_the_request() {
        let request = parse_request(&params(Some("unplugged"), Some("0, 10"))).unwrap();
        assert_eq!(request.period, AccountingPeriod::SinceUnplugged);
        assert!(request.user_filter.includes(UserId(10)));
        assert!(!request.user_filter.includes(UserId(11)));

        let request = parse_request(&params(None, Some("all"))).unwrap();
        assert_eq!(request.user_filter, UserFilter::All);
    }

    #[test]
    fn malformed_params_are_rejected() {
        assert!(parse_request(&params(Some("daily"), None)).is_err());
        assert!(parse_request(&params(None, Some("zero"))).is_err());
    }
}
