//! HTTP request handlers.

use super::AppState;
use crate::scheduler::RefreshOutcome;
use crate::telemetry::{
    device_options, filter_logs, gauge_percent, network_signal, tier_label, Cell,
    DeviceOption, GatewayStatus, IrrigationAdvice, LogFilter, RawRow, SensorSnapshot, Severity,
    SignalDescriptor, SignalKind, TimeParser, Timestamp,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SignalView {
    pub kind: SignalKind,
    pub value: Cell,
    pub display: String,
    pub tier: u8,
    pub label: &'static str,
    pub severity: Severity,
}

impl From<&SignalDescriptor> for SignalView {
    fn from(signal: &SignalDescriptor) -> Self {
        let tier = signal.tier();
        Self {
            kind: signal.kind,
            value: signal.value.clone(),
            display: signal.to_string(),
            tier,
            label: tier_label(tier),
            severity: Severity::from_tier(tier),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SensorDetails {
    pub last_received: String,
    pub batch_upload: String,
    pub signal: SignalView,
}

#[derive(Debug, Serialize)]
pub struct SensorView {
    #[serde(flatten)]
    pub sensor: SensorSnapshot,
    pub advice: IrrigationAdvice,
    pub advice_message: &'static str,
    pub updated_ago: String,
    pub gauge_percent: f64,
    pub details: SensorDetails,
}

impl SensorView {
    fn new(sensor: &SensorSnapshot, time: &TimeParser, now: DateTime<Utc>) -> Self {
        let advice = IrrigationAdvice::from_level(sensor.current_level);
        let details = SensorDetails {
            last_received: time.format(time.parse_cell(&sensor.latest.received_time)),
            batch_upload: time.format(time.parse_cell(&sensor.latest.batch_upload_time)),
            signal: SignalView::from(&network_signal(&sensor.latest)),
        };

        Self {
            advice,
            advice_message: advice.message(),
            updated_ago: time.describe_age(sensor.last_updated, now),
            gauge_percent: gauge_percent(sensor.current_level),
            details,
            sensor: sensor.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GatewayView {
    pub network: String,
    pub sim_operator: String,
    pub wifi: SignalView,
    pub gsm: SignalView,
    pub sd_free: String,
    pub last_batch_upload: String,
    pub received_at: Timestamp,
}

impl GatewayView {
    fn new(status: &GatewayStatus, time: &TimeParser) -> Self {
        let sd_free = if status.sd_free_mb.is_empty() {
            "-".to_string()
        } else {
            format!("{} MB", status.sd_free_mb)
        };

        Self {
            network: status.network.clone(),
            sim_operator: status.sim_operator.clone(),
            wifi: SignalView::from(&status.wifi_signal),
            gsm: SignalView::from(&status.gsm_signal),
            sd_free,
            last_batch_upload: time.format(status.last_batch_upload),
            received_at: status.received_at,
        }
    }
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub sensors: Vec<SensorView>,
    pub gateway: Option<GatewayView>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub loading: bool,
    pub selected: Option<SensorView>,
}

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();
    let time = &state.options.time;
    let dashboard = state.dashboard.read().await;

    Json(DashboardResponse {
        sensors: dashboard
            .sensors
            .iter()
            .map(|s| SensorView::new(s, time, now))
            .collect(),
        gateway: dashboard.gateway.as_ref().map(|g| GatewayView::new(g, time)),
        last_refreshed: dashboard.last_refreshed,
        error: dashboard.error.clone(),
        loading: dashboard.loading,
        selected: dashboard
            .selected_sensor()
            .map(|s| SensorView::new(s, time, now)),
    })
}

// ============================================================================
// API: Sensors & Gateway
// ============================================================================

pub async fn handle_get_sensors(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();
    let dashboard = state.dashboard.read().await;

    let sensors: Vec<SensorView> = dashboard
        .sensors
        .iter()
        .map(|s| SensorView::new(s, &state.options.time, now))
        .collect();

    Json(sensors)
}

pub async fn handle_get_sensor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let now = state.clock.now();
    let dashboard = state.dashboard.read().await;

    match dashboard.sensor(&id) {
        Some(sensor) => Json(SensorView::new(sensor, &state.options.time, now)).into_response(),
        None => (StatusCode::NOT_FOUND, "Sensor not found").into_response(),
    }
}

pub async fn handle_get_gateway(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;

    match &dashboard.gateway {
        Some(gateway) => Json(GatewayView::new(gateway, &state.options.time)).into_response(),
        None => (StatusCode::NOT_FOUND, "No gateway data").into_response(),
    }
}

// ============================================================================
// API: Logs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub received: String,
    pub device_name: String,
    pub signal: SignalView,
    pub row: RawRow,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub device: String,
    pub records: usize,
    pub devices: Vec<DeviceOption>,
    pub logs: Vec<LogEntry>,
    pub error: Option<String>,
}

pub async fn handle_get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let filter = LogFilter::from_query(query.device.as_deref());
    let options = &state.options;
    let dashboard = state.dashboard.read().await;

    let logs: Vec<LogEntry> = filter_logs(&dashboard.logs, &filter)
        .into_iter()
        .map(|row| LogEntry {
            received: options.time.format(options.time.parse_cell(&row.received_time)),
            device_name: options.nicknames.resolve(&row.device_id()).to_string(),
            signal: SignalView::from(&network_signal(row)),
            row: row.clone(),
        })
        .collect();

    let device = match &filter {
        LogFilter::All => "All".to_string(),
        LogFilter::Device(id) => id.clone(),
    };

    Json(LogsResponse {
        device,
        records: logs.len(),
        devices: device_options(&dashboard.logs, &options.nicknames),
        logs,
        error: dashboard.error.clone(),
    })
}

// ============================================================================
// API: Refresh & Selection
// ============================================================================

pub async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.trigger.request().await;

    let status = match outcome {
        RefreshOutcome::Completed { .. } => StatusCode::OK,
        RefreshOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        RefreshOutcome::Skipped => StatusCode::CONFLICT,
    };

    (status, Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub id: String,
}

pub async fn handle_get_selection(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = state.dashboard.read().await;
    Json(SelectionResponse {
        id: dashboard.selected_id().map(str::to_string),
    })
}

pub async fn handle_put_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> impl IntoResponse {
    let mut dashboard = state.dashboard.write().await;

    if !dashboard.select(&req.id) {
        return (StatusCode::NOT_FOUND, "Sensor not found").into_response();
    }

    Json(SelectionResponse { id: Some(req.id) }).into_response()
}

pub async fn handle_delete_selection(State(state): State<AppState>) -> impl IntoResponse {
    state.dashboard.write().await.clear_selection();
    StatusCode::NO_CONTENT
}

pub async fn handle_health() -> impl IntoResponse {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::scheduler::{Clock, ManualClock, RefreshScheduler};
    use crate::source::SheetSource;
    use crate::telemetry::{aggregate, summarize, DeriveOptions};

    use axum::body::to_bytes;
    use axum::response::Response;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn rows() -> Vec<RawRow> {
        vec![
            RawRow {
                received_time: "2024-03-05 10:00:00".into(),
                device_id: "TX-01".into(),
                water_level: Cell::Number(3.0),
                status: "Low".into(),
                network: "GSM".into(),
                gsm_strength: Cell::Number(99.0),
                sd_free: Cell::Number(512.0),
                ..Default::default()
            },
            RawRow {
                received_time: "2024-03-05 10:30:00".into(),
                device_id: "TX-02".into(),
                water_level: Cell::Number(25.0),
                status: "Excess".into(),
                network: "WiFi".into(),
                wifi_strength: Cell::Number(-48.0),
                ..Default::default()
            },
        ]
    }

    async fn app_state() -> (AppState, Arc<RefreshScheduler<SheetSource>>) {
        let options = DeriveOptions {
            nicknames: [("TX-01", "North Plot")].into_iter().collect(),
            ..Default::default()
        };
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 10, 35, 0).unwrap()));
        let source = SheetSource::new("", Duration::from_secs(1)).unwrap();
        let scheduler = Arc::new(RefreshScheduler::new(
            source,
            options.clone(),
            Duration::from_secs(3600),
            clock.clone(),
        ));

        let rows = rows();
        let sensors = aggregate(&rows, &options);
        let gateway = summarize(&rows, &options.time);
        scheduler
            .dashboard()
            .write()
            .await
            .apply_snapshot(sensors, gateway, rows, clock.now());

        let state = AppState {
            config: ServerConfig::default(),
            options: Arc::new(options),
            dashboard: scheduler.dashboard(),
            trigger: scheduler.trigger(),
            clock,
        };
        (state, scheduler)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_views() {
        let (state, _scheduler) = app_state().await;
        let response = handle_dashboard(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let sensors = json["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0]["name"], "North Plot");
        assert_eq!(sensors[0]["advice"], "irrigate");
        assert_eq!(sensors[0]["updated_ago"], "35 mins ago");
        assert_eq!(sensors[0]["details"]["signal"]["tier"], 0);
        assert_eq!(sensors[1]["advice"], "stop_irrigating");

        assert_eq!(json["gateway"]["network"], "WiFi");
        assert_eq!(json["gateway"]["wifi"]["tier"], 4);
        assert!(json["selected"].is_null());
    }

    #[tokio::test]
    async fn test_get_sensor_and_missing_sensor() {
        let (state, _scheduler) = app_state().await;

        let response = handle_get_sensor(State(state.clone()), Path("TX-02".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["current_level"], 25.0);
        assert_eq!(json["status"], "Excess");

        let response = handle_get_sensor(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gateway_missing_when_no_rows() {
        let (state, _scheduler) = app_state().await;
        state
            .dashboard
            .write()
            .await
            .apply_snapshot(vec![], None, vec![], Utc::now());

        let response = handle_get_gateway(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logs_filtered_by_device() {
        let (state, _scheduler) = app_state().await;

        let query = LogsQuery {
            device: Some("TX-01".to_string()),
        };
        let response = handle_get_logs(State(state.clone()), Query(query))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["records"], 1);
        assert_eq!(json["logs"][0]["device_name"], "North Plot");
        assert_eq!(json["logs"][0]["received"], "05/03/2024, 10:00:00");
        assert_eq!(json["logs"][0]["row"]["Device ID"], "TX-01");
        assert_eq!(json["devices"].as_array().unwrap().len(), 2);

        let response = handle_get_logs(State(state), Query(LogsQuery { device: None }))
            .await
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["device"], "All");
        assert_eq!(json["records"], 2);
    }

    #[tokio::test]
    async fn test_selection_roundtrip() {
        let (state, _scheduler) = app_state().await;

        let response = handle_put_selection(
            State(state.clone()),
            Json(SelectionRequest { id: "TX-02".to_string() }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(handle_get_selection(State(state.clone())).await.into_response()).await;
        assert_eq!(json["id"], "TX-02");

        let response = handle_put_selection(
            State(state.clone()),
            Json(SelectionRequest { id: "missing".to_string() }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_delete_selection(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let json = body_json(handle_get_selection(State(state)).await.into_response()).await;
        assert!(json["id"].is_null());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let (state, scheduler) = app_state().await;
        scheduler.start().await;

        let response = handle_refresh(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["outcome"], "failed");

        // Data from the earlier snapshot is still served
        let dashboard = state.dashboard.read().await;
        assert_eq!(dashboard.sensors.len(), 2);
        assert!(dashboard.error.is_some());
        drop(dashboard);

        scheduler.stop().await;
    }
}
