//! Dashboard state produced by refreshes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::telemetry::{GatewayStatus, RawRow, SensorSnapshot};

/// Dashboard state shared between the scheduler and the web handlers.
pub type SharedDashboard = Arc<RwLock<DashboardState>>;

/// Everything the dashboard shows, replaced wholesale on each refresh.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub sensors: Vec<SensorSnapshot>,
    pub gateway: Option<GatewayStatus>,
    pub logs: Vec<RawRow>,
    pub last_refreshed: Option<DateTime<Utc>>,
    /// User-facing message from the last failed refresh.
    pub error: Option<String>,
    pub loading: bool,
    selected: Option<String>,
}

impl DashboardState {
    pub fn begin_refresh(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Replace the data with a fresh derivation and re-resolve the selection.
    pub fn apply_snapshot(
        &mut self,
        sensors: Vec<SensorSnapshot>,
        gateway: Option<GatewayStatus>,
        logs: Vec<RawRow>,
        now: DateTime<Utc>,
    ) {
        self.sensors = sensors;
        self.gateway = gateway;
        self.logs = logs;
        self.last_refreshed = Some(now);
        self.error = None;
        self.loading = false;
        self.reconcile_selection();
    }

    /// Record a failed refresh. Previously fetched data stays visible.
    pub fn apply_error(&mut self, message: String) {
        self.error = Some(message);
        self.loading = false;
    }

    pub fn sensor(&self, id: &str) -> Option<&SensorSnapshot> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Select a sensor by id. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.sensor(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_sensor(&self) -> Option<&SensorSnapshot> {
        self.selected.as_deref().and_then(|id| self.sensor(id))
    }

    fn reconcile_selection(&mut self) {
        if let Some(id) = &self.selected {
            if self.sensor(id).is_none() {
                tracing::info!("Selected sensor {} no longer reported, clearing selection", id);
                self.selected = None;
            }
        }
    }
}
