//! Telemetry model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::signal::SignalKind;

/// A single spreadsheet cell.
///
/// The sheet is untyped: the same column may deliver numbers, text or
/// nothing at all depending on the row. Any other JSON shape is kept as
/// its textual form so that no row is rejected for a single odd cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            Value::String(s) => Cell::Text(s),
            Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => Value::Null,
            Cell::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl Cell {
    /// True for null cells and for text that is blank.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    /// Decimal value of the cell, or NaN when it holds no number.
    pub fn to_number(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            Cell::Empty => f64::NAN,
        }
    }

    /// Leading signed integer of the cell.
    ///
    /// Numbers are truncated toward zero; text yields its integer prefix,
    /// so `"-67 dBm"` reads as `-67`.
    pub fn leading_integer(&self) -> Option<i64> {
        static INT_PREFIX: OnceLock<Regex> = OnceLock::new();

        match self {
            Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Cell::Number(_) | Cell::Empty => None,
            Cell::Text(s) => {
                let re = INT_PREFIX.get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());
                re.captures(s)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            }
        }
    }
}

/// One telemetry row exactly as the spreadsheet delivers it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRow {
    #[serde(rename = "Gateway Received Time")]
    pub received_time: Cell,
    #[serde(rename = "Device ID")]
    pub device_id: Cell,
    #[serde(rename = "Transmitter Data")]
    pub transmitter_data: Cell,
    #[serde(rename = "Water Level (cm)")]
    pub water_level: Cell,
    #[serde(rename = "Status")]
    pub status: Cell,
    #[serde(rename = "Network")]
    pub network: Cell,
    #[serde(rename = "Batch Upload Time")]
    pub batch_upload_time: Cell,
    #[serde(rename = "SIM Operator")]
    pub sim_operator: Cell,
    #[serde(rename = "WiFi Strength (dBm)")]
    pub wifi_strength: Cell,
    #[serde(rename = "GSM Strength (RSSI)")]
    pub gsm_strength: Cell,
    #[serde(rename = "SD Free (MB)")]
    pub sd_free: Cell,
}

impl RawRow {
    /// Device identifier as text, without trimming or case folding.
    pub fn device_id(&self) -> String {
        self.device_id.to_string()
    }
}

/// Epoch-millisecond instant where `0` means "unknown".
///
/// The sentinel is the smallest value, so unknown times order before
/// every real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const UNKNOWN: Timestamp = Timestamp(0);

    /// Non-positive instants collapse to `UNKNOWN`.
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            Self::UNKNOWN
        } else {
            Self(millis)
        }
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_unknown() {
            return None;
        }
        DateTime::from_timestamp_millis(self.millis())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }
}

/// Water level status reported by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Low,
    Good,
    Excess,
    #[serde(rename = "Flood Alert")]
    FloodAlert,
    Unknown,
}

impl Status {
    /// Match against the closed set of reported statuses.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Low" => Status::Low,
            "Good" => Status::Good,
            "Excess" => Status::Excess,
            "Flood Alert" => Status::FloodAlert,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Low => "Low",
            Status::Good => "Good",
            Status::Excess => "Excess",
            Status::FloodAlert => "Flood Alert",
            Status::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reading decoded from one raw row.
#[derive(Debug, Clone)]
pub struct Reading<'a> {
    pub device_id: String,
    pub timestamp: Timestamp,
    /// Level in centimetres; NaN when the sheet value was not numeric.
    pub level: f64,
    pub status: Status,
    pub raw: &'a RawRow,
}

/// One point of a sensor's level history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub time: Timestamp,
    pub level: f64,
}

/// Latest known state of one sensor device.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub id: String,
    pub name: String,
    pub current_level: f64,
    pub last_updated: Timestamp,
    pub status: Status,
    /// Oldest first, bounded by the configured history cap.
    pub history: Vec<HistoryPoint>,
    pub latest: RawRow,
}

/// Raw signal measurement with its unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalDescriptor {
    pub kind: SignalKind,
    pub value: Cell,
}

impl SignalDescriptor {
    pub fn new(kind: SignalKind, value: Cell) -> Self {
        Self { kind, value }
    }

    /// Quality tier 0..=4, derived on demand.
    pub fn tier(&self) -> u8 {
        super::signal::classify(self.kind, &self.value)
    }
}

impl fmt::Display for SignalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            return f.write_str("-");
        }
        write!(f, "{} {}", self.value, self.kind.unit())
    }
}

/// Health of the gateway, taken from the most recent row of any device.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub network: String,
    pub sim_operator: String,
    pub wifi_signal: SignalDescriptor,
    pub gsm_signal: SignalDescriptor,
    /// Free SD card space in MB, as reported.
    pub sd_free_mb: Cell,
    pub last_batch_upload: Timestamp,
    pub received_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_json() {
        assert_eq!(Cell::from(Value::Null), Cell::Empty);
        assert_eq!(Cell::from(serde_json::json!(12.5)), Cell::Number(12.5));
        assert_eq!(Cell::from(serde_json::json!("Good")), Cell::Text("Good".into()));
        assert_eq!(Cell::from(serde_json::json!(true)), Cell::Text("true".into()));
    }

    #[test]
    fn test_cell_to_number() {
        assert_eq!(Cell::Number(3.0).to_number(), 3.0);
        assert_eq!(Cell::from(" 14.2 ").to_number(), 14.2);
        assert!(Cell::from("n/a").to_number().is_nan());
        assert!(Cell::from("").to_number().is_nan());
        assert!(Cell::Empty.to_number().is_nan());
    }

    #[test]
    fn test_cell_leading_integer() {
        assert_eq!(Cell::from("-67 dBm").leading_integer(), Some(-67));
        assert_eq!(Cell::from("  18").leading_integer(), Some(18));
        assert_eq!(Cell::Number(-72.9).leading_integer(), Some(-72));
        assert_eq!(Cell::from("dBm -67").leading_integer(), None);
        assert_eq!(Cell::Number(f64::NAN).leading_integer(), None);
        assert_eq!(Cell::Empty.leading_integer(), None);
    }

    #[test]
    fn test_raw_row_decodes_missing_and_mixed_columns() {
        let row: RawRow = serde_json::from_value(serde_json::json!({
            "Device ID": "TX-01",
            "Water Level (cm)": 12,
            "GSM Strength (RSSI)": "18",
            "Unrelated Column": "ignored"
        }))
        .unwrap();

        assert_eq!(row.device_id(), "TX-01");
        assert_eq!(row.water_level, Cell::Number(12.0));
        assert_eq!(row.gsm_strength, Cell::Text("18".into()));
        assert_eq!(row.status, Cell::Empty);
    }

    #[test]
    fn test_raw_row_serializes_original_column_names() {
        let row = RawRow {
            device_id: "TX-01".into(),
            water_level: Cell::Number(f64::NAN),
            ..Default::default()
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Device ID"], "TX-01");
        assert!(json["Water Level (cm)"].is_null());
    }

    #[test]
    fn test_timestamp_sentinel() {
        assert!(Timestamp::from_millis(0).is_unknown());
        assert!(Timestamp::from_millis(-5).is_unknown());
        assert!(Timestamp::UNKNOWN < Timestamp::from_millis(1));
        assert!(Timestamp::UNKNOWN.to_datetime().is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("Low"), Status::Low);
        assert_eq!(Status::parse("Flood Alert"), Status::FloodAlert);
        assert_eq!(Status::parse(" Good "), Status::Good);
        assert_eq!(Status::parse("good"), Status::Unknown);
        assert_eq!(Status::parse(""), Status::Unknown);
        assert_eq!(serde_json::to_value(Status::FloodAlert).unwrap(), "Flood Alert");
    }

    #[test]
    fn test_signal_descriptor_display() {
        let wifi = SignalDescriptor::new(SignalKind::Wifi, Cell::Number(-61.0));
        assert_eq!(wifi.to_string(), "-61 dBm");
        let gsm = SignalDescriptor::new(SignalKind::Gsm, Cell::Empty);
        assert_eq!(gsm.to_string(), "-");
    }
}
