//! Filtering helpers for the raw log view.

use serde::Serialize;
use std::collections::BTreeSet;

use super::aggregate::NicknameMap;
use super::models::{RawRow, SignalDescriptor};
use super::signal::SignalKind;

/// Which rows the log view shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogFilter {
    #[default]
    All,
    Device(String),
}

impl LogFilter {
    /// Build from a query value; absent or `"All"` selects every device.
    pub fn from_query(device: Option<&str>) -> Self {
        match device {
            None | Some("All") | Some("") => LogFilter::All,
            Some(id) => LogFilter::Device(id.to_string()),
        }
    }

    pub fn matches(&self, row: &RawRow) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Device(id) => row.device_id() == *id,
        }
    }
}

/// Rows accepted by `filter`, in their original order.
pub fn filter_logs<'a>(rows: &'a [RawRow], filter: &LogFilter) -> Vec<&'a RawRow> {
    rows.iter().filter(|row| filter.matches(row)).collect()
}

/// A device choice for the log filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOption {
    pub id: String,
    pub name: String,
}

/// Distinct non-empty device ids, sorted, with their display names.
pub fn device_options(rows: &[RawRow], nicknames: &NicknameMap) -> Vec<DeviceOption> {
    let ids: BTreeSet<String> = rows
        .iter()
        .map(RawRow::device_id)
        .filter(|id| !id.is_empty())
        .collect();

    ids.into_iter()
        .map(|id| DeviceOption {
            name: nicknames.resolve(&id).to_string(),
            id,
        })
        .collect()
}

/// The signal measurement matching the row's active network.
pub fn network_signal(row: &RawRow) -> SignalDescriptor {
    if row.network.to_string() == "WiFi" {
        SignalDescriptor::new(SignalKind::Wifi, row.wifi_strength.clone())
    } else {
        SignalDescriptor::new(SignalKind::Gsm, row.gsm_strength.clone())
    }
}
