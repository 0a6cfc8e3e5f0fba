//! Per-device aggregation of readings into sensor snapshots.

use serde::Deserialize;
use std::collections::HashMap;

use super::models::{HistoryPoint, RawRow, Reading, SensorSnapshot};
use super::normalize::normalize;
use super::time::TimeParser;

/// Number of history points kept per sensor unless configured otherwise.
pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Friendly names for device identifiers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct NicknameMap(HashMap<String, String>);

impl NicknameMap {
    /// Parse a JSON object of `id -> nickname`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Nickname for `id`, or `id` itself when unmapped.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.0.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NicknameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Settings shared by every derivation step of a refresh.
#[derive(Debug, Clone)]
pub struct DeriveOptions {
    pub history_cap: usize,
    pub time: TimeParser,
    pub nicknames: NicknameMap,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            time: TimeParser::utc(),
            nicknames: NicknameMap::default(),
        }
    }
}

/// Group rows by device and build one snapshot per device.
///
/// Devices appear in the order they are first seen. Within a device the
/// reading with the latest timestamp is current; equal timestamps resolve
/// to the one that came last in `rows`. Rows with unknown times sort
/// before every dated row, in history and in current selection alike.
pub fn aggregate(rows: &[RawRow], options: &DeriveOptions) -> Vec<SensorSnapshot> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Reading<'_>>> = HashMap::new();

    for row in rows {
        let reading = normalize(row, &options.time);
        match groups.get_mut(&reading.device_id) {
            Some(readings) => readings.push(reading),
            None => {
                order.push(reading.device_id.clone());
                groups.insert(reading.device_id.clone(), vec![reading]);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let readings = groups.remove(&id)?;
            build_snapshot(id, readings, options)
        })
        .collect()
}

fn build_snapshot(
    id: String,
    mut readings: Vec<Reading<'_>>,
    options: &DeriveOptions,
) -> Option<SensorSnapshot> {
    // Stable: equal timestamps keep input order, so the last one is current
    readings.sort_by_key(|r| r.timestamp);

    let current = readings.last()?;
    let skip = readings.len().saturating_sub(options.history_cap);
    let history = readings[skip..]
        .iter()
        .map(|r| HistoryPoint {
            time: r.timestamp,
            level: r.level,
        })
        .collect();

    Some(SensorSnapshot {
        name: options.nicknames.resolve(&id).to_string(),
        current_level: current.level,
        last_updated: current.timestamp,
        status: current.status,
        history,
        latest: current.raw.clone(),
        id,
    })
}
