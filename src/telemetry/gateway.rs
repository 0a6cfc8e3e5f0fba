//! Gateway health summary.

use super::models::{GatewayStatus, RawRow, SignalDescriptor};
use super::signal::SignalKind;
use super::time::TimeParser;

/// Summarize gateway health from the most recently received row.
///
/// Every device's rows compete; equal receive times resolve to the row
/// that came last. Returns `None` for an empty row set.
pub fn summarize(rows: &[RawRow], parser: &TimeParser) -> Option<GatewayStatus> {
    let (received_at, row) = rows
        .iter()
        .map(|row| (parser.parse_cell(&row.received_time), row))
        .max_by_key(|(received_at, _)| *received_at)?;

    Some(GatewayStatus {
        network: row.network.to_string(),
        sim_operator: row.sim_operator.to_string(),
        wifi_signal: SignalDescriptor::new(SignalKind::Wifi, row.wifi_strength.clone()),
        gsm_signal: SignalDescriptor::new(SignalKind::Gsm, row.gsm_strength.clone()),
        sd_free_mb: row.sd_free.clone(),
        last_batch_upload: parser.parse_cell(&row.batch_upload_time),
        received_at,
    })
}
