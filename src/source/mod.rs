//! Row source module.
//!
//! Fetches telemetry rows from the spreadsheet web app.

mod sheet;

pub use sheet::*;

use crate::telemetry::RawRow;

use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Shown instead of transport errors that carry no useful detail.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "Connection failed. Please ensure your Google Sheet is active and accessible.";

/// Row source error types.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("sheet returned HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Backend(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SourceError {
    /// Message suitable for the dashboard error banner.
    pub fn user_message(&self) -> String {
        match self {
            SourceError::Timeout(_) | SourceError::Network(_) => CONNECTION_FAILED_MESSAGE.to_string(),
            SourceError::Backend(msg) if msg.trim().is_empty() || msg == "Failed to fetch" => {
                CONNECTION_FAILED_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Anything that can produce the current set of raw rows.
pub trait RowSource: Send + Sync + 'static {
    fn fetch_rows(&self) -> impl Future<Output = Result<Vec<RawRow>, SourceError>> + Send;
}

/// Decode a sheet payload into rows.
///
/// Accepts a bare array, or an object carrying the array under `data` or
/// `rows`. An object with an `error` string is a backend failure. Array
/// entries that are not objects are skipped.
pub fn decode_rows(payload: Value) -> Result<Vec<RawRow>, SourceError> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(mut map) => {
            if let Some(Value::String(msg)) = map.get("error") {
                return Err(SourceError::Backend(msg.clone()));
            }
            match map.remove("data").or_else(|| map.remove("rows")) {
                Some(Value::Array(entries)) => entries,
                _ => return Err(SourceError::Decode("expected an array of rows".to_string())),
            }
        }
        _ => return Err(SourceError::Decode("expected an array of rows".to_string())),
    };

    let total = entries.len();
    let rows: Vec<RawRow> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            if !entry.is_object() {
                tracing::warn!("Skipping sheet entry {}: not an object", i);
                return None;
            }
            match serde_json::from_value(entry) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!("Skipping sheet entry {}: {}", i, e);
                    None
                }
            }
        })
        .collect();

    if rows.len() < total {
        tracing::warn!("Decoded {} of {} sheet entries", rows.len(), total);
    }

    Ok(rows)
}
