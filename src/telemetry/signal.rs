//! Signal quality classification for WiFi and GSM readings.

use serde::{Deserialize, Serialize};

use super::models::Cell;

/// CSQ value modems report when they have no measurement.
pub const CSQ_UNKNOWN: i64 = 99;

/// Which radio a signal measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "WiFi")]
    Wifi,
    #[serde(rename = "GSM")]
    Gsm,
}

impl SignalKind {
    pub fn unit(&self) -> &'static str {
        match self {
            SignalKind::Wifi => "dBm",
            SignalKind::Gsm => "CSQ",
        }
    }
}

/// How alarming a tier is when shown to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Poor,
    Fair,
    Good,
}

impl Severity {
    pub fn from_tier(tier: u8) -> Self {
        match tier {
            0 => Severity::None,
            1 => Severity::Poor,
            2 => Severity::Fair,
            _ => Severity::Good,
        }
    }
}

/// Classify a raw cell into a 0..=4 tier. Non-numeric values are tier 0.
pub fn classify(kind: SignalKind, raw: &Cell) -> u8 {
    match raw.leading_integer() {
        Some(value) => classify_value(kind, value),
        None => 0,
    }
}

/// Classify an integer measurement into a 0..=4 tier.
pub fn classify_value(kind: SignalKind, value: i64) -> u8 {
    match kind {
        SignalKind::Wifi => match value {
            v if v >= -50 => 4,
            v if v >= -60 => 3,
            v if v >= -70 => 2,
            v if v >= -80 => 1,
            _ => 0,
        },
        // 99 is above every band but means "no reading"
        SignalKind::Gsm => match value {
            CSQ_UNKNOWN => 0,
            v if v >= 20 => 4,
            v if v >= 15 => 3,
            v if v >= 10 => 2,
            v if v >= 1 => 1,
            _ => 0,
        },
    }
}

pub fn tier_label(tier: u8) -> &'static str {
    match tier {
        0 => "No Signal",
        1 => "Weak",
        2 => "Fair",
        3 => "Good",
        _ => "Excellent",
    }
}
