//! Irrigation guidance derived from the current water level.

use serde::Serialize;

/// Below this level (cm) the plot needs water.
pub const IRRIGATE_BELOW_CM: f64 = 5.0;
/// At or above this level (cm) irrigation should stop.
pub const STOP_AT_CM: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationAdvice {
    Irrigate,
    Optimal,
    StopIrrigating,
    /// Level was not a number.
    Unknown,
}

impl IrrigationAdvice {
    pub fn from_level(level: f64) -> Self {
        if level.is_nan() {
            IrrigationAdvice::Unknown
        } else if level < IRRIGATE_BELOW_CM {
            IrrigationAdvice::Irrigate
        } else if level >= STOP_AT_CM {
            IrrigationAdvice::StopIrrigating
        } else {
            IrrigationAdvice::Optimal
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IrrigationAdvice::Irrigate => "Irrigate the plot",
            IrrigationAdvice::Optimal => "Water Level Optimal",
            IrrigationAdvice::StopIrrigating => "Stop irrigating the plot",
            IrrigationAdvice::Unknown => "Level unavailable",
        }
    }
}

/// Fill percentage of a 0..100 cm level gauge, never below 5%.
pub fn gauge_percent(level: f64) -> f64 {
    if level.is_nan() {
        return 5.0;
    }
    level.clamp(5.0, 100.0)
}
