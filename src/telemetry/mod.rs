//! Telemetry module for WaterMonitor.
//!
//! Turns raw sheet rows into typed readings, sensor snapshots and the
//! gateway health summary. Everything here is pure and synchronous.

mod advice;
mod aggregate;
mod gateway;
mod logs;
mod models;
mod normalize;
mod signal;
mod time;

pub use advice::*;
pub use aggregate::*;
pub use gateway::*;
pub use logs::*;
pub use models::*;
pub use signal::*;
pub use time::*;
