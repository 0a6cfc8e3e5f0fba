//! Decoding of raw sheet rows into typed readings.

use super::models::{RawRow, Reading, Status};
use super::time::TimeParser;

/// Decode one raw row.
///
/// Never fails: unreadable times become `Timestamp::UNKNOWN`, non-numeric
/// levels stay NaN and unrecognized statuses become `Status::Unknown`.
pub fn normalize<'a>(row: &'a RawRow, parser: &TimeParser) -> Reading<'a> {
    Reading {
        device_id: row.device_id(),
        timestamp: parser.parse_cell(&row.received_time),
        level: row.water_level.to_number(),
        status: Status::parse(&row.status.to_string()),
        raw: row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::models::{Cell, Timestamp};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_normalize_well_formed_row() {
        let row = RawRow {
            received_time: "2024-03-05 14:07:09".into(),
            device_id: "TX-01".into(),
            water_level: Cell::Number(12.5),
            status: "Good".into(),
            ..Default::default()
        };

        let reading = normalize(&row, &TimeParser::utc());
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        assert_eq!(reading.device_id, "TX-01");
        assert_eq!(reading.timestamp, Timestamp::from(expected));
        assert_eq!(reading.level, 12.5);
        assert_eq!(reading.status, Status::Good);
        assert!(std::ptr::eq(reading.raw, &row));
    }

    #[test]
    fn test_normalize_malformed_row() {
        let row = RawRow {
            received_time: "yesterday".into(),
            device_id: " tx-01 ".into(),
            water_level: "dry".into(),
            status: "Overflow".into(),
            ..Default::default()
        };

        let reading = normalize(&row, &TimeParser::utc());

        assert_eq!(reading.device_id, " tx-01 ");
        assert!(reading.timestamp.is_unknown());
        assert!(reading.level.is_nan());
        assert_eq!(reading.status, Status::Unknown);
    }

    #[test]
    fn test_normalize_numeric_device_id_and_text_level() {
        let row = RawRow {
            device_id: Cell::Number(101.0),
            water_level: "7.25".into(),
            status: "Flood Alert".into(),
            ..Default::default()
        };

        let reading = normalize(&row, &TimeParser::utc());

        assert_eq!(reading.device_id, "101");
        assert_eq!(reading.level, 7.25);
        assert_eq!(reading.status, Status::FloodAlert);
    }
}
