//! Typed ingestion boundary for device location payloads.
//!
//! Records arrive as JSON objects, one per line:
//! `{"userId":1,"roundId":7,"latitude":36.5,"longitude":-121.9,"accuracy":4.0,"speed":0.3,"timestamp":"2026-05-01T14:00:00Z"}`.
//! `timestamp` may also be Unix seconds. Anything malformed is rejected here
//! so the pipeline only ever sees validated samples.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::course::{RoundId, UserId};
use crate::error::IngestError;
use crate::geo::Coordinate;
use crate::sample::{LocationSample, LocationUpdate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocationRecord {
    user_id: UserId,
    round_id: RoundId,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(default)]
    speed: Option<f64>,
    timestamp: RawTimestamp,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Rfc3339(DateTime<Utc>),
    UnixSeconds(f64),
}

impl RawTimestamp {
    fn resolve(self) -> Result<DateTime<Utc>, IngestError> {
        match self {
            RawTimestamp::Rfc3339(ts) => Ok(ts),
            RawTimestamp::UnixSeconds(secs) => {
                if !secs.is_finite() || secs < 0.0 {
                    return Err(IngestError::InvalidField {
                        field: "timestamp",
                        value: secs,
                    });
                }
                let millis = (secs * 1000.0).round() as i64;
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or(IngestError::InvalidField {
                        field: "timestamp",
                        value: secs,
                    })
            }
        }
    }
}

impl TryFrom<RawLocationRecord> for LocationUpdate {
    type Error = IngestError;

    fn try_from(raw: RawLocationRecord) -> Result<Self, Self::Error> {
        let coordinate = Coordinate::new(raw.latitude, raw.longitude)?;

        // Negative accuracy is how devices flag an invalid fix.
        if !raw.accuracy.is_finite() || raw.accuracy < 0.0 {
            return Err(IngestError::InvalidField {
                field: "accuracy",
                value: raw.accuracy,
            });
        }

        // Negative speed means "not available".
        let speed = match raw.speed {
            Some(s) if !s.is_finite() => {
                return Err(IngestError::InvalidField {
                    field: "speed",
                    value: s,
                })
            }
            Some(s) if s < 0.0 => None,
            other => other,
        };

        Ok(LocationUpdate {
            user_id: raw.user_id,
            round_id: raw.round_id,
            sample: LocationSample {
                coordinate,
                accuracy: raw.accuracy,
                speed,
                timestamp: raw.timestamp.resolve()?,
            },
        })
    }
}

/// Parse one record. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<LocationUpdate>, IngestError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let raw: RawLocationRecord = serde_json::from_str(line)?;
    LocationUpdate::try_from(raw).map(Some)
}

/// Accepted updates in input order, plus rejected lines (1-based).
#[derive(Debug, Default)]
pub struct IngestReport {
    pub updates: Vec<LocationUpdate>,
    pub rejected: Vec<(usize, IngestError)>,
}

pub fn parse_ndjson(contents: &str) -> IngestReport {
    let mut report = IngestReport::default();
    for (idx, line) in contents.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(update)) => report.updates.push(update),
            Ok(None) => {}
            Err(e) => {
                log::warn!("[INGEST] Line {} rejected: {}", idx + 1, e);
                report.rejected.push((idx + 1, e));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_record() {
        let update = parse_line(
            r#"{"userId":1,"roundId":7,"latitude":36.5,"longitude":-121.9,"accuracy":4.0,"speed":0.3,"timestamp":"2026-05-01T14:00:00Z"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(update.round_id, 7);
        assert_eq!(update.sample.speed, Some(0.3));
        assert_eq!(update.sample.timestamp.to_rfc3339(), "2026-05-01T14:00:00+00:00");
    }

    #[test]
    fn parses_unix_seconds_and_missing_speed() {
        let update = parse_line(
            r#"{"userId":1,"roundId":7,"latitude":36.5,"longitude":-121.9,"accuracy":4.0,"timestamp":1777644000.5}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(update.sample.speed, None);
        assert_eq!(update.sample.timestamp.timestamp_millis(), 1_777_644_000_500);
    }

    #[test]
    fn negative_speed_means_unavailable() {
        let update = parse_line(
            r#"{"userId":1,"roundId":7,"latitude":36.5,"longitude":-121.9,"accuracy":4.0,"speed":-1,"timestamp":0}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(update.sample.speed, None);
    }

    #[test]
    fn rejects_invalid_fixes() {
        let bad_lat = parse_line(
            r#"{"userId":1,"roundId":7,"latitude":123.0,"longitude":-121.9,"accuracy":4.0,"timestamp":0}"#,
        );
        assert!(matches!(bad_lat, Err(IngestError::Coordinate(_))));

        let bad_accuracy = parse_line(
            r#"{"userId":1,"roundId":7,"latitude":36.5,"longitude":-121.9,"accuracy":-1.0,"timestamp":0}"#,
        );
        assert!(matches!(
            bad_accuracy,
            Err(IngestError::InvalidField { field: "accuracy", .. })
        ));

        let missing_round = parse_line(r#"{"userId":1,"latitude":36.5,"longitude":-121.9}"#);
        assert!(matches!(missing_round, Err(IngestError::Malformed(_))));
    }

    #[test]
    fn report_keeps_order_and_line_numbers() {
        let contents = "\
# round 7
{\"userId\":1,\"roundId\":7,\"latitude\":36.5,\"longitude\":-121.9,\"accuracy\":4.0,\"timestamp\":10}
not json

{\"userId\":1,\"roundId\":7,\"latitude\":36.6,\"longitude\":-121.9,\"accuracy\":4.0,\"timestamp\":20}
";
        let report = parse_ndjson(contents);
        assert_eq!(report.updates.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 3);
        assert!(report.updates[0].sample.timestamp < report.updates[1].sample.timestamp);
    }
}
