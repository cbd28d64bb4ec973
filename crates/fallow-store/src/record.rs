//! The record store contract and the on-disk record format.
//!
//! A record is a flat JSON object keyed by field name:
//!
//! ```json
//! { "last_seen_epoch_ms": 1760000000000, "stage_remainder": 0.25 }
//! ```
//!
//! Decoding is lenient. A missing or mistyped field falls back to its
//! default, so a damaged record degrades to "never seen" instead of
//! blocking world start.

use chrono::{DateTime, Utc};
use fallow_types::{SessionClock, WorldId};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Field holding the last observed wall-clock time.
pub const LAST_SEEN_KEY: &str = "last_seen_epoch_ms";

/// Field holding the carried fractional stage remainder.
pub const REMAINDER_KEY: &str = "stage_remainder";

/// Informational field recording when the record was written.
pub const UPDATED_AT_KEY: &str = "updated_at";

/// Durable per-world key/value storage for [`SessionClock`] records.
pub trait RecordStore: Send {
    /// Load the record for `world`. Returns `Ok(None)` if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    fn load(&self, world: WorldId) -> Result<Option<SessionClock>, StoreError>;

    /// Replace the record for `world`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be written.
    fn save(&mut self, world: WorldId, clock: &SessionClock) -> Result<(), StoreError>;
}

/// Encode a clock as a record document.
pub fn encode_record(clock: &SessionClock) -> Value {
    let mut doc = Map::new();
    doc.insert(LAST_SEEN_KEY.to_owned(), Value::from(clock.last_seen_epoch_ms));
    // Non-finite floats have no JSON form; they decode as zero anyway.
    let remainder = serde_json::Number::from_f64(clock.stage_remainder)
        .map_or(Value::from(0), Value::Number);
    doc.insert(REMAINDER_KEY.to_owned(), remainder);
    if let Some(stamp) = DateTime::<Utc>::from_timestamp_millis(clock.last_seen_epoch_ms) {
        doc.insert(UPDATED_AT_KEY.to_owned(), Value::from(stamp.to_rfc3339()));
    }
    Value::Object(doc)
}

/// Decode a record document, defaulting every missing or malformed field.
pub fn decode_record(doc: &Value) -> SessionClock {
    let last_seen_epoch_ms = doc.get(LAST_SEEN_KEY).and_then(Value::as_i64).unwrap_or(0);
    let stage_remainder = doc
        .get(REMAINDER_KEY)
        .and_then(Value::as_f64)
        .filter(|r| r.is_finite())
        .unwrap_or(0.0);
    SessionClock {
        last_seen_epoch_ms,
        stage_remainder,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_then_decode_keeps_fields() {
        let clock = SessionClock {
            last_seen_epoch_ms: 1_700_000_000_000,
            stage_remainder: 0.5,
        };
        let doc = encode_record(&clock);
        assert_eq!(doc[UPDATED_AT_KEY], json!("2023-11-14T22:13:20+00:00"));
        assert_eq!(decode_record(&doc), clock);
    }

    #[test]
    fn missing_fields_default() {
        assert_eq!(decode_record(&json!({})), SessionClock::default());
        assert_eq!(decode_record(&json!([1, 2, 3])), SessionClock::default());
    }

    #[test]
    fn mistyped_fields_default_independently() {
        let doc = json!({
            "last_seen_epoch_ms": "yesterday",
            "stage_remainder": 0.75,
        });
        let clock = decode_record(&doc);
        assert_eq!(clock.last_seen_epoch_ms, 0);
        assert!((clock.stage_remainder - 0.75).abs() < f64::EPSILON);

        let doc = json!({ "last_seen_epoch_ms": 42, "stage_remainder": null });
        let clock = decode_record(&doc);
        assert_eq!(clock.last_seen_epoch_ms, 42);
        assert!(clock.stage_remainder.abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_remainder_encodes_as_zero() {
        let clock = SessionClock {
            last_seen_epoch_ms: 5,
            stage_remainder: f64::NAN,
        };
        let decoded = decode_record(&encode_record(&clock));
        assert!(decoded.stage_remainder.abs() < f64::EPSILON);
    }
}
