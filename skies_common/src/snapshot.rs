/*!
Parsing of a raw feed payload into a [`Snapshot`] of [`EntityState`]

The feed (OpenSky `states/all`) reports one fixed-position array per aircraft:

| index | field        |
| ----- | ------------ |
| 0     | icao24       |
| 1     | callsign     |
| 5     | longitude    |
| 6     | latitude     |
| 8     | on_ground    |
| 10    | true track   |

Other indices are ignored.
!*/

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{malformed, Result};
use crate::position::Position;

const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const ON_GROUND: usize = 8;
const HEADING: usize = 10;

/// State of one aircraft as reported by a single poll
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// Callsign exactly as the feed reports it, including the trailing space padding
    pub identifier: String,
    /// Transponder address, stable across callsign changes
    pub icao24: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub on_ground: bool,
    /// Degrees clockwise from north
    pub heading: Option<f64>,
}

impl EntityState {
    /// Both coordinates, if the feed reported them
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position { latitude, longitude }),
            _ => None,
        }
    }

    /// Airborne with a known position, the only states worth putting on a map
    #[must_use]
    pub fn is_trackable(&self) -> bool {
        !self.on_ground && self.position().is_some()
    }
}

/// One poll's full set of reported aircraft states, in feed order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Epoch seconds the feed attached to this snapshot
    pub time: Option<i64>,
    pub states: Vec<EntityState>,
}

impl Snapshot {
    /// Parse a feed payload
    ///
    /// Rows without a callsign, or with a callsign of only spaces, are skipped. Fails with
    /// [`SkiesError::MalformedSnapshot`] if `states` is missing or not an array.
    ///
    /// [`SkiesError::MalformedSnapshot`]: crate::SkiesError::MalformedSnapshot
    pub fn from_value(payload: &Value) -> Result<Self> {
        let rows = match payload.get("states") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => return Err(malformed!("payload has no states")),
            Some(other) => {
                return Err(malformed!("states is not an array: {}", json_kind(other)));
            },
        };

        let mut states = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let Some(row) = row.as_array() else {
                debug!("row {i} is not an array, skipping");
                continue;
            };
            match parse_row(row) {
                Some(state) => states.push(state),
                None => trace!("row {i} has no callsign, skipping"),
            }
        }

        Ok(Self { time: payload.get("time").and_then(Value::as_i64), states })
    }

    /// Parse a feed payload from its JSON text
    pub fn from_json(payload: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| malformed!("invalid json: {e}"))?;
        Self::from_value(&value)
    }

    /// States that are airborne with a known position
    pub fn trackable(&self) -> impl Iterator<Item = &EntityState> {
        self.states.iter().filter(|state| state.is_trackable())
    }
}

fn parse_row(row: &[Value]) -> Option<EntityState> {
    let identifier = row.get(CALLSIGN)?.as_str()?;
    if identifier.trim().is_empty() {
        return None;
    }

    let number = |index: usize| row.get(index).and_then(Value::as_f64);

    Some(EntityState {
        identifier: identifier.to_string(),
        icao24: row.get(ICAO24).and_then(Value::as_str).map(str::to_string),
        longitude: number(LONGITUDE),
        latitude: number(LATITUDE),
        // an unknown ground state is not good enough to start tracking
        on_ground: row.get(ON_GROUND).and_then(Value::as_bool).unwrap_or(true),
        heading: number(HEADING),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Where snapshots come from
///
/// Implementations only fetch; parsing happens in [`Snapshot::from_value`] so that every feed is
/// held to the same row format.
pub trait FeedSource: Send {
    /// Fetch the current raw payload, failing with [`SkiesError::FetchFailure`]
    ///
    /// [`SkiesError::FetchFailure`]: crate::SkiesError::FetchFailure
    fn fetch_snapshot(&mut self) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SkiesError;

    #[test]
    fn parse_rows() {
        let payload = json!({
            "time": 1_600_000_000,
            "states": [
                ["ab10df", "SWA1234 ", "United States", 1, 2, -97.7, 30.2, 1000.0, false, 200.0, 45.0],
                ["ae4a21", null, "United States", 1, 2, -97.1, 30.1, 1000.0, false, 200.0, 90.0],
                ["a328b7", "        ", "United States", 1, 2, -97.1, 30.1, 1000.0, false, 200.0, 90.0],
                ["a328b8", "", "United States", 1, 2, -97.1, 30.1, 1000.0, false, 200.0, 90.0],
                ["a11111", "N123AB  ", "United States", 1, 2, null, null, null, true, 0.0, null],
            ]
        });
        let snapshot = Snapshot::from_value(&payload).unwrap();
        assert_eq!(snapshot.time, Some(1_600_000_000));
        assert_eq!(snapshot.states.len(), 2);

        let swa = &snapshot.states[0];
        assert_eq!(swa.identifier, "SWA1234 ");
        assert_eq!(swa.icao24.as_deref(), Some("ab10df"));
        assert_eq!(swa.position(), Some(Position::new(30.2, -97.7)));
        assert_eq!(swa.heading, Some(45.0));
        assert!(swa.is_trackable());

        let parked = &snapshot.states[1];
        assert_eq!(parked.identifier, "N123AB  ");
        assert!(parked.on_ground);
        assert_eq!(parked.position(), None);
        assert_eq!(parked.heading, None);
        assert!(!parked.is_trackable());

        assert_eq!(snapshot.trackable().count(), 1);
    }

    #[test]
    fn short_and_odd_rows() {
        let payload = json!({
            "states": [
                ["ab10df", "SHORT   "],
                "not a row",
                ["ab10df", 42],
                ["ab10df", "AAL1    ", "x", 1, 2, "-97.7", 30.2, 0, false, 0, 10.0],
            ]
        });
        let snapshot = Snapshot::from_value(&payload).unwrap();
        assert_eq!(snapshot.time, None);
        assert_eq!(snapshot.states.len(), 2);
        // no ground flag, treated as not airborne
        assert!(snapshot.states[0].on_ground);
        // longitude reported as a string is no longitude
        assert_eq!(snapshot.states[1].longitude, None);
        assert!(!snapshot.states[1].is_trackable());
    }

    #[test]
    fn malformed() {
        for payload in [json!({}), json!({"states": null}), json!({"states": 5}), json!([1, 2])] {
            assert!(matches!(
                Snapshot::from_value(&payload),
                Err(SkiesError::MalformedSnapshot(_))
            ));
        }
        assert!(matches!(Snapshot::from_json("{"), Err(SkiesError::MalformedSnapshot(_))));
        assert_eq!(Snapshot::from_json(r#"{"states": []}"#).unwrap().states.len(), 0);
    }
}
