/*!
Auxiliary per-aircraft metadata kept in a document store

Nothing in reconciliation depends on this: a failing [`DocumentStore`] is logged and the poll goes
on.
!*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::snapshot::Snapshot;

/// What is remembered about one aircraft, keyed by its transponder address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneRecord {
    pub icao24: String,
    /// Callsign from the latest sighting, without padding
    pub callsign: Option<String>,
    /// Epoch seconds
    pub first_seen: i64,
    /// Epoch seconds
    pub last_seen: i64,
    /// Number of polls this aircraft was reported airborne in
    pub sightings: u64,
}

impl PlaneRecord {
    #[must_use]
    pub fn new(icao24: &str, callsign: Option<&str>, seen: i64) -> Self {
        Self {
            icao24: icao24.to_string(),
            callsign: callsign.map(|c| c.trim().to_string()),
            first_seen: seen,
            last_seen: seen,
            sightings: 1,
        }
    }

    /// Record another sighting
    pub fn seen(&mut self, callsign: Option<&str>, seen: i64) {
        if let Some(callsign) = callsign {
            self.callsign = Some(callsign.trim().to_string());
        }
        self.last_seen = self.last_seen.max(seen);
        self.sightings += 1;
    }
}

/// Keyed upsert/find, all the tracker needs from a document store
pub trait DocumentStore {
    fn upsert(&mut self, key: &str, record: PlaneRecord) -> Result<()>;

    fn find_by_key(&self, key: &str) -> Result<Option<PlaneRecord>>;
}

/// Document store that lives and dies with the process
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore(HashMap<String, PlaneRecord>);

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn upsert(&mut self, key: &str, record: PlaneRecord) -> Result<()> {
        self.0.insert(key.to_string(), record);
        Ok(())
    }

    fn find_by_key(&self, key: &str) -> Result<Option<PlaneRecord>> {
        Ok(self.0.get(key).cloned())
    }
}

/// Bump the [`PlaneRecord`] of every airborne aircraft in `snapshot`
///
/// `now` (epoch seconds) is used when the snapshot carries no time of its own. Stops at the first
/// failure, as the store is most likely unreachable, and returns how many sightings went
/// unrecorded.
pub fn record_sightings<D>(documents: &mut D, snapshot: &Snapshot, now: i64) -> usize
where
    D: DocumentStore + ?Sized,
{
    let seen = snapshot.time.unwrap_or(now);
    let sightings: Vec<_> = snapshot
        .trackable()
        .filter_map(|state| Some((state.icao24.as_deref()?, state.identifier.as_str())))
        .collect();

    for (i, &(icao24, callsign)) in sightings.iter().enumerate() {
        let result = documents.find_by_key(icao24).and_then(|record| {
            let record = match record {
                Some(mut record) => {
                    record.seen(Some(callsign), seen);
                    record
                },
                None => PlaneRecord::new(icao24, Some(callsign), seen),
            };
            documents.upsert(icao24, record)
        });
        if let Err(e) = result {
            let unrecorded = sightings.len() - i;
            warn!("[{icao24}] {e}, {unrecorded} sightings not recorded");
            return unrecorded;
        }
    }
    debug!("recorded {} sightings", sightings.len());
    0
}
