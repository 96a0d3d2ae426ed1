use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::interpolate::Interpolation;
use crate::persist::{record_sightings, DocumentStore};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::render::MapRenderer;
use crate::search;
use crate::snapshot::{FeedSource, Snapshot};
use crate::store::{TrackedEntity, TrackedEntityStore};

/// Tracked aircraft plus everything needed to keep them current
///
/// Owns the [`TrackedEntityStore`]; the map only ever sees it through [`MapRenderer`] calls.
pub struct Tracker {
    reconciler: Reconciler,
    store: TrackedEntityStore,
    documents: Option<Box<dyn DocumentStore>>,
    polls: u64,
}

impl Tracker {
    /// Fails with `InvalidConfig` if an animation could outlive the poll interval
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reconciler: Reconciler::new(config),
            store: TrackedEntityStore::new(),
            documents: None,
            polls: 0,
        })
    }

    /// Record sightings of every polled aircraft into `documents`
    #[must_use]
    pub fn with_documents(mut self, documents: Box<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    #[must_use]
    pub const fn store(&self) -> &TrackedEntityStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        self.reconciler.config()
    }

    #[must_use]
    pub fn documents(&self) -> Option<&dyn DocumentStore> {
        self.documents.as_deref()
    }

    /// Number of snapshots reconciled so far
    #[must_use]
    pub const fn polls(&self) -> u64 {
        self.polls
    }

    /// Fetch from `feed` and reconcile the result
    ///
    /// On error nothing changed, neither the store nor the map.
    pub fn poll<F, R>(&mut self, feed: &mut F, map: &mut R, now: Instant) -> Result<ReconcileReport>
    where
        F: FeedSource + ?Sized,
        R: MapRenderer + ?Sized,
    {
        let payload = feed.fetch_snapshot()?;
        self.apply_payload(&payload, map, now)
    }

    /// Parse and reconcile a raw feed payload
    ///
    /// A `MalformedSnapshot` leaves the store and the map untouched.
    pub fn apply_payload<R>(&mut self, payload: &Value, map: &mut R, now: Instant) -> Result<ReconcileReport>
    where
        R: MapRenderer + ?Sized,
    {
        let snapshot = Snapshot::from_value(payload).inspect_err(|e| warn!("skipping poll: {e}"))?;
        Ok(self.apply_snapshot(&snapshot, map, now))
    }

    pub fn apply_snapshot<R>(&mut self, snapshot: &Snapshot, map: &mut R, now: Instant) -> ReconcileReport
    where
        R: MapRenderer + ?Sized,
    {
        let mut report = self.reconciler.reconcile(&mut self.store, snapshot, map, now);
        if let Some(documents) = self.documents.as_deref_mut() {
            report.persistence_failures = record_sightings(documents, snapshot, unix_now());
        }
        self.polls += 1;
        info!(
            "poll {}: {} states, {} tracked, {report}",
            self.polls,
            snapshot.states.len(),
            self.store.len()
        );
        report
    }

    /// Run the interpolation steps due at `now`, returns the number of markers moved
    pub fn tick<R>(&mut self, map: &mut R, now: Instant) -> usize
    where
        R: MapRenderer + ?Sized,
    {
        self.reconciler.advance(&mut self.store, map, now)
    }

    /// Earliest instant an interpolation step is due, `None` while nothing is animating
    #[must_use]
    pub fn next_step_due(&self) -> Option<Instant> {
        self.store
            .iter()
            .filter_map(|(_, entity)| entity.interpolation.as_ref())
            .map(Interpolation::next_step_at)
            .min()
    }

    /// Re-check which markers are inside the viewport, call after panning or zooming
    pub fn refresh_visibility<R>(&mut self, map: &mut R) -> usize
    where
        R: MapRenderer + ?Sized,
    {
        self.reconciler.refresh_visibility(&mut self.store, map)
    }

    /// Find the entity a user typed in, see [`search::find`]
    pub fn search(&self, raw: &str) -> Result<Option<&TrackedEntity>> {
        search::find(&self.store, raw)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::persist::MemoryDocumentStore;
    use crate::render::CommandLog;
    use crate::SkiesError;

    struct FailingFeed;

    impl FeedSource for FailingFeed {
        fn fetch_snapshot(&mut self) -> Result<Value> {
            Err(SkiesError::FetchFailure("timed out".into()))
        }
    }

    struct UnreachableDocuments;

    impl DocumentStore for UnreachableDocuments {
        fn upsert(&mut self, _key: &str, _record: crate::PlaneRecord) -> Result<()> {
            Err(SkiesError::PersistenceFailure("connection refused".into()))
        }

        fn find_by_key(&self, _key: &str) -> Result<Option<crate::PlaneRecord>> {
            Err(SkiesError::PersistenceFailure("connection refused".into()))
        }
    }

    struct FixedFeed(Value);

    impl FeedSource for FixedFeed {
        fn fetch_snapshot(&mut self) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    fn payload() -> Value {
        json!({
            "time": 1000,
            "states": [
                ["ab10df", "SWA1234 ", "United States", 1, 2, -97.7, 30.2, 1000.0, false, 200.0, 45.0],
            ]
        })
    }

    #[test]
    fn invalid_config() {
        let config = TrackerConfig { step_cadence: Duration::from_secs(1), ..TrackerConfig::default() };
        assert!(matches!(Tracker::new(config), Err(SkiesError::InvalidConfig(_))));
    }

    #[test]
    fn failed_polls_change_nothing() {
        let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
        let mut map = CommandLog::default();
        let now = Instant::now();

        tracker.poll(&mut FixedFeed(payload()), &mut map, now).unwrap();
        assert_eq!(tracker.store().len(), 1);
        assert_eq!(tracker.polls(), 1);
        map.take_commands();

        let err = tracker.poll(&mut FailingFeed, &mut map, now).unwrap_err();
        assert!(matches!(err, SkiesError::FetchFailure(_)));
        let err = tracker.apply_payload(&json!({"states": null}), &mut map, now).unwrap_err();
        assert!(matches!(err, SkiesError::MalformedSnapshot(_)));

        assert_eq!(tracker.store().len(), 1);
        assert_eq!(tracker.polls(), 1);
        assert!(map.commands().is_empty());
    }

    #[test]
    fn documents_attached() {
        let mut tracker = Tracker::new(TrackerConfig::default())
            .unwrap()
            .with_documents(Box::new(MemoryDocumentStore::new()));
        let mut map = CommandLog::default();
        let report = tracker.apply_payload(&payload(), &mut map, Instant::now()).unwrap();
        assert_eq!(report.persistence_failures, 0);

        let record = tracker.documents().unwrap().find_by_key("ab10df").unwrap().unwrap();
        assert_eq!(record.last_seen, 1000);
        assert_eq!(tracker.search("swa1234").unwrap().unwrap().icao24.as_deref(), Some("ab10df"));
    }

    #[test]
    fn documents_unreachable() {
        let mut tracker = Tracker::new(TrackerConfig::default())
            .unwrap()
            .with_documents(Box::new(UnreachableDocuments));
        let mut map = CommandLog::default();
        let report = tracker.apply_payload(&payload(), &mut map, Instant::now()).unwrap();

        assert_eq!(report.persistence_failures, 1);
        assert_eq!(report.added, 1);
        assert_eq!(tracker.store().len(), 1);
        assert_eq!(tracker.polls(), 1);
        assert!(tracker.search("swa1234").unwrap().is_some());
    }

    #[test]
    fn next_step_due() {
        let config = TrackerConfig::default();
        let cadence = config.step_cadence;
        let mut tracker = Tracker::new(config).unwrap();
        let mut map = CommandLog::default();
        let now = Instant::now();

        tracker.apply_payload(&payload(), &mut map, now).unwrap();
        assert_eq!(tracker.next_step_due(), None);

        let moved = json!({
            "time": 1010,
            "states": [
                ["ab10df", "SWA1234 ", "United States", 1, 2, -97.6, 30.3, 1000.0, false, 200.0, 45.0],
            ]
        });
        tracker.apply_payload(&moved, &mut map, now).unwrap();
        assert_eq!(tracker.next_step_due(), Some(now + cadence));

        tracker.tick(&mut map, now + cadence);
        assert_eq!(tracker.next_step_due(), Some(now + cadence * 2));
    }
}
