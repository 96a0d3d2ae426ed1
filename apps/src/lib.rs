//! Adapters connecting `skies_common` to the outside world: the OpenSky feed, saved payloads for
//! offline replay and a JSON file document store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use skies_common::{DocumentStore, FeedSource, PlaneRecord, Result, SkiesError};
use tracing::{debug, info, warn};

/// State vectors of every aircraft OpenSky currently sees
pub const OPENSKY_URL: &str = "https://opensky-network.org/api/states/all";

fn fetch_failure(e: impl std::fmt::Display) -> SkiesError {
    SkiesError::FetchFailure(e.to_string())
}

fn persistence_failure(e: impl std::fmt::Display) -> SkiesError {
    SkiesError::PersistenceFailure(e.to_string())
}

/// Blocking HTTP GET of a `states/all` style endpoint
#[derive(Debug, Clone)]
pub struct OpenSkyFeed {
    url: String,
    client: reqwest::blocking::Client,
}

impl OpenSkyFeed {
    /// Requests taking longer than `timeout` fail with `FetchFailure`
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skies/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(fetch_failure)?;
        Ok(Self { url: url.to_string(), client })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for OpenSkyFeed {
    fn fetch_snapshot(&mut self) -> Result<Value> {
        debug!("GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(fetch_failure)?;
        response.json::<Value>().map_err(fetch_failure)
    }
}

/// Re-reads a saved feed payload on every poll
///
/// Handy offline, and editing the file between polls moves the aircraft.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    fn fetch_snapshot(&mut self) -> Result<Value> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| fetch_failure(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| SkiesError::MalformedSnapshot(format!("{}: {e}", self.path.display())))
    }
}

/// [`DocumentStore`] kept as one JSON object on disk
///
/// Writes are buffered in memory and flushed every `flush_every` upserts, and once more on drop.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: BTreeMap<String, PlaneRecord>,
    flush_every: usize,
    dirty: usize,
}

impl JsonFileStore {
    /// Default number of upserts between flushes
    pub const FLUSH_EVERY: usize = 200;

    /// Load `path`, starting empty if it does not exist yet
    pub fn open(path: impl AsRef<Path>, flush_every: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| persistence_failure(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(persistence_failure(format!("{}: {e}", path.display()))),
        };
        info!("{}: {} plane records", path.display(), records.len());
        Ok(Self { path, records, flush_every: flush_every.max(1), dirty: 0 })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write every record to disk
    pub fn flush(&mut self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.records).map_err(persistence_failure)?;
        fs::write(&self.path, text)
            .map_err(|e| persistence_failure(format!("{}: {e}", self.path.display())))?;
        debug!("{}: flushed {} records", self.path.display(), self.records.len());
        self.dirty = 0;
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn upsert(&mut self, key: &str, record: PlaneRecord) -> Result<()> {
        self.records.insert(key.to_string(), record);
        self.dirty += 1;
        if self.dirty >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    fn find_by_key(&self, key: &str) -> Result<Option<PlaneRecord>> {
        Ok(self.records.get(key).cloned())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if self.dirty > 0 {
            if let Err(e) = self.flush() {
                warn!("{e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use skies_common::persist::record_sightings;
    use skies_common::Snapshot;
    use test_log::test;

    use super::*;

    const PAYLOAD: &str = r#"{
        "time": 1600000000,
        "states": [
            ["ab10df", "SWA1234 ", "United States", 0, 0, -97.7431, 30.2672, 3200.4, false, 180.2, 45.0],
            ["a1b2c3", "N123AB  ", "United States", 0, 0, -97.67, 30.19, null, true, 0.0, 171.6]
        ]
    }"#;

    #[test]
    fn file_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.json");
        let mut feed = FileFeed::new(&path);
        assert!(matches!(feed.fetch_snapshot(), Err(SkiesError::FetchFailure(_))));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(feed.fetch_snapshot(), Err(SkiesError::MalformedSnapshot(_))));

        fs::write(&path, PAYLOAD).unwrap();
        let payload = feed.fetch_snapshot().unwrap();
        let snapshot = Snapshot::from_value(&payload).unwrap();
        assert_eq!(snapshot.states.len(), 2);
        assert_eq!(snapshot.trackable().count(), 1);
    }

    #[test]
    fn json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planes.json");
        let snapshot = Snapshot::from_json(PAYLOAD).unwrap();

        {
            let mut store = JsonFileStore::open(&path, 10).unwrap();
            assert!(store.is_empty());
            assert_eq!(record_sightings(&mut store, &snapshot, 0), 0);
            assert_eq!(record_sightings(&mut store, &snapshot, 0), 0);
            // nothing flushed yet
            assert!(!path.exists());
        }

        // dropped, so flushed
        let store = JsonFileStore::open(&path, 10).unwrap();
        assert_eq!(store.len(), 1);
        let record = store.find_by_key("ab10df").unwrap().unwrap();
        assert_eq!(record.callsign.as_deref(), Some("SWA1234"));
        assert_eq!(record.sightings, 2);
        assert_eq!(record.first_seen, 1_600_000_000);
        assert!(store.find_by_key("a1b2c3").unwrap().is_none());
    }

    #[test]
    fn json_file_store_flushes_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planes.json");
        let mut store = JsonFileStore::open(&path, 2).unwrap();
        store.upsert("a", PlaneRecord::new("a", None, 1)).unwrap();
        assert!(!path.exists());
        store.upsert("b", PlaneRecord::new("b", Some("AAL1    "), 1)).unwrap();
        assert!(path.exists());

        let text = fs::read_to_string(&path).unwrap();
        let on_disk: BTreeMap<String, PlaneRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk["b"].callsign.as_deref(), Some("AAL1"));
    }

    #[test]
    fn json_file_store_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planes.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(JsonFileStore::open(&path, 2), Err(SkiesError::PersistenceFailure(_))));
    }

    #[test]
    fn opensky_feed_unreachable() {
        // nothing listens on port 9 of localhost
        let mut feed =
            OpenSkyFeed::new("http://127.0.0.1:9/api/states/all", Duration::from_millis(200)).unwrap();
        assert_eq!(feed.url(), "http://127.0.0.1:9/api/states/all");
        assert!(matches!(feed.fetch_snapshot(), Err(SkiesError::FetchFailure(_))));
    }
}
