/*!
`skies_common` keeps a map of live aircraft in step with a polled flight-state feed.

Every poll produces a [`Snapshot`]. The [`Reconciler`] compares it with the
[`TrackedEntityStore`] and
- starts tracking aircraft seen airborne for the first time,
- removes aircraft the feed stopped reporting (they left the area or landed),
- moves the others toward their new position, either in one jump or through an
  [`Interpolation`] of equal steps that always finishes before the next poll.

Drawing is left to a [`MapRenderer`], fetching to a [`FeedSource`] and remembering aircraft across
runs to a [`DocumentStore`]. [`Tracker`] ties them together.

# Example
```rust
use std::time::Instant;

use skies_common::{CommandLog, Tracker, TrackerConfig};

let payload = serde_json::json!({
    "time": 1_600_000_000,
    "states": [
        ["ab10df", "SWA1234 ", "United States", 0, 0, -97.74, 30.27, 1000.0, false, 200.0, 45.0]
    ]
});

let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
let mut map = CommandLog::default();
let report = tracker.apply_payload(&payload, &mut map, Instant::now()).unwrap();
assert_eq!(report.added, 1);

let position = tracker.search("swa1234").unwrap().unwrap().rendered_position;
assert_eq!(position.latitude, 30.27);
```
!*/

pub mod config;
pub mod error;
pub mod interpolate;
pub mod persist;
pub mod position;
pub mod reconcile;
pub mod render;
pub mod search;
pub mod snapshot;
pub mod store;
mod tracker;

pub use config::{TrackerConfig, IDENTIFIER_WIDTH};
pub use error::{Result, SkiesError};
pub use interpolate::Interpolation;
pub use persist::{DocumentStore, MemoryDocumentStore, PlaneRecord};
pub use position::{Bounds, Position};
pub use reconcile::{ReconcileReport, Reconciler};
pub use render::{CommandLog, MapRenderer, Pixel, RenderCommand};
pub use snapshot::{EntityState, FeedSource, Snapshot};
pub use store::{TrackedEntity, TrackedEntityStore};
pub use tracker::Tracker;
