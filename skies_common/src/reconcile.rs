/*!
Reconciliation of a new [`Snapshot`] against the [`TrackedEntityStore`]

For every airborne state with a position:
- unknown identifier: start tracking it and render a marker
- known identifier: either jump the marker to the reported position or start an
  [`Interpolation`] toward it

Every tracked identifier that the snapshot no longer reports as airborne with a position is removed
from the store and from the map.

A marker jumps instead of animating when it is not on screen, when it moved further than
[`TrackerConfig::jump_threshold`] on either axis, or when it did not move at all.
!*/

use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::interpolate::Interpolation;
use crate::position::{Bounds, Position};
use crate::render::MapRenderer;
use crate::snapshot::{EntityState, Snapshot};
use crate::store::{TrackedEntity, TrackedEntityStore};

/// What one reconciliation did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    /// Updates of already tracked entities, `jumped + animated`
    pub updated: usize,
    pub jumped: usize,
    pub animated: usize,
    pub removed: usize,
    /// Sightings the document store failed to record
    pub persistence_failures: usize,
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added: {}, updated: {} (jumped: {}, animated: {}), removed: {}",
            self.added, self.updated, self.jumped, self.animated, self.removed
        )?;
        if self.persistence_failures > 0 {
            write!(f, ", persistence failures: {}", self.persistence_failures)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Jump,
    Animate,
}

/// The only writer of a [`TrackedEntityStore`]
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: TrackerConfig,
}

impl Reconciler {
    #[must_use]
    pub const fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Bring `store` and the map in line with `snapshot`
    ///
    /// Given the same store, snapshot and viewport this always issues the same render commands.
    /// `now` only anchors the start of new interpolations.
    pub fn reconcile<R>(
        &self,
        store: &mut TrackedEntityStore,
        snapshot: &Snapshot,
        map: &mut R,
        now: Instant,
    ) -> ReconcileReport
    where
        R: MapRenderer + ?Sized,
    {
        let viewport = map.viewport_bounds();
        let mut report = ReconcileReport::default();
        let mut seen = BTreeSet::new();

        for state in snapshot.trackable() {
            let Some(target) = state.position() else {
                continue;
            };
            let id = state.identifier.as_str();
            seen.insert(id);

            if let Some(existing) = store.get_mut(id) {
                match self.update(existing, state, target, &viewport, map, now) {
                    Motion::Jump => report.jumped += 1,
                    Motion::Animate => report.animated += 1,
                }
                report.updated += 1;
            } else if let Some(entity) = TrackedEntity::from_state(state) {
                debug!("[{id}] new at ({:.4}, {:.4})", target.latitude, target.longitude);
                map.render(id, target, state.heading, entity.visible);
                store.upsert(id, entity);
                report.added += 1;
            }
        }

        let removed = store.drain_where(|id| !seen.contains(id));
        for id in &removed {
            debug!("[{id}] no longer reported, removing");
            map.remove(id);
        }
        report.removed = removed.len();

        report
    }

    fn update<R>(
        &self,
        existing: &mut TrackedEntity,
        state: &EntityState,
        target: Position,
        viewport: &Bounds,
        map: &mut R,
        now: Instant,
    ) -> Motion
    where
        R: MapRenderer + ?Sized,
    {
        let (lat_delta, lng_delta) = existing.rendered_position.delta_to(&target);
        existing.heading = state.heading;
        if state.icao24.is_some() {
            existing.icao24.clone_from(&state.icao24);
        }
        // whatever was in flight belongs to the previous snapshot
        existing.cancel_interpolation();
        existing.target_position = target;

        let threshold = self.config.jump_threshold;
        let on_screen = map.contains(viewport, existing.rendered_position);
        let jump = !on_screen
            || lat_delta.abs() > threshold
            || lng_delta.abs() > threshold
            || (lat_delta == 0.0 && lng_delta == 0.0);

        let id = state.identifier.as_str();
        if jump {
            existing.rendered_position = target;
            existing.visible = map.contains(viewport, target);
            trace!("[{id}] jump ({lat_delta:.4}, {lng_delta:.4})");
            map.render(id, target, existing.heading, existing.visible);
            Motion::Jump
        } else {
            existing.visible = true;
            trace!("[{id}] animate ({lat_delta:.4}, {lng_delta:.4})");
            map.render(id, existing.rendered_position, existing.heading, true);
            existing.interpolation = Some(Interpolation::new(
                existing.rendered_position,
                target,
                self.config.interpolation_steps,
                self.config.step_cadence,
                now,
            ));
            Motion::Animate
        }
    }

    /// Run every interpolation step due at `now`
    ///
    /// Each entity that moved gets one `move_to` with its new rendered position. Finished
    /// interpolations are dropped. Returns the number of entities moved.
    pub fn advance<R>(&self, store: &mut TrackedEntityStore, map: &mut R, now: Instant) -> usize
    where
        R: MapRenderer + ?Sized,
    {
        let mut moved = 0;
        for (id, entity) in store.iter_mut() {
            let Some(job) = entity.interpolation.as_mut() else {
                continue;
            };
            if job.step_until(now, &mut entity.rendered_position) > 0 {
                map.move_to(id, entity.rendered_position);
                moved += 1;
            }
            if job.is_finished() {
                entity.interpolation = None;
            }
        }
        moved
    }

    /// Show markers inside the current viewport and hide the rest
    ///
    /// Only entities whose visibility changed are re-rendered. Returns how many changed.
    pub fn refresh_visibility<R>(&self, store: &mut TrackedEntityStore, map: &mut R) -> usize
    where
        R: MapRenderer + ?Sized,
    {
        let viewport = map.viewport_bounds();
        let mut changed = 0;
        for (id, entity) in store.iter_mut() {
            let visible = map.contains(&viewport, entity.rendered_position);
            if visible != entity.visible {
                entity.visible = visible;
                map.render(id, entity.rendered_position, entity.heading, visible);
                changed += 1;
            }
        }
        changed
    }
}
