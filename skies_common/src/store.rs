use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::interpolate::Interpolation;
use crate::position::Position;
use crate::snapshot::EntityState;

/// An aircraft currently represented on the map
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    identifier: String,
    /// Transponder address from the last report
    pub icao24: Option<String>,
    /// Position currently shown on the map
    pub rendered_position: Position,
    /// Position most recently reported by the feed
    pub target_position: Position,
    /// Degrees clockwise from north
    pub heading: Option<f64>,
    pub visible: bool,
    /// At most one animation in flight
    pub interpolation: Option<Interpolation>,
}

impl TrackedEntity {
    /// Start tracking `state`, `None` unless it is airborne with a known position
    #[must_use]
    pub fn from_state(state: &EntityState) -> Option<Self> {
        if !state.is_trackable() {
            return None;
        }
        let position = state.position()?;
        Some(Self {
            identifier: state.identifier.clone(),
            icao24: state.icao24.clone(),
            rendered_position: position,
            target_position: position,
            heading: state.heading,
            visible: true,
            interpolation: None,
        })
    }

    /// Key of this entity, never changes for its lifetime
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.interpolation.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Drop the in-flight animation, leaving the rendered position where it is
    pub fn cancel_interpolation(&mut self) {
        if let Some(mut job) = self.interpolation.take() {
            job.cancel();
        }
    }
}

/// All tracked entities, keyed by identifier
#[derive(Debug, Default, Clone)]
pub struct TrackedEntityStore(BTreeMap<String, TrackedEntity>);

impl fmt::Display for TrackedEntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, entity) in &self.0 {
            writeln!(
                f,
                "[{key}]: ({:.3}, {:.3})",
                entity.rendered_position.latitude, entity.rendered_position.longitude
            )?;
        }
        Ok(())
    }
}

/// public
impl TrackedEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// From identifier, get `TrackedEntity`
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TrackedEntity> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TrackedEntity> {
        self.0.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Insert or replace the entity stored under `id`
    ///
    /// The entity's own identifier must equal `id`.
    pub fn upsert(&mut self, id: &str, entity: TrackedEntity) -> Option<TrackedEntity> {
        debug_assert_eq!(id, entity.identifier(), "entity stored under a foreign key");
        self.0.insert(id.to_string(), entity)
    }

    /// Remove and return the entity, any animation it owned goes with it
    pub fn remove(&mut self, id: &str) -> Option<TrackedEntity> {
        self.0.remove(id)
    }

    /// Every tracked entity, in no particular order
    pub fn all(&self) -> btree_map::Values<'_, String, TrackedEntity> {
        self.0.values()
    }

    /// Tuple `iter()` of all `(identifier, TrackedEntity)`
    pub fn iter(&self) -> btree_map::Iter<'_, String, TrackedEntity> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, TrackedEntity> {
        self.0.iter_mut()
    }

    /// Get all identifiers
    pub fn keys(&self) -> btree_map::Keys<'_, String, TrackedEntity> {
        self.0.keys()
    }

    /// Amount of currently tracked entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove every entity whose identifier matches `drop`, returning the removed identifiers
    pub(crate) fn drain_where<F>(&mut self, mut drop: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let removed: Vec<String> = self.0.keys().filter(|k| drop(k)).cloned().collect();
        for key in &removed {
            self.0.remove(key);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str, on_ground: bool, position: Option<(f64, f64)>) -> EntityState {
        EntityState {
            identifier: id.to_string(),
            icao24: Some("abcdef".to_string()),
            latitude: position.map(|p| p.0),
            longitude: position.map(|p| p.1),
            on_ground,
            heading: Some(90.0),
        }
    }

    #[test]
    fn only_airborne_with_position() {
        assert!(TrackedEntity::from_state(&state("AAL1    ", true, Some((1.0, 1.0)))).is_none());
        assert!(TrackedEntity::from_state(&state("AAL1    ", false, None)).is_none());

        let entity = TrackedEntity::from_state(&state("AAL1    ", false, Some((1.0, 2.0)))).unwrap();
        assert_eq!(entity.identifier(), "AAL1    ");
        assert_eq!(entity.rendered_position, Position::new(1.0, 2.0));
        assert_eq!(entity.target_position, entity.rendered_position);
        assert!(entity.visible);
        assert!(!entity.is_animating());
    }

    #[test]
    fn upsert_get_remove() {
        let mut store = TrackedEntityStore::new();
        let entity = TrackedEntity::from_state(&state("AAL1    ", false, Some((1.0, 2.0)))).unwrap();
        assert!(store.upsert("AAL1    ", entity.clone()).is_none());
        assert!(store.upsert("AAL1    ", entity).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.contains("AAL1    "));
        assert!(store.get("AAL1").is_none());

        let other = TrackedEntity::from_state(&state("DAL2    ", false, Some((3.0, 4.0)))).unwrap();
        store.upsert("DAL2    ", other);
        assert_eq!(store.keys().cloned().collect::<Vec<_>>(), vec!["AAL1    ", "DAL2    "]);
        assert_eq!(store.all().count(), 2);

        let removed = store.drain_where(|id| id.starts_with("DAL"));
        assert_eq!(removed, vec!["DAL2    ".to_string()]);
        assert!(store.remove("AAL1    ").is_some());
        assert!(store.remove("AAL1    ").is_none());
        assert!(store.is_empty());
    }
}
