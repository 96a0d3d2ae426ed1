use tracing::debug;

use crate::config::IDENTIFIER_WIDTH;
use crate::error::{Result, SkiesError};
use crate::position::Position;
use crate::store::{TrackedEntity, TrackedEntityStore};

/// Turn user input into the feed's fixed-width callsign encoding
///
/// Uppercased and right-padded with spaces to [`IDENTIFIER_WIDTH`]. `None` for input that is empty
/// once trimmed.
#[must_use]
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("{:<width$}", trimmed.to_uppercase(), width = IDENTIFIER_WIDTH))
}

/// Find the entity a user typed in
///
/// `Ok(None)` for blank input, [`SkiesError::EntityNotFound`] when nothing matches.
pub fn find<'a>(store: &'a TrackedEntityStore, raw: &str) -> Result<Option<&'a TrackedEntity>> {
    let Some(id) = normalize_identifier(raw) else {
        return Ok(None);
    };
    match store.get(&id) {
        Some(entity) => {
            debug!("[{id}] found");
            Ok(Some(entity))
        },
        None => Err(SkiesError::EntityNotFound(id.trim_end().to_string())),
    }
}

/// Current rendered position of the entity a user typed in, to center or highlight on
pub fn lookup(store: &TrackedEntityStore, raw: &str) -> Result<Option<Position>> {
    Ok(find(store, raw)?.map(|entity| entity.rendered_position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::EntityState;

    fn store_with(id: &str) -> TrackedEntityStore {
        let mut store = TrackedEntityStore::new();
        let entity = TrackedEntity::from_state(&EntityState {
            identifier: id.to_string(),
            icao24: None,
            longitude: Some(-97.0),
            latitude: Some(30.0),
            on_ground: false,
            heading: None,
        })
        .unwrap();
        store.upsert(id, entity);
        store
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_identifier("abc").as_deref(), Some("ABC     "));
        assert_eq!(normalize_identifier("  swa1234 ").as_deref(), Some("SWA1234 "));
        assert_eq!(normalize_identifier("ABCDEFGH").as_deref(), Some("ABCDEFGH"));
        // longer than the feed's field is left alone, it can never match
        assert_eq!(normalize_identifier("abcdefghij").as_deref(), Some("ABCDEFGHIJ"));
        assert_eq!(normalize_identifier("   "), None);
        assert_eq!(normalize_identifier(""), None);
    }

    #[test]
    fn lookup_padded_key() {
        let store = store_with("ABC     ");
        assert_eq!(lookup(&store, "abc").unwrap(), Some(Position::new(30.0, -97.0)));
        assert_eq!(find(&store, " Abc ").unwrap().unwrap().identifier(), "ABC     ");
    }

    #[test]
    fn blank_is_silent() {
        let store = store_with("ABC     ");
        assert_eq!(lookup(&store, "  ").unwrap(), None);
    }

    #[test]
    fn not_found() {
        let store = store_with("ABC     ");
        assert_eq!(
            lookup(&store, "xyz"),
            Err(SkiesError::EntityNotFound("XYZ".to_string()))
        );
        assert_eq!(SkiesError::EntityNotFound("XYZ".to_string()).to_string(), "XYZ could not be found");
    }
}
