/*!
Latitude/longitude [`Position`] and the rectangular [`Bounds`] of a map viewport
!*/

/// Post-processing of a snapshot row into Latitude/Longitude, in degrees
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `(lat_delta, lng_delta)` needed to move from `self` to `other`
    #[must_use]
    pub fn delta_to(&self, other: &Self) -> (f64, f64) {
        (other.latitude - self.latitude, other.longitude - self.longitude)
    }

    #[must_use]
    pub fn offset(&self, lat_delta: f64, lng_delta: f64) -> Self {
        Self { latitude: self.latitude + lat_delta, longitude: self.longitude + lng_delta }
    }
}

/// Viewport of a map, inclusive on every edge
///
/// Bounds crossing the antimeridian are not supported, `west` is expected to be smaller than
/// `east`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// The whole globe
    pub const WORLD: Self = Self { south: -90.0, west: -180.0, north: 90.0, east: 180.0 };

    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self { south, west, north, east }
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        (self.south..=self.north).contains(&position.latitude)
            && (self.west..=self.east).contains(&position.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_inclusive() {
        let bounds = Bounds::new(30.0, -98.0, 31.0, -97.0);
        assert!(bounds.contains(Position::new(30.0, -98.0)));
        assert!(bounds.contains(Position::new(31.0, -97.0)));
        assert!(bounds.contains(Position::new(30.5, -97.5)));
        assert!(!bounds.contains(Position::new(31.01, -97.5)));
        assert!(!bounds.contains(Position::new(30.5, -96.9)));
    }

    #[test]
    fn delta() {
        let from = Position::new(30.0, -97.0);
        let to = Position::new(30.25, -97.5);
        assert_eq!(from.delta_to(&to), (0.25, -0.5));
        assert_eq!(from.offset(0.25, -0.5), to);
    }
}
