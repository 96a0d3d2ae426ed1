use std::time::Duration;

use crate::error::{Result, SkiesError};

/// Width of the callsign field as reported by the feed, shorter callsigns are padded with spaces
pub const IDENTIFIER_WIDTH: usize = 8;

/// Tunables of reconciliation and interpolation
///
/// A tighter map may want a jump threshold of 0.35 degrees and a step cadence up to 300ms.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Degrees of latitude or longitude past which a marker jumps instead of animating
    pub jump_threshold: f64,
    /// Number of equal steps an animation is divided into
    pub interpolation_steps: u32,
    /// Time between two animation steps
    pub step_cadence: Duration,
    /// Time between two polls of the feed
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            jump_threshold: 0.5,
            interpolation_steps: 100,
            step_cadence: Duration::from_millis(250),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl TrackerConfig {
    /// Total time one animation takes from start to the last step, `Duration::MAX` on overflow
    #[must_use]
    pub fn animation_budget(&self) -> Duration {
        self.step_cadence.checked_mul(self.interpolation_steps).unwrap_or(Duration::MAX)
    }

    /// Check that an animation always finishes before the next poll is reconciled
    pub fn validate(&self) -> Result<()> {
        if !self.jump_threshold.is_finite() || self.jump_threshold < 0.0 {
            return Err(SkiesError::InvalidConfig(format!(
                "jump threshold must be a non-negative number of degrees, got {}",
                self.jump_threshold
            )));
        }
        if self.interpolation_steps == 0 {
            return Err(SkiesError::InvalidConfig("interpolation steps must be at least 1".into()));
        }
        if self.step_cadence.is_zero() {
            return Err(SkiesError::InvalidConfig("step cadence must be non-zero".into()));
        }
        if self.animation_budget() >= self.poll_interval {
            return Err(SkiesError::InvalidConfig(format!(
                "{} steps of {:?} ({:?}) do not fit in the poll interval of {:?}",
                self.interpolation_steps,
                self.step_cadence,
                self.animation_budget(),
                self.poll_interval
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = TrackerConfig::default();
        assert_eq!(config.animation_budget(), Duration::from_secs(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn animation_outliving_poll() {
        let config = TrackerConfig {
            interpolation_steps: 100,
            step_cadence: Duration::from_millis(300),
            poll_interval: Duration::from_secs(30),
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(SkiesError::InvalidConfig(_))));

        let config = TrackerConfig { step_cadence: Duration::from_millis(290), ..config };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        let config = TrackerConfig { interpolation_steps: 0, ..TrackerConfig::default() };
        assert!(config.validate().is_err());

        let config = TrackerConfig { jump_threshold: f64::NAN, ..TrackerConfig::default() };
        assert!(config.validate().is_err());

        let config = TrackerConfig { step_cadence: Duration::ZERO, ..TrackerConfig::default() };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            step_cadence: Duration::from_millis(u64::MAX),
            interpolation_steps: 1_000_000,
            ..TrackerConfig::default()
        };
        assert_eq!(config.animation_budget(), Duration::MAX);
        assert!(matches!(config.validate(), Err(SkiesError::InvalidConfig(_))));
    }
}
