use std::path::PathBuf;
use std::time::Duration;

use apps::OPENSKY_URL;
use clap::Parser;
use skies_common::TrackerConfig;

const AFTER_TEST: &str = r#"Environment Variables:
    RUST_LOG: See "https://docs.rs/tracing-subscriber/latest/tracing_subscriber/fmt/index.html#filtering-events-with-environment-variables"
"#;

#[derive(Debug, Clone, Parser, PartialEq)]
#[command(
    version,
    name = "skies",
    about = "TUI map of live aircraft positions polled from OpenSky",
    after_help = AFTER_TEST,
)]
pub struct Opts {
    /// `states/all` endpoint to poll
    #[arg(long, default_value = OPENSKY_URL)]
    pub url: String,

    /// Replay a saved `states/all` JSON payload instead of polling --url
    ///
    /// The file is read again on every poll.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Seconds between two polls of the feed
    #[arg(long, default_value = "30")]
    pub poll_interval: u64,

    /// Degrees of latitude or longitude an aircraft may move between polls and still be animated,
    /// further moves jump
    #[arg(long, default_value = "0.5")]
    pub jump_threshold: f64,

    /// Number of steps of one animation
    #[arg(long, default_value = "100")]
    pub steps: u32,

    /// Milliseconds between two animation steps
    #[arg(long, default_value = "250")]
    pub step_cadence: u64,

    /// Latitude of the initial map center
    #[arg(long, default_value = "30.2672", allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the initial map center
    #[arg(long, default_value = "-97.7431", allow_negative_numbers = true)]
    pub long: f64,

    /// Zoom level of Map (-=zoom out/+=zoom in)
    #[arg(long, default_value = ".12")]
    pub scale: f64,

    /// Record every sighting into this JSON file, keyed by transponder address
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long, default_value = "logs")]
    pub log_folder: String,

    /// Print one line per poll instead of drawing the map
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many polls, only with --headless
    #[arg(long, requires = "headless")]
    pub polls: Option<u64>,

    /// Milliseconds before a poll of --url is abandoned
    #[arg(long, default_value = "10000")]
    pub timeout: u64,

    /// Disable display of callsigns next to aircraft on Map
    #[arg(long)]
    pub disable_callsign_labels: bool,

    /// Disable display of angles on aircraft within Map display showing the direction of the aircraft.
    #[arg(long)]
    pub disable_heading: bool,
}

impl Opts {
    /// Reconciliation and animation settings, still to be validated
    pub const fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            jump_threshold: self.jump_threshold,
            interpolation_steps: self.steps,
            step_cadence: Duration::from_millis(self.step_cadence),
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Opts {
        Opts {
            url: OPENSKY_URL.to_string(),
            replay: None,
            poll_interval: 30,
            jump_threshold: 0.5,
            steps: 100,
            step_cadence: 250,
            lat: 30.2672,
            long: -97.7431,
            scale: 0.12,
            db: None,
            log_folder: "logs".to_string(),
            headless: false,
            polls: None,
            timeout: 10_000,
            disable_callsign_labels: false,
            disable_heading: false,
        }
    }

    #[test]
    fn test_cli() {
        let opt = Opts::try_parse_from(["skies"]).unwrap();
        assert_eq!(defaults(), opt);
        assert_eq!(opt.tracker_config(), TrackerConfig::default());

        let t_str = [
            "skies",
            "--lat=35.00",
            "--long",
            "-80.00",
            "--replay",
            "states.json",
            "--db",
            "planes.json",
            "--jump-threshold=0.35",
            "--step-cadence=290",
            "--headless",
            "--polls=3",
            "--disable-heading",
        ];
        let opt = Opts::try_parse_from(t_str).unwrap();
        let exp_opt = Opts {
            lat: 35.0,
            long: -80.0,
            replay: Some(PathBuf::from("states.json")),
            db: Some(PathBuf::from("planes.json")),
            jump_threshold: 0.35,
            step_cadence: 290,
            headless: true,
            polls: Some(3),
            disable_heading: true,
            ..defaults()
        };
        assert_eq!(exp_opt, opt);
        assert!(opt.tracker_config().validate().is_ok());

        // a 100 x 400ms animation does not fit in 30s
        let opt = Opts::try_parse_from(["skies", "--step-cadence=400"]).unwrap();
        assert!(opt.tracker_config().validate().is_err());

        assert!(Opts::try_parse_from(["skies", "--polls=3"]).is_err());
    }
}
