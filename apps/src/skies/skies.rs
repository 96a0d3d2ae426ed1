//! This tui program polls live aircraft positions from OpenSky and displays them on a map around
//! your chosen position, moving every aircraft smoothly between two polls.

mod cli;
use crate::cli::Opts;

mod map;
use crate::map::{build_tab_map, Projection, TerminalMap};

mod stats;
use crate::stats::{build_tab_stats, Stats};

mod help;
use crate::help::build_tab_help;

mod airplanes;
use std::io;
use std::sync::mpsc::{self, Sender, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use apps::{FileFeed, JsonFileStore, OpenSkyFeed};
use clap::Parser;
use crossterm::event::{
    poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::symbols::DOT;
use ratatui::widgets::{Block, Paragraph, TableState, Tabs};
use ratatui::Terminal;
use serde_json::Value;
use skies_common::{CommandLog, FeedSource, MapRenderer, Tracker};
use time::UtcOffset;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::airplanes::build_tab_airplanes;

/// Amount of zoom out from your original lat/long position
const MAX_PLOT_HIGH: f64 = 400.0;
const MAX_PLOT_LOW: f64 = MAX_PLOT_HIGH * -1.0;

/// tui top bar margin
const TUI_START_MARGIN: u16 = 1;

/// width of tui top bar
const TUI_BAR_WIDTH: u16 = 3;

/// default precision of latitude, longitude, and distance
pub const DEFAULT_PRECISION: usize = 3;

/// Share of the visible area the map moves per arrow key
const PAN_FRACTION: f64 = 0.05;

/// Available top row Tabs
#[derive(Copy, Clone)]
enum Tab {
    Map,
    Airplanes,
    Stats,
    Help,
}

impl Tab {
    const ALL: [Self; 4] = [Self::Map, Self::Airplanes, Self::Stats, Self::Help];

    pub const fn next_tab(self) -> Self {
        match self {
            Self::Map => Self::Airplanes,
            Self::Airplanes => Self::Stats,
            Self::Stats => Self::Help,
            Self::Help => Self::Map,
        }
    }
}

/// Enum representing any reason that the main event loop was exited
enum QuitReason {
    /// The feed thread is gone, no more snapshots will arrive
    FeedDisconnect,
    /// User used a tui method to exit the app, we do what the user wants
    UserRequested,
}

impl std::fmt::Display for QuitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeedDisconnect => write!(f, "feed stopped, quitting skies tui"),
            Self::UserRequested => write!(f, "user requested quit"),
        }
    }
}

/// After parsing from `Opts` contains more settings mutated in program
pub struct Settings {
    /// opts from clap command line
    opts: Opts,
    /// when Some(), imply quitting with msg
    quit: Option<QuitReason>,
    /// mutable current map selection
    tab_selection: Tab,
    /// last seen mouse clicking position
    last_mouse_dragging: Option<(u16, u16)>,
    /// marker under the mouse
    hovered: Option<String>,
    /// callsign being typed, after `/`
    search: Option<String>,
    /// outcome of the last search or failed poll
    status: Option<String>,
    /// DateTime offset
    utc_offset: UtcOffset,
}

impl Settings {
    const fn new(opts: Opts, utc_offset: UtcOffset) -> Self {
        Self {
            opts,
            quit: None,
            tab_selection: Tab::Map,
            last_mouse_dragging: None,
            hovered: None,
            search: None,
            status: None,
            utc_offset,
        }
    }
}

fn main() -> Result<()> {
    // grab the local offset from localtime_r while we are a single thread for safety
    let utc_offset = time::OffsetDateTime::now_local().map_or(UtcOffset::UTC, |now| now.offset());

    // Parse arguments
    let opts = Opts::parse();

    // Generate logs file and start logging
    let file_appender = tracing_appender::rolling::daily(&opts.log_folder, "skies.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_ansi(true)
        .with_writer(non_blocking)
        .with_line_number(true)
        .with_file(true)
        .init();

    // print current version
    let version = env!("CARGO_PKG_VERSION");
    info!("starting skies-v{version} with options: {opts:?}");

    let mut tracker = Tracker::new(opts.tracker_config()).context("invalid animation settings")?;
    if let Some(db) = &opts.db {
        let documents = JsonFileStore::open(db, JsonFileStore::FLUSH_EVERY)
            .with_context(|| format!("unable to open {}", db.display()))?;
        tracker = tracker.with_documents(Box::new(documents));
    }

    let feed: Box<dyn FeedSource> = match &opts.replay {
        Some(path) => {
            info!("replaying {}", path.display());
            Box::new(FileFeed::new(path))
        },
        None => Box::new(
            OpenSkyFeed::new(&opts.url, Duration::from_millis(opts.timeout))
                .context("unable to create http client")?,
        ),
    };

    if opts.headless {
        run_headless(&mut tracker, feed, opts.polls);
        return Ok(());
    }

    // setup tui params
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?.execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // polls run in their own thread, results are applied here in the order they arrive
    let (tx, rx) = mpsc::channel();
    let poll_interval = tracker.config().poll_interval;
    std::thread::spawn(move || feed_thread(feed, poll_interval, &tx));

    // setup tui variables
    let mut airplanes_state = TableState::default();
    let mut stats = Stats::default();
    let mut map = TerminalMap::new(Projection::new(opts.lat, opts.long, opts.scale));
    let mut viewport = map.viewport_bounds();

    // create settings, dropping opts to prevent bad usage of variable
    let mut settings = Settings::new(opts, utc_offset);

    // Startup main loop
    info!("tui setup");
    while settings.quit.is_none() {
        loop {
            let payload = match rx.try_recv() {
                Ok(payload) => payload,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    settings.quit = Some(QuitReason::FeedDisconnect);
                    break;
                },
            };
            let now = Instant::now();
            match payload.and_then(|payload| tracker.apply_payload(&payload, &mut map, now)) {
                Ok(report) => stats.update(&report, tracker.store().len()),
                Err(e) => {
                    stats.failed(&e);
                    settings.status = Some(format!("poll skipped: {e}"));
                },
            }
        }

        tracker.tick(&mut map, Instant::now());

        // show and hide markers after the operator moved the map
        let bounds = map.viewport_bounds();
        if bounds != viewport {
            let changed = tracker.refresh_visibility(&mut map);
            debug!("viewport {bounds:?}, {changed} markers changed visibility");
            viewport = bounds;
        }

        // draw crossterm tui display
        draw(version, &mut terminal, &tracker, &mut map, &settings, &mut airplanes_state, &stats)?;

        // handle crossterm events
        //
        // Loop until all MouseEvents are read, if you don't do this it takes forever to read
        // all the moved mouse signals and repeated keyboard events
        while poll(Duration::from_millis(20))? {
            match read()? {
                // handle keyboard events
                Event::Key(key_event) => {
                    trace!("{:?}", key_event);
                    handle_keyevent(
                        key_event,
                        &mut settings,
                        &tracker,
                        &mut map,
                        &mut airplanes_state,
                    );
                },
                // handle mouse events
                Event::Mouse(mouse_event) => {
                    trace!("{:?}", mouse_event);
                    handle_mouseevent(mouse_event, &mut settings, &tracker, &mut map);
                },
                _ => (),
            }
        }
    }

    // cleanup and quit
    terminal.clear()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    disable_raw_mode()?;
    terminal.show_cursor()?;
    let reason = settings.quit.map_or_else(String::new, |reason| reason.to_string());
    println!("skies quitting: {reason}");
    info!("quitting: {reason}");
    Ok(())
}

/// function ran within a thread fetching a snapshot right away and then every `poll_interval`,
/// until the receiving side is gone
fn feed_thread(
    mut feed: Box<dyn FeedSource>,
    poll_interval: Duration,
    tx: &Sender<skies_common::Result<Value>>,
) {
    loop {
        let result = feed.fetch_snapshot();
        if let Err(e) = &result {
            warn!("[feed] {e}");
        }
        if tx.send(result).is_err() {
            debug!("[feed] receiver dropped");
            return;
        }
        std::thread::sleep(poll_interval);
    }
}

/// Poll and reconcile without a terminal, printing one line per poll
///
/// Markers are kept in a [`CommandLog`] spanning the whole world, so every update is animated.
fn run_headless(tracker: &mut Tracker, mut feed: Box<dyn FeedSource>, polls: Option<u64>) {
    let mut map = CommandLog::default();
    let poll_interval = tracker.config().poll_interval;

    for attempt in 1_u64.. {
        let start = Instant::now();
        match tracker.poll(feed.as_mut(), &mut map, start) {
            Ok(report) => println!("{attempt}: {} tracked, {report}", tracker.store().len()),
            Err(e) => println!("{attempt}: poll skipped, {e}"),
        }
        if polls.is_some_and(|polls| attempt >= polls) {
            break;
        }

        // sleep until the next step is due, or the next poll
        let next_poll = start + poll_interval;
        loop {
            let now = Instant::now();
            if now >= next_poll {
                break;
            }
            tracker.tick(&mut map, now);
            trace!("{} render commands", map.take_commands().len());
            let wake = tracker.next_step_due().map_or(next_poll, |due| due.min(next_poll));
            std::thread::sleep(wake.saturating_duration_since(Instant::now()));
        }
    }
}

/// Handle a `KeyEvent`
fn handle_keyevent(
    key_event: KeyEvent,
    settings: &mut Settings,
    tracker: &Tracker,
    map: &mut TerminalMap,
    airplanes_state: &mut TableState,
) {
    let modifiers = key_event.modifiers;
    let code = key_event.code;
    if code == KeyCode::Char('c') && modifiers == KeyModifiers::CONTROL {
        settings.quit = Some(QuitReason::UserRequested);
        return;
    }

    // typing into the search line
    if let Some(input) = &mut settings.search {
        match code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            },
            KeyCode::Esc => settings.search = None,
            KeyCode::Enter => {
                let input = settings.search.take().unwrap_or_default();
                search(&input, settings, tracker, map);
            },
            _ => (),
        }
        return;
    }

    let current_selection = settings.tab_selection;
    match (code, current_selection) {
        // All Tabs
        (KeyCode::F(1), _) => settings.tab_selection = Tab::Map,
        (KeyCode::F(2), _) => settings.tab_selection = Tab::Airplanes,
        (KeyCode::F(3), _) => settings.tab_selection = Tab::Stats,
        (KeyCode::F(4), _) => settings.tab_selection = Tab::Help,
        (KeyCode::Tab, _) => settings.tab_selection = settings.tab_selection.next_tab(),
        (KeyCode::Char('q'), _) => settings.quit = Some(QuitReason::UserRequested),
        (KeyCode::Char('/'), _) => {
            settings.search = Some(String::new());
            settings.status = None;
        },
        (KeyCode::Char('h'), _) => settings.opts.disable_heading ^= true,
        (KeyCode::Char('n'), _) => settings.opts.disable_callsign_labels ^= true,
        // Map
        (KeyCode::Char('-'), Tab::Map) => map.projection.zoom_out(),
        (KeyCode::Char('+'), Tab::Map) => map.projection.zoom_in(),
        (KeyCode::Up, Tab::Map) => pan(map, 1.0, 0.0),
        (KeyCode::Down, Tab::Map) => pan(map, -1.0, 0.0),
        (KeyCode::Left, Tab::Map) => pan(map, 0.0, -1.0),
        (KeyCode::Right, Tab::Map) => pan(map, 0.0, 1.0),
        (KeyCode::Enter, Tab::Map) => map.projection.reset(),
        // Airplanes
        (KeyCode::Up, Tab::Airplanes) => {
            let index = airplanes_state
                .selected()
                .and_then(|selected| selected.checked_sub(1))
                .unwrap_or(0);
            airplanes_state.select(Some(index));
        },
        (KeyCode::Down, Tab::Airplanes) => {
            let index = airplanes_state.selected().map_or(0, |selected| selected + 1);
            airplanes_state.select(Some(index));
        },
        (KeyCode::Enter, Tab::Airplanes) => {
            let selected =
                airplanes_state.selected().and_then(|selected| tracker.store().all().nth(selected));
            if let Some(entity) = selected {
                map.projection.center_on(entity.rendered_position);
                map.highlight(entity.identifier());
                settings.tab_selection = Tab::Map;
            }
        },
        _ => (),
    }
}

/// Move the map by `PAN_FRACTION` of the visible area, `up` and `right` being -1, 0 or 1
fn pan(map: &mut TerminalMap, up: f64, right: f64) {
    let bounds = map.viewport_bounds();
    map.projection.pan(
        (bounds.north - bounds.south) * PAN_FRACTION * up,
        (bounds.east - bounds.west) * PAN_FRACTION * right,
    );
}

/// Center on and highlight the aircraft typed into the search line
fn search(input: &str, settings: &mut Settings, tracker: &Tracker, map: &mut TerminalMap) {
    match tracker.search(input) {
        Ok(Some(entity)) => {
            let id = entity.identifier();
            info!("[{id}] search hit");
            map.highlight(id);
            map.projection.center_on(entity.rendered_position);
            settings.tab_selection = Tab::Map;
            settings.status = Some(format!("{} found", id.trim_end()));
        },
        Ok(None) => settings.status = None,
        Err(e) => {
            info!("search: {e}");
            settings.status = Some(format!("{e}!"));
        },
    }
}

/// Tab under `column` of the top bar, following the layout `Tabs` draws: one padding space on
/// each side of a title and a one cell divider
fn tab_at(column: u16, titles: &[String]) -> Option<Tab> {
    let mut start = TUI_START_MARGIN + 1;
    for (tab, title) in Tab::ALL.into_iter().zip(titles) {
        let width = u16::try_from(title.chars().count()).unwrap_or(u16::MAX).saturating_add(2);
        if (start..start.saturating_add(width)).contains(&column) {
            return Some(tab);
        }
        start = start.saturating_add(width).saturating_add(1);
    }
    None
}

fn tab_titles(tracker: &Tracker) -> Vec<String> {
    vec![
        "Map".to_string(),
        format!("Airplanes({})", tracker.store().len()),
        "Stats".to_string(),
        "Help".to_string(),
    ]
}

/// Handle a `MouseEvent`
fn handle_mouseevent(
    mouse_event: MouseEvent,
    settings: &mut Settings,
    tracker: &Tracker,
    map: &mut TerminalMap,
) {
    let pixel = (mouse_event.column, mouse_event.row);
    match mouse_event.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            // Tabs
            if (TUI_START_MARGIN..=TUI_BAR_WIDTH).contains(&mouse_event.row) {
                if let Some(tab) = tab_at(mouse_event.column, &tab_titles(tracker)) {
                    settings.tab_selection = tab;
                }
                return;
            }

            // zoom in on the clicked aircraft
            if matches!(settings.tab_selection, Tab::Map) {
                if let Some(id) = map.hit_test(pixel) {
                    if let Some(position) = map.marker(&id).map(|marker| marker.position) {
                        debug!("[{id}] clicked");
                        map.projection.center_on(position);
                        map.projection.zoom_in();
                        map.highlight(&id);
                    }
                }
            }
        },
        MouseEventKind::Moved => {
            settings.hovered = match settings.tab_selection {
                Tab::Map => map.hit_test(pixel),
                Tab::Airplanes | Tab::Stats | Tab::Help => None,
            };
        },
        MouseEventKind::Drag(MouseButton::Left) => {
            // check tab
            if !matches!(settings.tab_selection, Tab::Map) {
                return;
            }

            // check bounds below tab selection
            if mouse_event.row < TUI_BAR_WIDTH {
                return;
            }

            // if we have a previous mouse drag without a mouse lift, change the current position
            if let Some((column, row)) = settings.last_mouse_dragging {
                let bounds = map.viewport_bounds();
                let up = f64::from(i32::from(mouse_event.row) - i32::from(row));
                let left = f64::from(i32::from(mouse_event.column) - i32::from(column));
                map.projection.pan(
                    up * (bounds.north - bounds.south) * 0.02,
                    -left * (bounds.east - bounds.west) * 0.01,
                );
            }
            settings.last_mouse_dragging = Some(pixel);
        },
        MouseEventKind::Up(_) => {
            settings.last_mouse_dragging = None;
        },
        MouseEventKind::ScrollDown => map.projection.zoom_out(),
        MouseEventKind::ScrollUp => map.projection.zoom_in(),
        _ => (),
    }
}

fn draw(
    version: &str,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    tracker: &Tracker,
    map: &mut TerminalMap,
    settings: &Settings,
    airplanes_state: &mut TableState,
    stats: &Stats,
) -> Result<()> {
    terminal.draw(|f| {
        // create layout
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        // render tabs
        let (center, custom) = map.projection.center();
        let view_type = if custom { "(CUSTOM)" } else { "" };
        let tab = Tabs::new(tab_titles(tracker))
            .block(Block::bordered().title(format!(
                "skies(v{version}) - ({:.DEFAULT_PRECISION$},{:.DEFAULT_PRECISION$}) {view_type}",
                center.latitude, center.longitude
            )))
            .style(Style::default().fg(Color::White))
            .highlight_style(Style::default().fg(Color::Green))
            .select(settings.tab_selection as usize)
            .divider(DOT);
        f.render_widget(tab, chunks[0]);

        // render the bottom canvas depending on the chosen tab
        match settings.tab_selection {
            Tab::Map => build_tab_map(f, chunks[1], settings, map, tracker.store()),
            Tab::Airplanes => build_tab_airplanes(f, chunks[1], tracker.store(), airplanes_state),
            Tab::Stats => build_tab_stats(f, chunks[1], stats, settings.utc_offset),
            Tab::Help => build_tab_help(f, chunks[1]),
        }

        f.render_widget(status_line(settings), chunks[2]);
    })?;
    Ok(())
}

fn status_line(settings: &Settings) -> Paragraph<'static> {
    match (&settings.search, &settings.status) {
        (Some(input), _) => {
            Paragraph::new(format!("/{input}")).style(Style::default().fg(Color::Yellow))
        },
        (None, Some(status)) => Paragraph::new(status.clone()),
        (None, None) => {
            Paragraph::new("/ to search, q to quit").style(Style::default().fg(Color::DarkGray))
        },
    }
}
