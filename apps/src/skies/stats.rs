use std::time::SystemTime;

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Row, Table};
use skies_common::{ReconcileReport, SkiesError};
use time::macros::format_description;
use time::UtcOffset;
use tracing::info;

#[derive(Debug, Default)]
pub struct Stats {
    polls: u32,
    failed_polls: u32,
    last_poll: Option<SystemTime>,
    last_error: Option<(SystemTime, String)>,
    most_airplanes: Option<(SystemTime, usize)>,
    total_airplanes: usize,
    total_removed: usize,
    persistence_failures: usize,
}

impl Stats {
    pub fn update(&mut self, report: &ReconcileReport, tracked: usize) {
        let now = SystemTime::now();
        self.polls += 1;
        self.last_poll = Some(now);

        // Update most airplanes
        let most_airplanes = self.most_airplanes.map_or(0, |most_airplanes| most_airplanes.1);
        if most_airplanes < tracked {
            info!("new most airplanes: {tracked}");
            self.most_airplanes = Some((now, tracked));
        }

        self.total_airplanes += report.added;
        self.total_removed += report.removed;
        self.persistence_failures += report.persistence_failures;
    }

    pub fn failed(&mut self, e: &SkiesError) {
        self.failed_polls += 1;
        self.last_error = Some((SystemTime::now(), e.to_string()));
    }
}

/// Render Stats tab for tui display
pub fn build_tab_stats(f: &mut ratatui::Frame, area: Rect, stats: &Stats, utc_offset: UtcOffset) {
    let format = format_description!("[month]/[day] [hour]:[minute]:[second]");
    let display = |time: SystemTime| {
        time::OffsetDateTime::from(time)
            .to_offset(utc_offset)
            .format(format)
            .unwrap_or_default()
    };
    let all_time = || "All Time".to_string();

    let mut rows: Vec<Row> = vec![];

    let last_poll = stats.last_poll.map_or_else(|| "None".to_string(), display);
    rows.push(Row::new(vec!["Polls".to_string(), last_poll, stats.polls.to_string()]));

    let (time, value) = stats
        .last_error
        .as_ref()
        .map_or_else(|| ("None".to_string(), String::new()), |(time, e)| (display(*time), e.clone()));
    rows.push(Row::new(vec!["Failed Polls".to_string(), time, format!("{} {value}", stats.failed_polls)]));

    // Most airplanes tracked at one time
    let (time, value) = stats.most_airplanes.map_or_else(
        || ("None".to_string(), String::new()),
        |(time, most_airplanes)| (display(time), most_airplanes.to_string()),
    );
    rows.push(Row::new(vec!["Most Airplanes".to_string(), time, value]));

    rows.push(Row::new(vec![
        "Total Airplanes".to_string(),
        all_time(),
        stats.total_airplanes.to_string(),
    ]));
    rows.push(Row::new(vec![
        "Total Removed".to_string(),
        all_time(),
        stats.total_removed.to_string(),
    ]));
    rows.push(Row::new(vec![
        "Unrecorded".to_string(),
        all_time(),
        stats.persistence_failures.to_string(),
    ]));

    // draw table
    let widths = &[Constraint::Length(16), Constraint::Length(15), Constraint::Length(200)];
    let table = Table::new(rows, widths)
        .style(Style::default().fg(Color::White))
        .header(Row::new(vec!["Type", "DateTime", "Value"]).bottom_margin(1))
        .block(Block::bordered().title("Stats"))
        .column_spacing(1);
    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update() {
        let mut stats = Stats::default();
        let report = ReconcileReport { added: 3, ..ReconcileReport::default() };
        stats.update(&report, 3);
        let report = ReconcileReport { added: 1, removed: 2, ..ReconcileReport::default() };
        stats.update(&report, 2);
        stats.failed(&SkiesError::FetchFailure("timed out".into()));

        assert_eq!(stats.polls, 2);
        assert_eq!(stats.failed_polls, 1);
        assert_eq!(stats.total_airplanes, 4);
        assert_eq!(stats.total_removed, 2);
        assert_eq!(stats.most_airplanes.map(|(_, most)| most), Some(3));
        assert_eq!(stats.last_error.map(|(_, e)| e).as_deref(), Some("fetch failure: timed out"));
    }
}
