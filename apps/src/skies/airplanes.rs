use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Row, Table, TableState};
use skies_common::TrackedEntityStore;

use crate::DEFAULT_PRECISION;

/// Render Airplanes tab for tui display
pub fn build_tab_airplanes(
    f: &mut ratatui::Frame,
    area: Rect,
    store: &TrackedEntityStore,
    airplanes_state: &mut TableState,
) {
    let mut rows = vec![];
    for (key, entity) in store.iter() {
        let heading =
            entity.heading.map_or_else(String::new, |heading| format!("{heading:>7.1}"));
        let moving = if entity.is_animating() { "moving" } else { "" };
        let visible = if entity.visible { "" } else { "hidden" };

        rows.push(Row::new(vec![
            key.trim_end().to_string(),
            entity.icao24.clone().unwrap_or_default(),
            format!("{:.DEFAULT_PRECISION$}", entity.rendered_position.latitude),
            format!("{:.DEFAULT_PRECISION$}", entity.rendered_position.longitude),
            format!("{:.DEFAULT_PRECISION$}", entity.target_position.latitude),
            format!("{:.DEFAULT_PRECISION$}", entity.target_position.longitude),
            heading,
            format!("{moving:>6}"),
            format!("{visible:>6}"),
        ]));
    }

    let rows_len = rows.len();

    // check the length of selected airplanes
    if let Some(selected) = airplanes_state.selected() {
        if selected >= rows_len {
            airplanes_state.select(rows_len.checked_sub(1));
        }
    }

    // draw table
    let widths = &[
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(6),
    ];
    let table = Table::new(rows, widths)
        .style(Style::default().fg(Color::White))
        .header(
            Row::new(vec![
                "Call sign",
                "ICAO",
                "Lat",
                "Long",
                "Target Lat",
                "Target Long",
                "Heading",
                "",
                "",
            ])
            .bottom_margin(1),
        )
        .block(Block::bordered().title(format!("Airplanes({rows_len})")))
        .column_spacing(1)
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, airplanes_state);
}
