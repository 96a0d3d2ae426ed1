use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Row, Table};

/// Render Help tab for tui display
pub fn build_tab_help(f: &mut ratatui::Frame, area: Rect) {
    let horizontal_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(2),
            Constraint::Percentage(96),
            Constraint::Percentage(2),
        ])
        .split(area);

    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(2),
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(15),
            Constraint::Percentage(2),
        ])
        .split(horizontal_chunks[1]);

    // First help section
    let rows = vec![
        Row::new(vec!["F1", "Move to Map screen"]),
        Row::new(vec!["F2", "Move to Airplanes screen"]),
        Row::new(vec!["F3", "Move to Stats screen"]),
        Row::new(vec!["F4", "Move to Help screen"]),
        Row::new(vec!["/", "Search a callsign, Enter to find it and Esc to cancel"]),
        Row::new(vec!["h", "control --disable-heading"]),
        Row::new(vec!["n", "control --disable-callsign-labels"]),
        Row::new(vec!["TAB", "Move to Next screen"]),
        Row::new(vec!["q", "Quit this app"]),
        Row::new(vec!["ctrl+c", "Quit this app"]),
    ];
    let widths = &[Constraint::Percentage(10), Constraint::Percentage(90)];
    let table = Table::new(rows, widths)
        .style(Style::default().fg(Color::White))
        .header(Row::new(vec!["Key", "Action"]).bottom_margin(1))
        .column_spacing(1)
        .block(Block::bordered().title("Key Bindings - Any Tab"));
    f.render_widget(table, vertical_chunks[1]);

    // Second help section
    let rows = vec![
        Row::new(vec!["-", "Zoom out"]),
        Row::new(vec!["+", "Zoom in"]),
        Row::new(vec!["Up", "Move map up"]),
        Row::new(vec!["Down", "Move map down"]),
        Row::new(vec!["Left", "Move map left"]),
        Row::new(vec!["Right", "Move map right"]),
        Row::new(vec!["Enter", "Map position reset"]),
        Row::new(vec!["Mouse", "Hover an aircraft for details, click to center on it"]),
    ];
    let table = Table::new(rows, widths)
        .style(Style::default().fg(Color::White))
        .header(Row::new(vec!["Key", "Action"]).bottom_margin(1))
        .column_spacing(1)
        .block(Block::bordered().title("Key Bindings - Map"));
    f.render_widget(table, vertical_chunks[2]);

    // Third help section
    let rows = [
        Row::new(vec!["Up", "Move selection upward"]),
        Row::new(vec!["Down", "Move selection downward"]),
        Row::new(vec!["Enter", "Center Map tab on selected aircraft"]),
    ];
    let table = Table::new(rows, widths)
        .style(Style::default().fg(Color::White))
        .header(Row::new(vec!["Key", "Action"]).bottom_margin(1))
        .column_spacing(1)
        .block(Block::bordered().title("Key Bindings - Airplanes"));
    f.render_widget(table, vertical_chunks[3]);
}
