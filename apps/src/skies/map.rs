use std::collections::BTreeMap;

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::canvas::{Canvas, Line, Points};
use ratatui::widgets::{Block, Clear, Paragraph};
use skies_common::{Bounds, MapRenderer, Pixel, Position, TrackedEntityStore};
use tracing::trace;

use crate::{Settings, DEFAULT_PRECISION, MAX_PLOT_HIGH, MAX_PLOT_LOW};

mod scale {
    /// Diff between scale changes
    pub const CHANGE: f64 = 1.1;

    /// Value used as mutiplier in map scaling for projection
    pub const DEFAULT: f64 = 500_000.0;
}

/// Marker color of the aircraft found by the last search
const HIGHLIGHT: Color = Color::Rgb(0, 191, 255);

/// Mercator projection of the world onto the map canvas, centered on the operator's position
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// starting scale, restored on reset
    default_scale: f64,
    /// current scale from operator
    scale: f64,
    /// starting center
    lat: f64,
    long: f64,
    /// center after the operator moved the map
    custom_lat: Option<f64>,
    custom_long: Option<f64>,
}

impl Projection {
    pub const fn new(lat: f64, long: f64, scale: f64) -> Self {
        Self { default_scale: scale, scale, lat, long, custom_lat: None, custom_long: None }
    }

    /// Current center, and whether the operator moved it
    pub fn center(&self) -> (Position, bool) {
        let custom = self.custom_lat.is_some() || self.custom_long.is_some();
        let lat = self.custom_lat.unwrap_or(self.lat);
        let long = self.custom_long.unwrap_or(self.long);
        (Position::new(lat, long), custom)
    }

    /// Convert new lat/long into canvas coordinates around the current center
    pub fn to_xy(&self, position: Position) -> (f64, f64) {
        let (local_x, local_y) = self.local_lat_lon();
        let (x, y) = self.to_mercator(position.latitude, position.longitude);
        let (x, y) = (x - local_x, y - local_y);
        (x, y * -1.0)
    }

    /// Inverse of [`Self::to_xy`]
    pub fn from_xy(&self, x: f64, y: f64) -> Position {
        let scale = self.scale * scale::DEFAULT;
        let (local_x, local_y) = self.local_lat_lon();

        let longitude = (x + local_x) * (360.0 / scale) - 180.0;
        let merc_n = ((scale / 2.0) - (local_y - y)) * (2.0 * std::f64::consts::PI) / scale;
        let latitude = (2.0 * merc_n.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        Position::new(latitude, longitude)
    }

    /// World area covered by the canvas
    pub fn bounds(&self) -> Bounds {
        let north_west = self.from_xy(MAX_PLOT_LOW, MAX_PLOT_HIGH);
        let south_east = self.from_xy(MAX_PLOT_HIGH, MAX_PLOT_LOW);
        Bounds::new(
            south_east.latitude,
            north_west.longitude,
            north_west.latitude,
            south_east.longitude,
        )
    }

    /// Calculate mercator for the current center
    fn local_lat_lon(&self) -> (f64, f64) {
        let (center, _) = self.center();
        self.to_mercator(center.latitude, center.longitude)
    }

    /// Convert lat/long to mercator coordinates
    fn to_mercator(&self, lat: f64, long: f64) -> (f64, f64) {
        let scale: f64 = self.scale * scale::DEFAULT;

        let x = (long + 180.0) * (scale / 360.0);
        let lat_rad = lat.to_radians();
        let merc_n = f64::ln(f64::tan((std::f64::consts::PI / 4.0) + (lat_rad / 2.0)));
        let y = (scale / 2.0) - (scale * merc_n / (2.0 * std::f64::consts::PI));

        (x, y)
    }

    pub fn zoom_out(&mut self) {
        self.scale /= scale::CHANGE;
    }

    pub fn zoom_in(&mut self) {
        self.scale *= scale::CHANGE;
    }

    /// Move the center by `lat_delta` and `long_delta` degrees
    pub fn pan(&mut self, lat_delta: f64, long_delta: f64) {
        let (center, _) = self.center();
        self.custom_lat = Some(center.latitude + lat_delta);
        self.custom_long = Some(center.longitude + long_delta);
    }

    pub fn center_on(&mut self, position: Position) {
        self.custom_lat = Some(position.latitude);
        self.custom_long = Some(position.longitude);
    }

    pub fn reset(&mut self) {
        self.custom_lat = None;
        self.custom_long = None;
        self.scale = self.default_scale;
    }
}

/// One aircraft as drawn on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Position,
    pub heading: Option<f64>,
    pub visible: bool,
}

/// [`MapRenderer`] drawing markers onto a ratatui canvas
#[derive(Debug)]
pub struct TerminalMap {
    pub projection: Projection,
    markers: BTreeMap<String, Marker>,
    /// area inside the map border from the last draw, for mouse hits
    canvas: Option<Rect>,
    highlighted: Option<String>,
}

impl TerminalMap {
    pub const fn new(projection: Projection) -> Self {
        Self { projection, markers: BTreeMap::new(), canvas: None, highlighted: None }
    }

    pub fn markers(&self) -> impl Iterator<Item = (&String, &Marker)> {
        self.markers.iter()
    }

    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Highlight `id`, un-highlighting whatever was highlighted before
    pub fn highlight(&mut self, id: &str) {
        if let Some(previous) = self.highlighted.replace(id.to_string()) {
            trace!("[{previous}] un-highlight");
        }
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn set_canvas(&mut self, area: Rect) {
        self.canvas = Some(area.inner(ratatui::layout::Margin::new(1, 1)));
    }

    /// Canvas coordinates at the center of terminal cell `(column, row)`, with the size of a cell
    fn cell_to_xy(&self, (column, row): Pixel) -> Option<((f64, f64), (f64, f64))> {
        let canvas = self.canvas?;
        let inside = (canvas.x..canvas.x + canvas.width).contains(&column)
            && (canvas.y..canvas.y + canvas.height).contains(&row);
        if !inside {
            return None;
        }
        let cell_w = (MAX_PLOT_HIGH - MAX_PLOT_LOW) / f64::from(canvas.width);
        let cell_h = (MAX_PLOT_HIGH - MAX_PLOT_LOW) / f64::from(canvas.height);
        let x = MAX_PLOT_LOW + (f64::from(column - canvas.x) + 0.5) * cell_w;
        let y = MAX_PLOT_HIGH - (f64::from(row - canvas.y) + 0.5) * cell_h;
        Some(((x, y), (cell_w, cell_h)))
    }
}

impl MapRenderer for TerminalMap {
    fn render(&mut self, id: &str, position: Position, heading: Option<f64>, visible: bool) {
        self.markers.insert(id.to_string(), Marker { position, heading, visible });
    }

    fn move_to(&mut self, id: &str, position: Position) {
        if let Some(marker) = self.markers.get_mut(id) {
            marker.position = position;
        }
    }

    fn remove(&mut self, id: &str) {
        self.markers.remove(id);
        if self.highlighted.as_deref() == Some(id) {
            self.highlighted = None;
        }
    }

    /// Closest visible marker within about one cell of `pixel`
    fn hit_test(&self, pixel: Pixel) -> Option<String> {
        let ((x, y), (cell_w, cell_h)) = self.cell_to_xy(pixel)?;
        self.markers
            .iter()
            .filter(|(_, marker)| marker.visible)
            .map(|(id, marker)| {
                let (m_x, m_y) = self.projection.to_xy(marker.position);
                let (d_x, d_y) = ((m_x - x) / cell_w, (m_y - y) / cell_h);
                (id, d_x * d_x + d_y * d_y)
            })
            .filter(|(_, distance)| *distance <= 1.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id.clone())
    }

    fn viewport_bounds(&self) -> Bounds {
        self.projection.bounds()
    }
}

/// Draw vertical and horizontal lines
fn draw_lines(ctx: &mut ratatui::widgets::canvas::Context<'_>) {
    ctx.draw(&Line { x1: MAX_PLOT_HIGH, y1: 0.0, x2: MAX_PLOT_LOW, y2: 0.0, color: Color::DarkGray });
    ctx.draw(&Line { x1: 0.0, y1: MAX_PLOT_HIGH, x2: 0.0, y2: MAX_PLOT_LOW, color: Color::DarkGray });
}

/// Make wings for the angle directions facing toward the heading. This tries to account for the
/// angles not showing up around the 90 degree mark, of which I add degrees of the angle before
/// displaying
fn draw_heading(ctx: &mut ratatui::widgets::canvas::Context<'_>, (x, y): (f64, f64), heading: f64) {
    const ANGLE: f64 = 20.0;
    const LENGTH: f64 = 8.0;

    let addition_heading = (heading % 90.0) / 10.0;
    let angle = ANGLE + addition_heading;

    let heading = (heading + 180.0) % 360.0;
    // wrap around the angle since we are are subtracting
    let n_heading = if heading > angle { heading - angle } else { (360.0 + heading) - angle };

    for n_heading in [n_heading, (heading + angle) % 360.0] {
        let (sin, cos) = n_heading.to_radians().sin_cos();
        // move the first point out, so that the point of the aircraft _usually_ shows.
        ctx.draw(&Line {
            x1: x + 2.0 * sin,
            y1: y + 2.0 * cos,
            x2: x + LENGTH * sin,
            y2: y + LENGTH * cos,
            color: Color::Blue,
        });
    }
}

/// Render Map tab for tui display
pub fn build_tab_map(
    f: &mut ratatui::Frame,
    area: Rect,
    settings: &Settings,
    map: &mut TerminalMap,
    store: &TrackedEntityStore,
) {
    map.set_canvas(area);
    let map = &*map;

    let canvas = Canvas::default()
        .block(Block::bordered().title("Map"))
        .x_bounds([MAX_PLOT_LOW, MAX_PLOT_HIGH])
        .y_bounds([MAX_PLOT_LOW, MAX_PLOT_HIGH])
        .paint(|ctx| {
            draw_lines(ctx);

            for (id, marker) in map.markers().filter(|(_, marker)| marker.visible) {
                let (x, y) = map.projection.to_xy(marker.position);

                if !settings.opts.disable_heading {
                    if let Some(heading) = marker.heading {
                        draw_heading(ctx, (x, y), heading);
                    }
                }

                let color =
                    if map.highlighted() == Some(id.as_str()) { HIGHLIGHT } else { Color::White };

                if !settings.opts.disable_callsign_labels {
                    ctx.print(x, y + 20.0, Span::styled(id.trim_end().to_string(), Style::default().fg(color)));
                }

                // draw dot on actual lat/lon
                ctx.draw(&Points { coords: &[(x, y)], color });
            }
        });
    f.render_widget(canvas, area);

    if let Some(hovered) = &settings.hovered {
        draw_popup(f, area, hovered, map, store);
    }
}

/// Details of the hovered aircraft in the corner of the map
fn draw_popup(f: &mut ratatui::Frame, area: Rect, id: &str, map: &TerminalMap, store: &TrackedEntityStore) {
    let Some(marker) = map.marker(id) else {
        return;
    };
    let icao24 = store.get(id).and_then(|entity| entity.icao24.clone()).unwrap_or_default();
    let heading = marker.heading.map_or_else(String::new, |heading| format!("{heading:.1}"));
    let text = format!(
        "{}\nicao24:  {icao24}\nlat:     {:.DEFAULT_PRECISION$}\nlong:    {:.DEFAULT_PRECISION$}\nheading: {heading}",
        id.trim_end(),
        marker.position.latitude,
        marker.position.longitude,
    );

    let popup = Rect::new(area.x + 2, area.y + 1, 24, 7).intersection(area);
    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(text).block(Block::bordered()), popup);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn austin() -> Projection {
        Projection::new(30.2672, -97.7431, 0.12)
    }

    #[test]
    fn projection_round_trip() {
        let projection = austin();
        let (x, y) = projection.to_xy(Position::new(30.2672, -97.7431));
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);

        let position = Position::new(30.8, -97.1);
        let (x, y) = projection.to_xy(position);
        assert!(x > 0.0 && y > 0.0);
        let back = projection.from_xy(x, y);
        assert!((back.latitude - position.latitude).abs() < 1e-9);
        assert!((back.longitude - position.longitude).abs() < 1e-9);
    }

    #[test]
    fn viewport_follows_projection() {
        let mut projection = austin();
        let bounds = projection.bounds();
        assert!(bounds.contains(Position::new(30.2672, -97.7431)));
        assert!(bounds.south < bounds.north && bounds.west < bounds.east);
        assert!(!bounds.contains(Position::new(40.7, -74.0)));

        projection.zoom_in();
        let zoomed = projection.bounds();
        assert!(zoomed.east - zoomed.west < bounds.east - bounds.west);

        projection.center_on(Position::new(40.7, -74.0));
        assert!(projection.bounds().contains(Position::new(40.7, -74.0)));
        assert_eq!(projection.center(), (Position::new(40.7, -74.0), true));

        projection.reset();
        assert_eq!(projection, austin());
    }

    #[test]
    fn markers() {
        let mut map = TerminalMap::new(austin());
        map.render("AAL1    ", Position::new(30.0, -97.0), Some(90.0), true);
        map.move_to("AAL1    ", Position::new(30.1, -97.0));
        map.move_to("DAL55   ", Position::new(30.1, -97.0));
        assert_eq!(map.markers().count(), 1);
        assert_eq!(map.marker("AAL1    ").unwrap().position, Position::new(30.1, -97.0));

        map.highlight("AAL1    ");
        assert_eq!(map.highlighted(), Some("AAL1    "));
        map.remove("AAL1    ");
        assert!(map.marker("AAL1    ").is_none());
        assert_eq!(map.highlighted(), None);
    }

    #[test]
    fn hit_test() {
        let mut map = TerminalMap::new(austin());
        let center = Position::new(30.2672, -97.7431);
        map.render("SWA1234 ", center, None, true);
        assert_eq!(map.hit_test((50, 25)), None);

        // 102x52 area, so a 100x50 canvas starting at (1, 1)
        map.set_canvas(Rect::new(0, 0, 102, 52));
        // (x, y) = (0, 0) is between columns 50 and 51, rows 25 and 26
        assert_eq!(map.hit_test((50, 25)).as_deref(), Some("SWA1234 "));
        assert_eq!(map.hit_test((10, 10)), None);
        assert_eq!(map.hit_test((0, 0)), None);

        map.render("SWA1234 ", center, None, false);
        assert_eq!(map.hit_test((50, 25)), None);
    }
}
