/*!
The map-rendering capability the tracker draws through

Anything that can place, move and remove a marker and tell its current viewport can sit behind
[`MapRenderer`]. [`CommandLog`] is the headless implementation: it keeps every
[`RenderCommand`] it was given.
!*/

use crate::position::{Bounds, Position};

/// Terminal cell or screen pixel, as `(column, row)`
pub type Pixel = (u16, u16);

/// Backend that turns tracked entities into markers
pub trait MapRenderer {
    /// Create or redraw the marker for `id`
    fn render(&mut self, id: &str, position: Position, heading: Option<f64>, visible: bool);

    /// Move an existing marker, keeping heading and visibility
    fn move_to(&mut self, id: &str, position: Position);

    /// Take the marker off the map
    fn remove(&mut self, id: &str);

    /// Identifier of the marker under `pixel`, if any
    fn hit_test(&self, pixel: Pixel) -> Option<String>;

    /// Area of the world currently on screen
    fn viewport_bounds(&self) -> Bounds;

    fn contains(&self, bounds: &Bounds, position: Position) -> bool {
        bounds.contains(position)
    }
}

/// Explicit description of one change to the map
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Render { id: String, position: Position, heading: Option<f64>, visible: bool },
    Move { id: String, position: Position },
    Remove { id: String },
}

impl RenderCommand {
    /// Identifier of the marker this command is about
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Render { id, .. } | Self::Move { id, .. } | Self::Remove { id } => id,
        }
    }
}

/// Renderer that records commands instead of drawing them
#[derive(Debug, Clone)]
pub struct CommandLog {
    viewport: Bounds,
    commands: Vec<RenderCommand>,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new(Bounds::WORLD)
    }
}

impl CommandLog {
    #[must_use]
    pub fn new(viewport: Bounds) -> Self {
        Self { viewport, commands: vec![] }
    }

    pub fn set_viewport(&mut self, viewport: Bounds) {
        self.viewport = viewport;
    }

    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Hand over everything recorded so far, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded `Remove` commands for `id`
    #[must_use]
    pub fn removals_of(&self, id: &str) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Remove { id: removed } if removed == id))
            .count()
    }
}

impl MapRenderer for CommandLog {
    fn render(&mut self, id: &str, position: Position, heading: Option<f64>, visible: bool) {
        self.commands.push(RenderCommand::Render { id: id.to_string(), position, heading, visible });
    }

    fn move_to(&mut self, id: &str, position: Position) {
        self.commands.push(RenderCommand::Move { id: id.to_string(), position });
    }

    fn remove(&mut self, id: &str) {
        self.commands.push(RenderCommand::Remove { id: id.to_string() });
    }

    // nothing is drawn, so nothing can be hit
    fn hit_test(&self, _pixel: Pixel) -> Option<String> {
        None
    }

    fn viewport_bounds(&self) -> Bounds {
        self.viewport
    }
}
