use std::time::Duration;

/// What a draw does with sprite pixels that land beyond the right or bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatePolicy {
    /// pass the coordinates through untouched; the display rejects them
    #[default]
    Error,
    /// wrap around to the opposite edge, as most CHIP-8 interpreters do
    Wrap,
}

/// How VF reports collisions for a whole sprite.
///
/// NB. `LastToggle` is the default and is *not* what the CHIP-8 reference
/// describes: VF ends up holding the result of the last pixel toggled, so an
/// erasure early in the sprite can be forgotten by a later toggle. A sprite with
/// no set bits leaves VF alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionMode {
    #[default]
    LastToggle,
    /// VF = 1 iff any toggle in the sprite erased a pixel; always written
    AnyErased,
}

/// Behavioural switches for the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    pub coordinates: CoordinatePolicy,
    pub collision: CollisionMode,
}

/// default size of one CHIP-8 pixel in canvas units
pub const DEFAULT_PIXEL_SCALE: u16 = 20;

/// default cadence at which the canvas checks for new frames
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Settings for the windowed renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub pixel_scale: u16,
    pub poll_interval: Duration,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            pixel_scale: DEFAULT_PIXEL_SCALE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            title: String::from("CHIP-8"),
        }
    }
}

impl WindowConfig {
    /// canvas width and height in canvas units
    pub fn canvas_size(&self) -> (u32, u32) {
        let scale = self.pixel_scale.max(1) as u32;
        (
            crate::display::DISPLAY_WIDTH as u32 * scale,
            crate::display::DISPLAY_HEIGHT as u32 * scale,
        )
    }
}
