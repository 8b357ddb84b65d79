//! Read-only view handed to renderers once per tick.

use serde::Serialize;

use crate::core::grid::{Grid, MAX_OPACITY, Pointer};
use crate::core::parser::ToggleFlags;

/// RGB for color indices `0..=8`: black, white, red, orange, yellow, green,
/// blue, purple, pink.
pub const PALETTE: [[u8; 3]; 9] = [
    [0, 0, 0],
    [255, 255, 255],
    [255, 0, 0],
    [255, 128, 0],
    [255, 255, 0],
    [0, 255, 0],
    [0, 128, 255],
    [128, 0, 255],
    [255, 0, 255],
];

/// Snapshot of everything a presentation layer may draw.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Frame<'a> {
    pub tick: u64,
    pub pointer: Pointer,
    pub flags: ToggleFlags,
    pub grid: &'a Grid,
}

impl Frame<'_> {
    /// Blended color of the cell at `(x, y)`. Opacity 256 maps to alpha 255.
    pub fn rgba(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        let cell = self.grid.get(x, y)?;
        let [r, g, b] = PALETTE[usize::from(cell.color)];
        let alpha = if cell.opacity >= MAX_OPACITY {
            u8::MAX
        } else {
            cell.opacity as u8
        };
        Some([r, g, b, alpha])
    }

    /// Whether the renderer should outline `(x, y)` as the pointer cell.
    pub fn is_highlighted(&self, x: usize, y: usize) -> bool {
        self.flags.show_cell && self.pointer.x == x && self.pointer.y == y
    }
}
