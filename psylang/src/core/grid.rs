//! Grid model: a fixed square of cells and the single pointer that walks it.
//!
//! The grid never resizes after construction. Every mutation goes through
//! [`Cell`] helpers so that color and opacity stay inside their ranges.

use serde::{Serialize, Serializer};

/// Side length used when no size is configured.
pub const DEFAULT_GRID_SIZE: usize = 16;
/// Highest color index (palette has nine entries, `0..=8`).
pub const MAX_COLOR: u8 = 8;
/// Fully opaque. Opacity is stored in `0..=256`.
pub const MAX_OPACITY: u16 = 256;

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// Palette index in `0..=MAX_COLOR`.
    pub color: u8,
    /// Opacity in `0..=MAX_OPACITY`.
    pub opacity: u16,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            color: 0,
            opacity: MAX_OPACITY,
        }
    }
}

impl Cell {
    /// `+`: raise the color by one, saturating at [`MAX_COLOR`].
    pub fn increment(&mut self) {
        self.color = (self.color + 1).min(MAX_COLOR);
    }

    /// `-`: lower the color by one, saturating at zero.
    pub fn decrement(&mut self) {
        self.color = self.color.saturating_sub(1);
    }

    /// `Op[n]`: assign opacity, clamped to `0..=MAX_OPACITY`.
    pub fn set_opacity(&mut self, value: i64) {
        self.opacity = value.clamp(0, i64::from(MAX_OPACITY)) as u16;
    }
}

/// Pointer movement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `>`
    Right,
    /// `<`
    Left,
    /// `.`
    Down,
    /// `,`
    Up,
}

/// The shared cursor over the grid. Always inside `[0, size)` on both axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Pointer {
    pub x: usize,
    pub y: usize,
}

impl Pointer {
    /// Move one cell in `direction`, wrapping around a grid of side `size`.
    pub fn step(&mut self, direction: Direction, size: usize) {
        match direction {
            Direction::Right => self.x = (self.x + 1) % size,
            Direction::Left => self.x = (self.x + size - 1) % size,
            Direction::Down => self.y = (self.y + 1) % size,
            Direction::Up => self.y = (self.y + size - 1) % size,
        }
    }
}

/// Square, row-major array of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

impl Grid {
    /// Allocate a `size` x `size` grid of default cells.
    ///
    /// A zero size is raised to one so that pointer wraparound stays defined.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.cells.get(y * self.size + x)
    }

    /// Mutable cell under `pointer`. Coordinates are reduced modulo the size,
    /// which is a no-op for any pointer produced by [`Pointer::step`].
    pub fn at_mut(&mut self, pointer: Pointer) -> &mut Cell {
        let index = (pointer.y % self.size) * self.size + pointer.x % self.size;
        &mut self.cells[index]
    }

    /// Rows from top (`y = 0`) to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size)
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}
