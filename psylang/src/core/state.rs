//! Interpreter state shared by every execution context.
//!
//! The main program, key bindings and scheduled tasks all mutate the same
//! grid through the same pointer. There is exactly one [`InterpreterState`]
//! per run and it is passed by `&mut` into each interpreter call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::grid::{Cell, Direction, Grid, Pointer};

/// Grid, pointer and random source for a single run.
#[derive(Debug, Clone)]
pub struct InterpreterState {
    pub grid: Grid,
    pub pointer: Pointer,
    rng: StdRng,
}

impl InterpreterState {
    /// Fresh state with an entropy-seeded random source.
    pub fn new(size: usize) -> Self {
        Self::with_rng(size, StdRng::from_entropy())
    }

    /// Fresh state whose `%[lo/hi]` draws are reproducible.
    pub fn seeded(size: usize, seed: u64) -> Self {
        Self::with_rng(size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: usize, rng: StdRng) -> Self {
        Self {
            grid: Grid::new(size),
            pointer: Pointer::default(),
            rng,
        }
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn move_pointer(&mut self, direction: Direction) {
        let size = self.grid.size();
        self.pointer.step(direction, size);
    }

    /// Cell under the pointer.
    pub fn current_cell(&mut self) -> &mut Cell {
        self.grid.at_mut(self.pointer)
    }

    /// Uniform draw from the inclusive range spanned by `a` and `b`.
    ///
    /// Bounds may come in either order.
    pub fn draw(&mut self, a: i64, b: i64) -> i64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.rng.gen_range(lo..=hi)
    }
}
