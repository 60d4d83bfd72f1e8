//! Something to look at while the monitor syncs up.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2023
// Copyright (c) The pico-term-rs developers, 2025
// Copyright (c) The agat-vga developers, 2026
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use agat_vga::{FrameBuffer, FrameError, Rgbi, FRAME_HEIGHT, FRAME_STRIDE, FRAME_WIDTH};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Colour bars, a grid and a bar that moves down the screen.
///
/// Every frame is drawn from scratch, so whichever slot we are given ends up
/// the same.
pub struct TestPattern {
    tick: u32,
}

impl TestPattern {
    pub const fn new() -> TestPattern {
        TestPattern { tick: 0 }
    }

    /// Draw the next frame into `fb`.
    pub fn draw(&mut self, fb: &FrameBuffer) -> Result<(), FrameError> {
        fb.clear();

        // Sixteen bars across the top half
        for colour in 0..16u8 {
            let x_pair = usize::from(colour) * BAR_PAIRS;
            for y in 0..FRAME_HEIGHT / 2 {
                fb.fill_span(x_pair, y, BAR_PAIRS, Rgbi::new(colour))?;
            }
        }

        // A grid over the bottom half
        for y in (FRAME_HEIGHT / 2..FRAME_HEIGHT).step_by(GRID_PITCH) {
            fb.fill_span(0, y, FRAME_STRIDE, Rgbi::DARK_GREY)?;
        }
        for x_pair in (0..FRAME_STRIDE).step_by(GRID_PITCH / 2) {
            fb.fill_column(x_pair, FRAME_HEIGHT / 2, FRAME_HEIGHT / 2, Rgbi::DARK_GREY)?;
        }

        // A white diagonal, one pixel at a time
        for i in 0..FRAME_HEIGHT / 2 {
            fb.store_pixel(i * 2, (FRAME_HEIGHT / 2) + i, Rgbi::WHITE);
        }

        // Something that moves, so a stuck frame is obvious
        let y = (self.tick as usize) % (FRAME_HEIGHT - MOVER_HEIGHT);
        for row in y..y + MOVER_HEIGHT {
            fb.fill_span(0, row, FRAME_WIDTH / 8, Rgbi::YELLOW)?;
        }

        // The frame number, in binary, down the right-hand edge
        for bit in 0..16 {
            let colour = if self.tick & (1 << bit) != 0 {
                Rgbi::LIGHT_GREEN
            } else {
                Rgbi::RED
            };
            fb.fill_column(FRAME_STRIDE - 1, bit * 4, 3, colour)?;
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Width of each colour bar, in pixel pairs
const BAR_PAIRS: usize = FRAME_STRIDE / 16;

/// Spacing of the grid lines, in pixels
const GRID_PITCH: usize = 16;

/// Height of the moving bar, in rows
const MOVER_HEIGHT: usize = 8;

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
