//! One ready-to-stream scan-line per frame buffer row.
//!
//! Rebuilding is slow (every pixel goes through the palette) so it happens
//! in thread mode. The interrupt then only has to pick an address.

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

use crate::framebuffer::{FrameBuffer, FRAME_HEIGHT};
use crate::line::{LineAddr, ScanLine, SyncPattern};
use crate::mode::Geometry;
use crate::palette::Palette;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Holds [`FRAME_HEIGHT`] encoded scan-lines, back to back.
///
/// Row `n` starts [`PreparedLines::STRIDE`] bytes after row `n - 1`, so the
/// scan-out only needs the base address.
#[repr(C)]
pub struct PreparedLines {
    lines: [ScanLine; FRAME_HEIGHT],
}

impl PreparedLines {
    /// Distance between one prepared line and the next, in bytes
    pub const STRIDE: usize = core::mem::size_of::<ScanLine>();

    pub const fn new() -> PreparedLines {
        PreparedLines {
            lines: [const { ScanLine::new() }; FRAME_HEIGHT],
        }
    }

    /// Stamp the blanking and H-Sync into every row.
    ///
    /// Call once, before the first [`PreparedLines::rebuild`].
    pub fn init(&mut self, geometry: &Geometry) {
        for line in self.lines.iter_mut() {
            line.stamp(geometry, SyncPattern::Normal);
        }
    }

    /// Re-encode the pixels of every row from a frame buffer.
    ///
    /// Only the visible bytes are written, each one once, so a row the
    /// scan-out reads while this runs is old pixels or new pixels and never
    /// blank. The sync pattern stamped by [`PreparedLines::init`] is left
    /// alone.
    pub fn rebuild(&mut self, geometry: &Geometry, frame: &FrameBuffer, palette: &Palette) {
        for (y, line) in self.lines.iter_mut().enumerate() {
            line.paint_row(geometry, palette, frame.row(y));
        }
    }

    /// Get the encoded line for a frame buffer row.
    pub fn line(&self, row: usize) -> Option<&ScanLine> {
        self.lines.get(row)
    }

    /// Address of row 0
    pub fn base(&self) -> LineAddr {
        self.lines[0].addr()
    }
}

impl Default for PreparedLines {
    fn default() -> Self {
        PreparedLines::new()
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{MODE_640X480_60HZ, MODE_AGAT7};
    use crate::palette::Rgbi;

    #[test]
    fn all_black_frame() {
        let geometry = Geometry::derive(&MODE_AGAT7);
        let palette = Palette::new(geometry.polarity);
        let frame = Box::new(FrameBuffer::new());
        let mut prepared = Box::new(PreparedLines::new());
        prepared.init(&geometry);
        prepared.rebuild(&geometry, &frame, &palette);

        let black = palette.background().0.to_le_bytes();
        for row in 0..FRAME_HEIGHT {
            let bytes = prepared.line(row).unwrap().as_bytes();
            for pair in bytes[..256].chunks_exact(2) {
                assert_eq!(pair, black);
            }
            assert!(bytes[256..272].iter().all(|b| *b == 0xC0));
            assert!(bytes[272..304].iter().all(|b| *b == 0x80));
            assert!(bytes[304..336].iter().all(|b| *b == 0xC0));
        }
    }

    #[test]
    fn rows_are_contiguous() {
        let prepared = Box::new(PreparedLines::new());
        let base = prepared.base().as_usize();
        assert_eq!(PreparedLines::STRIDE % 4, 0);
        for row in [1, 17, 255] {
            let addr = prepared.line(row).unwrap().addr().as_usize();
            assert_eq!(addr, base + (row * PreparedLines::STRIDE));
        }
        assert!(prepared.line(256).is_none());
    }

    #[test]
    fn picks_up_frame_contents() {
        let geometry = Geometry::derive(&MODE_640X480_60HZ);
        let palette = Palette::new(geometry.polarity);
        let frame = Box::new(FrameBuffer::new());
        frame.store_pixel(0, 9, Rgbi::WHITE);
        frame.store_pixel(255, 9, Rgbi::BLUE);
        let mut prepared = Box::new(PreparedLines::new());
        prepared.init(&geometry);
        prepared.rebuild(&geometry, &frame, &palette);

        let bytes = prepared.line(9).unwrap().as_bytes();
        // After the 16-pair margin
        assert_eq!(bytes[32], 0xFF);
        assert_eq!(bytes[33], 0xC0);
        assert_eq!(bytes[286], 0xC0);
        assert_eq!(bytes[287], 0xC0 | Rgbi::BLUE.to_output());
        assert!(prepared.line(8).unwrap().as_bytes()[..320]
            .iter()
            .all(|b| *b == 0xC0));

        // Rebuilding from a cleared frame puts it all back
        frame.clear();
        prepared.rebuild(&geometry, &frame, &palette);
        assert_eq!(prepared.line(9).unwrap().as_bytes()[32], 0xC0);
    }

    #[test]
    fn rebuild_only_touches_visible_bytes() {
        let geometry = Geometry::derive(&MODE_AGAT7);
        let palette = Palette::new(geometry.polarity);
        let frame = Box::new(FrameBuffer::new());
        frame.fill(Rgbi::RED);
        let mut prepared = Box::new(PreparedLines::new());

        // Not stamped, so anything past the picture stays zero
        prepared.rebuild(&geometry, &frame, &palette);
        let red = 0xC0 | Rgbi::RED.to_output();
        for row in [0, 100, 255] {
            let bytes = prepared.line(row).unwrap().as_bytes();
            assert!(bytes[..256].iter().all(|b| *b == red), "row {}", row);
            assert!(bytes[256..].iter().all(|b| *b == 0), "row {}", row);
        }
    }

    #[test]
    fn rebuilds_keep_the_stamped_sync() {
        let geometry = Geometry::derive(&MODE_640X480_60HZ);
        let palette = Palette::new(geometry.polarity);
        let frame = Box::new(FrameBuffer::new());
        let mut prepared = Box::new(PreparedLines::new());
        prepared.init(&geometry);

        for colour in [Rgbi::RED, Rgbi::BLACK, Rgbi::WHITE] {
            frame.fill(colour);
            prepared.rebuild(&geometry, &frame, &palette);
            let bytes = prepared.line(7).unwrap().as_bytes();
            let expected = 0xC0 | colour.to_output();
            assert!(bytes[32..288].iter().all(|b| *b == expected));
            // Front porch, H-Sync, back porch
            assert!(bytes[320..328].iter().all(|b| *b == 0xC0));
            assert!(bytes[328..376].iter().all(|b| *b == 0x80));
            assert!(bytes[376..400].iter().all(|b| *b == 0xC0));
        }
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
