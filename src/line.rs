//! Scan-line buffers, and the fixed templates used outside the image.
//!
//! A [`ScanLine`] is the exact sequence of bytes the PIO clocks out for one
//! line, sync pulse included. The DMA engine only ever sees a [`LineAddr`].

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

use crate::mode::Geometry;
use crate::palette::Palette;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Which pair of sync levels a line is stamped with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncPattern {
    /// Outside the vertical sync pulse
    Normal,
    /// Inside the vertical sync pulse
    Vertical,
}

impl SyncPattern {
    /// Sync bits outside the H-Sync pulse, before polarity
    pub const fn idle(self) -> u8 {
        match self {
            SyncPattern::Normal => NO_SYNC,
            SyncPattern::Vertical => V_SYNC,
        }
    }

    /// Sync bits inside the H-Sync pulse, before polarity
    pub const fn pulse(self) -> u8 {
        match self {
            SyncPattern::Normal => H_SYNC,
            SyncPattern::Vertical => VH_SYNC,
        }
    }
}

/// The address of a [`ScanLine`], as handed to the DMA engine.
///
/// Doesn't own anything. The line it points at must be `'static`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineAddr(usize);

impl LineAddr {
    /// Wrap a raw address
    #[inline(always)]
    pub const fn from_usize(addr: usize) -> LineAddr {
        LineAddr(addr)
    }

    /// As a bus address, for the DMA registers
    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// Holds one line of output bytes.
///
/// Word aligned, so the DMA can read it 32 bits at a time. Only the first
/// [`Geometry::line_bytes`] bytes are streamed.
#[repr(C, align(4))]
pub struct ScanLine {
    bytes: [u8; MAX_LINE_BYTES],
}

impl ScanLine {
    /// Make a line full of zeroes.
    pub const fn new() -> ScanLine {
        ScanLine {
            bytes: [0u8; MAX_LINE_BYTES],
        }
    }

    /// Fill the line with the idle level, then drop the H-Sync pulse in.
    ///
    /// Both levels have the mode's polarity applied.
    pub fn stamp(&mut self, geometry: &Geometry, pattern: SyncPattern) {
        let line = &mut self.bytes[..geometry.line_bytes];
        line.fill(pattern.idle() ^ geometry.polarity);
        let sync_end = (geometry.h_sync_offset + geometry.h_sync_width).min(line.len());
        line[geometry.h_sync_offset.min(sync_end)..sync_end]
            .fill(pattern.pulse() ^ geometry.polarity);
    }

    /// Overwrite the visible part of a stamped line with one frame buffer row.
    ///
    /// Draws `h_margin_words` of background, then one pixel pair per byte of
    /// `row` (up to `h_image_words` of them), then background up to
    /// `h_visible_words`.
    #[inline(always)]
    pub fn paint_row<I>(&mut self, geometry: &Geometry, palette: &Palette, row: I)
    where
        I: IntoIterator<Item = u8>,
    {
        let visible = &mut self.bytes[..geometry.h_visible_words * 2];
        let background = palette.background().0.to_le_bytes();
        let mut pairs = visible.chunks_exact_mut(2);

        for slot in pairs.by_ref().take(geometry.h_margin_words) {
            slot.copy_from_slice(&background);
        }
        for (slot, packed) in pairs
            .by_ref()
            .zip(row.into_iter().take(geometry.h_image_words))
        {
            slot.copy_from_slice(&palette.lookup(packed).0.to_le_bytes());
        }
        for slot in pairs {
            slot.copy_from_slice(&background);
        }
    }

    /// Where this line lives in memory.
    #[inline(always)]
    pub fn addr(&self) -> LineAddr {
        LineAddr(self.bytes.as_ptr() as usize)
    }

    /// All the bytes, including any past the end of the mode's line.
    pub fn as_bytes(&self) -> &[u8; MAX_LINE_BYTES] {
        &self.bytes
    }
}

impl Default for ScanLine {
    fn default() -> Self {
        ScanLine::new()
    }
}

/// The four lines used when we aren't showing a prepared line.
pub struct ScanlineTemplates {
    /// Blanking, with H-Sync
    pub blank: ScanLine,
    /// Blanking, with V-Sync asserted throughout
    pub vsync: ScanLine,
    /// Scratch lines for rendering in the interrupt, alternated by line parity
    pub image: [ScanLine; 2],
}

impl ScanlineTemplates {
    pub const fn new() -> ScanlineTemplates {
        ScanlineTemplates {
            blank: ScanLine::new(),
            vsync: ScanLine::new(),
            image: [const { ScanLine::new() }; 2],
        }
    }

    /// Stamp every template for the given geometry.
    ///
    /// The image lines start out as copies of the blank line.
    pub fn init(&mut self, geometry: &Geometry) {
        self.blank.stamp(geometry, SyncPattern::Normal);
        self.vsync.stamp(geometry, SyncPattern::Vertical);
        for line in self.image.iter_mut() {
            line.stamp(geometry, SyncPattern::Normal);
        }
    }
}

impl Default for ScanlineTemplates {
    fn default() -> Self {
        ScanlineTemplates::new()
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Longest line we can hold, in bytes. 640x480 at two clocks per byte.
pub const MAX_LINE_BYTES: usize = 400;

/// Neither sync pulse asserted
pub const NO_SYNC: u8 = 0b0000_0000;
/// V-Sync asserted (bit 7)
pub const V_SYNC: u8 = 0b1000_0000;
/// H-Sync asserted (bit 6)
pub const H_SYNC: u8 = 0b0100_0000;
/// Both sync pulses asserted
pub const VH_SYNC: u8 = 0b1100_0000;

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{MODE_640X480_60HZ, MODE_AGAT7};
    use crate::palette::Rgbi;

    #[test]
    fn blank_template_sync_range() {
        let geometry = Geometry::derive(&MODE_AGAT7);
        let mut templates = ScanlineTemplates::new();
        templates.init(&geometry);
        let bytes = templates.blank.as_bytes();
        for (idx, b) in bytes[..336].iter().enumerate() {
            if (272..304).contains(&idx) {
                assert_eq!(*b, H_SYNC ^ 0xC0, "byte {}", idx);
            } else {
                assert_eq!(*b, NO_SYNC ^ 0xC0, "byte {}", idx);
            }
        }
        // Past the end of the line is never streamed, and never touched
        assert!(bytes[336..].iter().all(|b| *b == 0));
    }

    #[test]
    fn vsync_template_sync_range() {
        let geometry = Geometry::derive(&MODE_AGAT7);
        let mut templates = ScanlineTemplates::new();
        templates.init(&geometry);
        let bytes = templates.vsync.as_bytes();
        assert!(bytes[..272].iter().all(|b| *b == V_SYNC ^ 0xC0));
        assert!(bytes[272..304].iter().all(|b| *b == VH_SYNC ^ 0xC0));
        assert!(bytes[304..336].iter().all(|b| *b == V_SYNC ^ 0xC0));
    }

    #[test]
    fn image_templates_start_blank() {
        let geometry = Geometry::derive(&MODE_640X480_60HZ);
        let mut templates = ScanlineTemplates::new();
        templates.init(&geometry);
        assert_eq!(templates.image[0].as_bytes(), templates.blank.as_bytes());
        assert_eq!(templates.image[1].as_bytes(), templates.blank.as_bytes());
        assert_ne!(templates.image[0].addr(), templates.image[1].addr());
    }

    #[test]
    fn addresses_are_word_aligned() {
        let templates = ScanlineTemplates::new();
        assert_eq!(templates.blank.addr().as_usize() % 4, 0);
        assert_eq!(templates.vsync.addr().as_usize() % 4, 0);
        assert_eq!(templates.image[1].addr().as_usize() % 4, 0);
    }

    #[test]
    fn paint_row_with_margins() {
        let geometry = Geometry::derive(&MODE_640X480_60HZ);
        let palette = Palette::new(geometry.polarity);
        let mut line = ScanLine::new();
        line.stamp(&geometry, SyncPattern::Normal);
        let white = Rgbi::pack(Rgbi::WHITE, Rgbi::WHITE);
        line.paint_row(&geometry, &palette, core::iter::repeat(white));

        let bytes = line.as_bytes();
        // 16 pairs of black, 128 pairs of white, 16 pairs of black
        assert!(bytes[..32].iter().all(|b| *b == 0xC0));
        assert!(bytes[32..288].iter().all(|b| *b == 0xFF));
        assert!(bytes[288..320].iter().all(|b| *b == 0xC0));
        // front porch, then sync, then back porch
        assert!(bytes[320..328].iter().all(|b| *b == 0xC0));
        assert!(bytes[328..376].iter().all(|b| *b == 0x80));
        assert!(bytes[376..400].iter().all(|b| *b == 0xC0));
    }

    #[test]
    fn short_row_is_padded_with_background() {
        let geometry = Geometry::derive(&MODE_AGAT7);
        let palette = Palette::new(geometry.polarity);
        let mut line = ScanLine::new();
        line.stamp(&geometry, SyncPattern::Normal);
        line.paint_row(&geometry, &palette, [Rgbi::pack(Rgbi::RED, Rgbi::BLUE)]);

        let bytes = line.as_bytes();
        assert_eq!(bytes[0], 0xC0 | Rgbi::RED.to_output());
        assert_eq!(bytes[1], 0xC0 | Rgbi::BLUE.to_output());
        assert!(bytes[2..256].iter().all(|b| *b == 0xC0));
        assert!(bytes[272..304].iter().all(|b| *b == 0x80));
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
