//! Video timings, and the geometry we derive from them.
//!
//! A [`VideoMode`] is picked once at start-up and never changes. Everything
//! else (line lengths, where the sync pulse goes, how the 256x256 frame
//! buffer is centred) comes out of [`Geometry::derive`].

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

use crate::framebuffer::{FRAME_HEIGHT, FRAME_STRIDE};
use crate::line::{H_SYNC, MAX_LINE_BYTES, V_SYNC};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Describes the polarity of a sync pulse.
///
/// Some pulses are positive (active-high), some are negative (active-low).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncPolarity {
    /// An active-high pulse
    Positive,
    /// An active-low pulse
    Negative,
}

impl SyncPolarity {
    /// The bits to flip in a positive-polarity pattern for this sync signal.
    const fn mask(self, bit: u8) -> u8 {
        match self {
            SyncPolarity::Positive => 0,
            SyncPolarity::Negative => bit,
        }
    }
}

/// One fixed video mode.
///
/// Horizontal values are in pixel clocks, vertical values are in scan-lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VideoMode {
    /// The system clock we need, in kHz
    pub sys_freq_khz: u32,
    /// The pixel clock, in Hz
    pub pixel_freq_hz: u32,
    pub h_visible_area: u16,
    pub v_visible_area: u16,
    /// Length of a whole scan-line, including blanking
    pub whole_line: u16,
    /// Number of scan-lines in a whole frame, including blanking
    pub whole_frame: u16,
    pub h_front_porch: u16,
    pub h_sync_pulse: u16,
    pub h_back_porch: u16,
    pub v_front_porch: u16,
    pub v_sync_pulse: u16,
    pub v_back_porch: u16,
    /// XOR'd into every sync pattern. Bit 7 is V-Sync, bit 6 is H-Sync.
    pub sync_polarity: u8,
    /// How many pixel clocks each output byte lasts
    pub div: u8,
}

impl VideoMode {
    /// Build a polarity mask for [`VideoMode::sync_polarity`].
    pub const fn polarity_mask(hsync: SyncPolarity, vsync: SyncPolarity) -> u8 {
        hsync.mask(H_SYNC) | vsync.mask(V_SYNC)
    }

    /// Bytes in one output scan-line
    pub const fn line_bytes(&self) -> usize {
        self.whole_line as usize / self.div as usize
    }

    /// 32-bit words in one output scan-line, i.e. the DMA transfer count
    pub const fn line_words(&self) -> usize {
        self.line_bytes() / 4
    }

    /// First scan-line of the vertical sync pulse
    pub const fn v_sync_start(&self) -> u16 {
        self.v_visible_area + self.v_front_porch
    }

    /// First scan-line of the vertical back porch
    pub const fn v_sync_end(&self) -> u16 {
        self.v_sync_start() + self.v_sync_pulse
    }

    /// Check the mode is something we can actually generate.
    pub fn check(&self) -> Result<(), ModeError> {
        if self.div == 0 {
            return Err(ModeError::ZeroDivider);
        }
        if self.pixel_freq_hz == 0 {
            return Err(ModeError::NoPixelClock);
        }
        let h_parts = u32::from(self.h_visible_area)
            + u32::from(self.h_front_porch)
            + u32::from(self.h_sync_pulse)
            + u32::from(self.h_back_porch);
        if u32::from(self.whole_line) < h_parts {
            return Err(ModeError::LineTooShort);
        }
        let v_parts = u32::from(self.v_visible_area)
            + u32::from(self.v_front_porch)
            + u32::from(self.v_sync_pulse)
            + u32::from(self.v_back_porch);
        if u32::from(self.whole_frame) < v_parts {
            return Err(ModeError::FrameTooShort);
        }
        let div = u16::from(self.div);
        if self.whole_line % div != 0 || (self.whole_line / div) % 4 != 0 {
            return Err(ModeError::UnalignedLine);
        }
        if self.line_bytes() > MAX_LINE_BYTES {
            return Err(ModeError::LineTooLong {
                needed: self.line_bytes(),
                capacity: MAX_LINE_BYTES,
            });
        }
        Ok(())
    }

    /// Work out the PIO clock divisor, in 8.8 fixed point.
    ///
    /// Each `out pins, 8` takes one PIO clock and must last `div` pixel
    /// clocks. Returns `(integer, fraction)`.
    pub fn clock_divisor(&self, sys_clock_hz: u32) -> (u16, u8) {
        let fixed = (u64::from(sys_clock_hz) * u64::from(self.div) * 256)
            / u64::from(self.pixel_freq_hz.max(1));
        ((fixed >> 8) as u16, (fixed & 0xFF) as u8)
    }
}

/// Ways in which a [`VideoMode`] can be unusable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeError {
    /// The pixel clock divider is zero
    ZeroDivider,
    /// The pixel clock is zero
    NoPixelClock,
    /// `whole_line` is shorter than visible + porches + sync
    LineTooShort,
    /// `whole_frame` is shorter than visible + porches + sync
    FrameTooShort,
    /// The divided line is not a whole number of 32-bit words
    UnalignedLine,
    /// The line does not fit in a [`ScanLine`](crate::line::ScanLine)
    LineTooLong { needed: usize, capacity: usize },
}

/// Everything the buffers need to know about a [`VideoMode`].
///
/// Horizontal values are in output bytes or output words (one word is two
/// pixels, i.e. one [`PixelPair`](crate::palette::PixelPair)).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Bytes per output scan-line
    pub line_bytes: usize,
    /// Where the H-Sync pulse starts, in bytes
    pub h_sync_offset: usize,
    /// How long the H-Sync pulse is, in bytes
    pub h_sync_width: usize,
    /// Visible area, in pixel pairs
    pub h_visible_words: usize,
    /// Black border either side of the image, in pixel pairs
    pub h_margin_words: usize,
    /// Frame buffer bytes shown on each line
    pub h_image_words: usize,
    /// Visible scan-lines in the mode
    pub v_visible_lines: u16,
    /// Scan-lines taken by the frame buffer once each row is repeated
    pub v_image_lines: u16,
    /// Black border above the image, in scan-lines
    pub v_margin: u16,
    /// How many scan-lines each frame buffer row is repeated for
    pub div: u16,
    /// Copied from [`VideoMode::sync_polarity`]
    pub polarity: u8,
}

impl Geometry {
    /// Derive the geometry for a mode.
    ///
    /// Margins that come out negative (the frame buffer is bigger than the
    /// visible area) are clamped to zero, so the image is clipped rather than
    /// centred.
    pub fn derive(mode: &VideoMode) -> Geometry {
        let div = u16::from(mode.div.max(1));

        let h_visible_words = usize::from(mode.h_visible_area / (div * 4)) * 2;
        let h_margin = (h_visible_words as i32 - FRAME_STRIDE as i32) / 2;
        let h_margin_words = if h_margin < 0 {
            #[cfg(feature = "defmt")]
            defmt::debug!("horizontal margin {=i32} clamped to zero", h_margin);
            0
        } else {
            h_margin as usize
        };

        let v_image_lines = FRAME_HEIGHT as u16 * div;
        let half = (i32::from(mode.v_visible_area) - i32::from(v_image_lines)) / (2 * i32::from(div));
        let v_margin = if half < 0 {
            #[cfg(feature = "defmt")]
            defmt::debug!("vertical margin {=i32} clamped to zero", half);
            0
        } else {
            half as u16 * div
        };

        Geometry {
            line_bytes: usize::from(mode.whole_line / div),
            h_sync_offset: usize::from((mode.h_visible_area + mode.h_front_porch) / div),
            h_sync_width: usize::from(mode.h_sync_pulse / div),
            h_visible_words,
            h_margin_words,
            h_image_words: h_visible_words - (2 * h_margin_words),
            v_visible_lines: mode.v_visible_area,
            v_image_lines,
            v_margin,
            div,
            polarity: mode.sync_polarity,
        }
    }

    /// 32-bit words per output scan-line
    pub const fn line_words(&self) -> usize {
        self.line_bytes / 4
    }

    /// Which frame buffer row is shown on visible scan-line `y`, if any.
    ///
    /// Returns `None` for scan-lines in the top or bottom border.
    #[inline(always)]
    pub fn source_row(&self, y: u16) -> Option<usize> {
        if y < self.v_margin || y >= self.v_visible_lines {
            return None;
        }
        let row = usize::from((y - self.v_margin) / self.div);
        if row < FRAME_HEIGHT {
            Some(row)
        } else {
            None
        }
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Standard 640x480 @ 60 Hz VGA, two pixel clocks per output byte.
pub const MODE_640X480_60HZ: VideoMode = VideoMode {
    sys_freq_khz: 252_000,
    pixel_freq_hz: 25_175_000,
    h_visible_area: 640,
    v_visible_area: 480,
    whole_line: 800,
    whole_frame: 525,
    h_front_porch: 16,
    h_sync_pulse: 96,
    h_back_porch: 48,
    v_front_porch: 10,
    v_sync_pulse: 2,
    v_back_porch: 33,
    sync_polarity: VideoMode::polarity_mask(SyncPolarity::Negative, SyncPolarity::Negative),
    div: 2,
};

/// The Agat-7 256x256 picture, 50 Hz with PAL-like line counts.
///
/// The 126 MHz system clock divides down to the 5.25 MHz pixel clock exactly.
pub const MODE_AGAT7: VideoMode = VideoMode {
    sys_freq_khz: 126_000,
    pixel_freq_hz: 5_250_000,
    h_visible_area: 256,
    v_visible_area: 256,
    whole_line: 336,
    whole_frame: 312,
    h_front_porch: 16,
    h_sync_pulse: 32,
    h_back_porch: 32,
    v_front_porch: 16,
    v_sync_pulse: 8,
    v_back_porch: 32,
    sync_polarity: VideoMode::polarity_mask(SyncPolarity::Negative, SyncPolarity::Negative),
    div: 1,
};

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(MODE_AGAT7.check(), Ok(()));
        assert_eq!(MODE_640X480_60HZ.check(), Ok(()));
        assert_eq!(MODE_AGAT7.sync_polarity, 0b1100_0000);
        assert_eq!(MODE_AGAT7.line_words(), 84);
        assert_eq!(MODE_640X480_60HZ.line_words(), 100);
    }

    #[test]
    fn agat7_geometry() {
        let g = Geometry::derive(&MODE_AGAT7);
        assert_eq!(g.line_bytes, 336);
        assert_eq!(g.h_sync_offset, 272);
        assert_eq!(g.h_sync_width, 32);
        assert_eq!(g.h_visible_words, 128);
        assert_eq!(g.h_margin_words, 0);
        assert_eq!(g.h_image_words, 128);
        assert_eq!(g.v_margin, 0);
        assert_eq!(g.source_row(0), Some(0));
        assert_eq!(g.source_row(255), Some(255));
        assert_eq!(g.source_row(256), None);
    }

    #[test]
    fn vga_geometry_centres_horizontally_and_clamps_vertically() {
        let g = Geometry::derive(&MODE_640X480_60HZ);
        assert_eq!(g.line_bytes, 400);
        assert_eq!(g.h_sync_offset, 328);
        assert_eq!(g.h_sync_width, 48);
        assert_eq!(g.h_visible_words, 160);
        assert_eq!(g.h_margin_words, 16);
        assert_eq!(g.h_image_words, 128);
        // 512 doubled lines don't fit in 480, so no top border
        assert_eq!(g.v_image_lines, 512);
        assert_eq!(g.v_margin, 0);
        assert_eq!(g.source_row(0), Some(0));
        assert_eq!(g.source_row(1), Some(0));
        assert_eq!(g.source_row(479), Some(239));
        assert_eq!(g.source_row(480), None);
    }

    #[test]
    fn vertical_margin_is_a_multiple_of_the_divider() {
        let mode = VideoMode {
            v_visible_area: 300,
            whole_frame: 356,
            ..MODE_AGAT7
        };
        let g = Geometry::derive(&mode);
        assert_eq!(g.v_margin, 22);
        assert_eq!(g.source_row(21), None);
        assert_eq!(g.source_row(22), Some(0));
        assert_eq!(g.source_row(277), Some(255));
        assert_eq!(g.source_row(278), None);

        let mode = VideoMode {
            v_visible_area: 600,
            whole_frame: 656,
            ..MODE_640X480_60HZ
        };
        let g = Geometry::derive(&mode);
        // (600 - 512) / 4 = 22 pairs of lines
        assert_eq!(g.v_margin, 44);
        assert_eq!(g.v_margin % g.div, 0);
    }

    #[test]
    fn narrow_mode_clamps_horizontal_margin() {
        let mode = VideoMode {
            h_visible_area: 200,
            whole_line: 280,
            ..MODE_AGAT7
        };
        let g = Geometry::derive(&mode);
        assert_eq!(g.h_visible_words, 100);
        assert_eq!(g.h_margin_words, 0);
        assert_eq!(g.h_image_words, 100);
    }

    #[test]
    fn bad_modes_are_rejected() {
        let mode = VideoMode {
            div: 0,
            ..MODE_AGAT7
        };
        assert_eq!(mode.check(), Err(ModeError::ZeroDivider));

        let mode = VideoMode {
            whole_line: 300,
            ..MODE_AGAT7
        };
        assert_eq!(mode.check(), Err(ModeError::LineTooShort));

        let mode = VideoMode {
            whole_frame: 300,
            ..MODE_AGAT7
        };
        assert_eq!(mode.check(), Err(ModeError::FrameTooShort));

        let mode = VideoMode {
            whole_line: 338,
            ..MODE_AGAT7
        };
        assert_eq!(mode.check(), Err(ModeError::UnalignedLine));

        let mode = VideoMode {
            div: 1,
            ..MODE_640X480_60HZ
        };
        assert_eq!(
            mode.check(),
            Err(ModeError::LineTooLong {
                needed: 800,
                capacity: MAX_LINE_BYTES
            })
        );
    }

    #[test]
    fn pio_clock_divisor() {
        assert_eq!(MODE_AGAT7.clock_divisor(126_000_000), (24, 0));
        // 252 MHz * 2 / 25.175 MHz = 20.02
        assert_eq!(MODE_640X480_60HZ.clock_divisor(252_000_000), (20, 5));
    }

    #[test]
    fn polarity_mask() {
        assert_eq!(
            VideoMode::polarity_mask(SyncPolarity::Positive, SyncPolarity::Positive),
            0
        );
        assert_eq!(
            VideoMode::polarity_mask(SyncPolarity::Negative, SyncPolarity::Positive),
            H_SYNC
        );
        assert_eq!(
            VideoMode::polarity_mask(SyncPolarity::Positive, SyncPolarity::Negative),
            V_SYNC
        );
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
