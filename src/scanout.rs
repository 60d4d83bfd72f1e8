//! The per-scan-line state machine.
//!
//! Once per scan-line the DMA interrupt calls
//! [`ScanoutEngine::on_line_complete`]. That moves on to the next line,
//! works out which part of the frame it is in, and tells the DMA chain which
//! buffer to stream for it. The buffer is published one line ahead: when the
//! interrupt fires for line `n`, the data channel is already streaming line
//! `n`, so the engine publishes line `n + 1`.
//!
//! What goes on a visible line is up to a [`ScanStrategy`], fixed at build
//! time:
//!
//! * [`PreparedScan`] points the DMA at one of the [`PreparedLines`].
//! * [`DirectScan`] encodes the frame buffer row in the interrupt, into one of
//!   two scratch lines.

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

use crate::framebuffer::FrameBuffer;
use crate::line::{LineAddr, ScanLine};
use crate::mode::{Geometry, VideoMode};
use crate::palette::Palette;
use crate::prepared::PreparedLines;
use crate::rotation::FrameConsumer;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The part of the frame a scan-line is in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// Picture (or the border around it)
    Visible,
    /// Blank lines between the picture and V-Sync
    FrontPorch,
    /// The V-Sync pulse
    VSync,
    /// Blank lines between V-Sync and the next picture
    BackPorch,
}

/// Where each vertical region starts, in scan-lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTiming {
    pub visible_lines: u16,
    pub sync_start: u16,
    pub sync_end: u16,
    pub whole_frame: u16,
}

impl FrameTiming {
    pub const fn new(mode: &VideoMode) -> FrameTiming {
        FrameTiming {
            visible_lines: mode.v_visible_area,
            sync_start: mode.v_sync_start(),
            sync_end: mode.v_sync_end(),
            whole_frame: mode.whole_frame,
        }
    }

    /// Is `y` the first line after the picture?
    ///
    /// This is the start of the longest stretch where nothing on screen
    /// changes, so it is when new frames are picked up.
    #[inline(always)]
    pub const fn starts_vertical_blank(&self, y: u16) -> bool {
        y == self.visible_lines
    }

    /// Which region is scan-line `y` in?
    ///
    /// Anything past the end of the frame counts as back porch.
    #[inline(always)]
    pub const fn classify(&self, y: u16) -> Region {
        if y < self.visible_lines {
            Region::Visible
        } else if y < self.sync_start {
            Region::FrontPorch
        } else if y < self.sync_end {
            Region::VSync
        } else {
            Region::BackPorch
        }
    }
}

/// A pair of chained DMA channels feeding the pixel state machine.
pub trait DmaChain {
    /// Start streaming `first`.
    ///
    /// The control channel is primed with `first` too, so until
    /// [`DmaChain::reload_source`] is called it is repeated.
    fn arm(&mut self, first: LineAddr);

    /// Set the line the control channel loads when the current one ends.
    fn reload_source(&mut self, next: LineAddr);
}

/// Decides what goes on each visible scan-line.
pub trait ScanStrategy {
    /// Get the buffer for visible line `y`. Use `blank` for border lines.
    fn visible_line(&mut self, y: u16, blank: LineAddr) -> LineAddr;

    /// Called once per frame, when publishing the first line after the
    /// picture.
    fn vertical_blank(&mut self) {}
}

/// Shows the [`PreparedLines`].
///
/// Only holds the address, so the lines can be rebuilt while this is in use.
pub struct PreparedScan {
    geometry: Geometry,
    base: LineAddr,
}

impl PreparedScan {
    /// Scan out `prepared`, which must stay where it is for as long as this
    /// strategy is running.
    pub fn new(geometry: Geometry, prepared: &PreparedLines) -> PreparedScan {
        PreparedScan {
            geometry,
            base: prepared.base(),
        }
    }
}

impl ScanStrategy for PreparedScan {
    #[inline(always)]
    fn visible_line(&mut self, y: u16, blank: LineAddr) -> LineAddr {
        match self.geometry.source_row(y) {
            Some(row) => {
                LineAddr::from_usize(self.base.as_usize() + (row * PreparedLines::STRIDE))
            }
            None => blank,
        }
    }
}

/// Encodes each row in the interrupt, from a frame buffer taken from the
/// rotation once per frame.
///
/// Even lines go in `image[0]`, odd lines in `image[1]`. Because the engine
/// publishes one line ahead, the line being written is never the one being
/// streamed.
pub struct DirectScan<'a, const N: usize> {
    geometry: Geometry,
    palette: &'a Palette,
    image: &'a mut [ScanLine; 2],
    consumer: FrameConsumer<'a, N>,
    frame: Option<&'a FrameBuffer>,
}

impl<'a, const N: usize> DirectScan<'a, N> {
    /// `image` must already be stamped (see
    /// [`ScanlineTemplates::init`](crate::line::ScanlineTemplates::init)).
    pub fn new(
        geometry: Geometry,
        palette: &'a Palette,
        image: &'a mut [ScanLine; 2],
        consumer: FrameConsumer<'a, N>,
    ) -> DirectScan<'a, N> {
        DirectScan {
            geometry,
            palette,
            image,
            consumer,
            frame: None,
        }
    }

    /// The frame being shown, if one has been picked yet
    pub fn current_frame(&self) -> Option<&'a FrameBuffer> {
        self.frame
    }
}

impl<const N: usize> ScanStrategy for DirectScan<'_, N> {
    #[inline(always)]
    fn visible_line(&mut self, y: u16, blank: LineAddr) -> LineAddr {
        let line = &mut self.image[usize::from(y & 1)];
        let Some(frame) = self.frame else {
            return line.addr();
        };
        match self.geometry.source_row(y) {
            Some(row) => {
                line.paint_row(&self.geometry, self.palette, frame.row(row));
                line.addr()
            }
            None => blank,
        }
    }

    #[inline(always)]
    fn vertical_blank(&mut self) {
        self.frame = Some(self.consumer.acquire_for_display());
    }
}

/// Runs the scan-out, one line at a time.
pub struct ScanoutEngine<S, D> {
    timing: FrameTiming,
    blank: LineAddr,
    vsync: LineAddr,
    strategy: S,
    dma: D,
    /// The line most recently published
    y: u16,
}

impl<S, D> ScanoutEngine<S, D>
where
    S: ScanStrategy,
    D: DmaChain,
{
    /// `blank` and `vsync` are the addresses of the matching
    /// [`ScanlineTemplates`](crate::line::ScanlineTemplates).
    pub fn new(
        timing: FrameTiming,
        blank: LineAddr,
        vsync: LineAddr,
        strategy: S,
        dma: D,
    ) -> ScanoutEngine<S, D> {
        ScanoutEngine {
            timing,
            blank,
            vsync,
            strategy,
            dma,
            y: 0,
        }
    }

    /// Start streaming line 0, with line 1 queued up behind it.
    pub fn start(&mut self) {
        self.y = 0;
        let first = self.source_for(0);
        self.dma.arm(first);
        self.advance();
    }

    /// Call when the control channel has reloaded the data channel.
    ///
    /// Returns the line just published.
    #[inline(always)]
    pub fn on_line_complete(&mut self) -> u16 {
        self.advance()
    }

    /// The line most recently published
    pub fn line(&self) -> u16 {
        self.y
    }

    #[inline(always)]
    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    #[inline(always)]
    fn advance(&mut self) -> u16 {
        self.y += 1;
        if self.y >= self.timing.whole_frame {
            self.y = 0;
        }
        let next = self.source_for(self.y);
        self.dma.reload_source(next);
        self.y
    }

    #[inline(always)]
    fn source_for(&mut self, y: u16) -> LineAddr {
        if self.timing.starts_vertical_blank(y) {
            self.strategy.vertical_blank();
        }
        match self.timing.classify(y) {
            Region::Visible => self.strategy.visible_line(y, self.blank),
            Region::FrontPorch | Region::BackPorch => self.blank,
            Region::VSync => self.vsync,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
