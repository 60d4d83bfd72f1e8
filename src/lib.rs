//! # Scanline engine for an RP2040 VGA output
//!
//! Everything needed to turn a packed 4-bpp frame buffer into a stream of
//! ready-to-DMA scanlines, without touching any hardware. The firmware in
//! `firmware/` wires these pieces to PIO0 and a pair of chained DMA channels.
//!
//! The pieces, leaf first:
//!
//! * [`mode`] - video timings and the geometry derived from them
//! * [`palette`] - RGBI to output-byte lookup, two pixels at a time
//! * [`line`] - scanline buffers and the blank / v-sync templates
//! * [`prepared`] - one pre-encoded scanline per frame buffer row
//! * [`framebuffer`] and [`rotation`] - frame buffers, and the triple
//!   buffering that hands them between producer and consumer
//! * [`scanout`] - the per-scanline state machine run from the DMA IRQ

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

pub mod framebuffer;
pub mod line;
pub mod mode;
pub mod palette;
pub mod prepared;
pub mod rotation;
pub mod scanout;
pub mod take;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

pub use framebuffer::{
    FrameBuffer, FrameError, FRAME_BYTES, FRAME_HEIGHT, FRAME_STRIDE, FRAME_WIDTH,
};
pub use line::{LineAddr, ScanLine, ScanlineTemplates, SyncPattern};
pub use mode::{Geometry, ModeError, SyncPolarity, VideoMode, MODE_640X480_60HZ, MODE_AGAT7};
pub use palette::{Palette, PixelPair, Rgbi};
pub use prepared::PreparedLines;
pub use rotation::{FrameConsumer, FrameProducer, SingleBuffer, TripleBuffers, VideoBuffers};
pub use scanout::{
    DirectScan, DmaChain, FrameTiming, PreparedScan, Region, ScanStrategy, ScanoutEngine,
};
pub use take::TakeOnce;

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
