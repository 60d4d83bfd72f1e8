//! # agat-vga
//!
//! Rust Firmware that puts a 256x256, 16-colour frame buffer on a VGA
//! monitor, from an RP2040.
//!
//! The scan-out runs from the DMA interrupt. Thread mode draws a test pattern
//! into whichever frame buffer the rotation hands it.

#![no_std]
#![no_main]

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
// Sub-modules
// -----------------------------------------------------------------------------

mod hw;
mod pattern;
mod vga;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use agat_vga::{Geometry, Palette, ScanlineTemplates, TakeOnce, VideoBuffers, VideoMode};
use cortex_m_rt::exception;
use defmt_rtt as _;
use embedded_hal::digital::StatefulOutputPin;
use panic_probe as _;
use rp2040_hal::{self as hal, pac};

#[cfg(not(feature = "direct-scan"))]
use agat_vga::{PreparedLines, PreparedScan};

#[cfg(feature = "direct-scan")]
use agat_vga::DirectScan;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// All our frame buffers, and the rotation between them
type Buffers = VideoBuffers<SLOTS>;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

#[link_section = ".boot2"]
#[no_mangle]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// The timing we put out
#[cfg(not(feature = "vga-640x480"))]
const MODE: VideoMode = agat_vga::MODE_AGAT7;

/// The timing we put out
#[cfg(feature = "vga-640x480")]
const MODE: VideoMode = agat_vga::MODE_640X480_60HZ;

/// How many frame buffers we have room for.
///
/// With `hires` one buffer is shared between drawing and scan-out.
#[cfg(not(feature = "hires"))]
pub const SLOTS: usize = 3;

/// How many frame buffers we have room for.
///
/// With `hires` one buffer is shared between drawing and scan-out.
#[cfg(feature = "hires")]
pub const SLOTS: usize = 1;

/// How often to print statistics, in frames
const STATS_INTERVAL: u32 = 256;

static VIDEO_BUFFERS: Buffers = VideoBuffers::new();

static PALETTE: Palette = Palette::new(MODE.sync_polarity);

static TEMPLATES: TakeOnce<ScanlineTemplates> = TakeOnce::new(ScanlineTemplates::new());

#[cfg(not(feature = "direct-scan"))]
static PREPARED: TakeOnce<PreparedLines> = TakeOnce::new(PreparedLines::new());

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

#[hal::entry]
fn main() -> ! {
    defmt::info!(
        "Firmware {} {} starting up",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = MODE.check() {
        defmt::panic!("Video mode is no good: {}", e);
    }
    let geometry = Geometry::derive(&MODE);
    defmt::info!("Geometry: {}", geometry);

    let periph = defmt::unwrap!(pac::Peripherals::take());
    let mut hw = hw::Hardware::init(periph, &MODE);

    let templates = defmt::unwrap!(TEMPLATES.take());
    templates.init(&geometry);
    let ScanlineTemplates {
        blank,
        vsync,
        image,
    } = templates;

    VIDEO_BUFFERS.clear_video_buffers();
    VIDEO_BUFFERS.set_buffering_mode(true);
    defmt::info!(
        "{=usize} frame buffer(s), buffering is {=bool}",
        SLOTS,
        VIDEO_BUFFERS.buffering_mode()
    );
    #[cfg_attr(feature = "direct-scan", allow(unused_mut))]
    let (mut producer, mut consumer) = defmt::unwrap!(VIDEO_BUFFERS.split());

    #[cfg(not(feature = "direct-scan"))]
    let (strategy, prepared) = {
        let _ = image;
        let prepared = defmt::unwrap!(PREPARED.take());
        prepared.init(&geometry);
        prepared.rebuild(&geometry, consumer.acquire_for_display(), &PALETTE);
        (PreparedScan::new(geometry, prepared), prepared)
    };

    #[cfg(feature = "direct-scan")]
    let strategy = DirectScan::new(geometry, &PALETTE, image, consumer);

    vga::init(hw.video, &MODE, blank.addr(), vsync.addr(), strategy);

    defmt::info!("Drawing...");

    let mut pattern = pattern::TestPattern::new();
    let mut frame = vga::frame_count();
    let mut drawn: u32 = 0;
    let mut skipped: u32 = 0;
    loop {
        frame = vga::wait_for_frame(frame);

        // The interrupt only knows where the prepared lines are, so we swap
        // frames in for it. This goes first, while the beam is in vertical
        // blanking.
        #[cfg(not(feature = "direct-scan"))]
        prepared.rebuild(&geometry, consumer.acquire_for_display(), &PALETTE);

        match producer.acquire_for_write() {
            Some(fb) => {
                if let Err(e) = pattern.draw(fb) {
                    defmt::warn!("Drawing failed: {}", e);
                }
                drawn = drawn.wrapping_add(1);
                let _ = hw.led.toggle();
            }
            None => {
                defmt::debug!("No free frame buffer on frame {=u32}", frame);
                skipped = skipped.wrapping_add(1);
            }
        }

        if frame % STATS_INTERVAL == 0 {
            defmt::debug!(
                "frame={=u32} drawn={=u32} skipped={=u32} line={=u16}",
                frame,
                drawn,
                skipped,
                vga::scan_line()
            );
        }
    }
}

#[exception]
unsafe fn HardFault(frame: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::error!(
        "HardFault! pc={=u32:08x} lr={=u32:08x} r0={=u32:08x} r1={=u32:08x} r2={=u32:08x} r3={=u32:08x} r12={=u32:08x} xpsr={=u32:08x}",
        frame.pc(),
        frame.lr(),
        frame.r0(),
        frame.r1(),
        frame.r2(),
        frame.r3(),
        frame.r12(),
        frame.xpsr()
    );
    cortex_m::asm::udf();
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
