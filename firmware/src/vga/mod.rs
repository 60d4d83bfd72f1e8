//! Drives the VGA output from PIO0 and DMA channels 0 and 1.
//!
//! The pixel state machine just does `out pins, 8` forever, at one output
//! byte per `div` pixel clocks. Sync pulses are part of the data, so the
//! whole picture is a sequence of scan-line buffers:
//!
//! * DMA channel 0 streams one scan-line (`line_words` words) into the TX
//!   FIFO, paced by the FIFO's DREQ, then chains to channel 1.
//! * DMA channel 1 copies one word from [`MAILBOX`] into channel 0's read
//!   address, chains back to channel 0, and raises `DMA_IRQ_0`.
//!
//! The interrupt runs the [`ScanoutEngine`], which puts the address of the
//! line after next into the mailbox.

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

use core::cell::RefCell;
use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use agat_vga::{DmaChain, FrameTiming, LineAddr, ScanoutEngine, VideoMode};
use critical_section::Mutex;
use rp2040_hal::{
    self as hal,
    pac::{self, interrupt},
    pio::PIOExt,
};

use crate::hw::{VideoHardware, FIRST_VGA_PIN};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

#[cfg(not(feature = "direct-scan"))]
pub type Strategy = agat_vga::PreparedScan;

#[cfg(feature = "direct-scan")]
pub type Strategy = agat_vga::DirectScan<'static, { crate::SLOTS }>;

/// What the scan-line interrupt runs
pub type Engine = ScanoutEngine<Strategy, ChainedDma>;

/// DMA channels 0 and 1, chained together.
pub struct ChainedDma {
    dma: pac::DMA,
    /// Where channel 0 writes to
    fifo_addr: u32,
    /// Channel 0's pacing signal
    dreq: u8,
    /// Length of every line, in 32-bit words
    line_words: u32,
}

impl ChainedDma {
    fn new(dma: pac::DMA, fifo_addr: u32, dreq: u8, line_words: u32) -> ChainedDma {
        ChainedDma {
            dma,
            fifo_addr,
            dreq,
            line_words,
        }
    }
}

impl DmaChain for ChainedDma {
    fn arm(&mut self, first: LineAddr) {
        MAILBOX.store(first.as_u32(), Ordering::Relaxed);

        // Control channel first. Triggering it here only copies the mailbox
        // into channel 0, which ignores the chain trigger while disabled.
        let data_read_addr = self.dma.ch(DATA_DMA_CHAN).ch_read_addr().as_ptr() as u32;
        let control = self.dma.ch(CONTROL_DMA_CHAN);
        control
            .ch_read_addr()
            .write(|w| unsafe { w.bits(MAILBOX.as_ptr() as u32) });
        control
            .ch_write_addr()
            .write(|w| unsafe { w.bits(data_read_addr) });
        control.ch_trans_count().write(|w| unsafe { w.bits(1) });
        control.ch_ctrl_trig().write(|w| {
            w.data_size().size_word();
            w.incr_read().clear_bit();
            w.incr_write().clear_bit();
            unsafe { w.treq_sel().bits(TREQ_UNPACED) };
            unsafe { w.chain_to().bits(DATA_DMA_CHAN as u8) };
            unsafe { w.ring_size().bits(0) };
            w.ring_sel().clear_bit();
            w.bswap().clear_bit();
            w.irq_quiet().clear_bit();
            w.en().set_bit();
            w.sniff_en().clear_bit();
            w
        });
        while self
            .dma
            .ch(CONTROL_DMA_CHAN)
            .ch_ctrl_trig()
            .read()
            .busy()
            .bit_is_set()
        {
            core::hint::spin_loop();
        }

        // That transfer raised an interrupt we don't want
        self.dma
            .ints0()
            .write(|w| unsafe { w.ints0().bits(1 << CONTROL_DMA_CHAN) });
        self.dma
            .inte0()
            .write(|w| unsafe { w.inte0().bits(1 << CONTROL_DMA_CHAN) });

        // Now the data channel, which starts streaming straight away
        let data = self.dma.ch(DATA_DMA_CHAN);
        data.ch_read_addr()
            .write(|w| unsafe { w.bits(first.as_u32()) });
        data.ch_write_addr()
            .write(|w| unsafe { w.bits(self.fifo_addr) });
        data.ch_trans_count()
            .write(|w| unsafe { w.bits(self.line_words) });
        data.ch_ctrl_trig().write(|w| {
            w.data_size().size_word();
            w.incr_read().set_bit();
            w.incr_write().clear_bit();
            unsafe { w.treq_sel().bits(self.dreq) };
            unsafe { w.chain_to().bits(CONTROL_DMA_CHAN as u8) };
            unsafe { w.ring_size().bits(0) };
            w.ring_sel().clear_bit();
            w.bswap().clear_bit();
            w.irq_quiet().set_bit();
            w.en().set_bit();
            w.sniff_en().clear_bit();
            w
        });
    }

    #[inline]
    fn reload_source(&mut self, next: LineAddr) {
        MAILBOX.store(next.as_u32(), Ordering::Relaxed);
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Streams scan-lines into the pixel state machine
const DATA_DMA_CHAN: usize = 0;

/// Reloads the data channel, and interrupts us once per scan-line
const CONTROL_DMA_CHAN: usize = 1;

/// TREQ_SEL value for "run as fast as possible"
const TREQ_UNPACED: u8 = 0x3F;

/// The address of the next scan-line. DMA channel 1 reads it.
static MAILBOX: AtomicU32 = AtomicU32::new(0);

/// Handed to the interrupt once, then never touched from thread mode again.
static ENGINE: Mutex<RefCell<Option<Engine>>> = Mutex::new(RefCell::new(None));

/// The scan-line most recently published by the interrupt.
///
/// These are timing lines, so they run up to `whole_frame`.
static SCAN_LINE: AtomicU16 = AtomicU16::new(0);

/// Vertical blanks started since video was enabled. Only the interrupt
/// writes it.
static FRAME_COUNT: AtomicU32 = AtomicU32::new(0);

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Set up PIO0 and the DMA chain, and start video.
///
/// `blank` and `vsync` are the fixed templates. Visible lines come from
/// `strategy`.
pub fn init(
    hw: VideoHardware,
    mode: &VideoMode,
    blank: LineAddr,
    vsync: LineAddr,
    strategy: Strategy,
) {
    let VideoHardware {
        pio,
        dma,
        mut resets,
        sys_clock_hz,
    } = hw;
    let resets = &mut resets;

    // Grab PIO0 and the state machines it contains
    let (mut pio, sm0, _sm1, _sm2, _sm3) = pio.split(resets);

    // Reset the DMA Peripheral.
    resets.reset().modify(|_r, w| w.dma().set_bit());
    cortex_m::asm::nop();
    resets.reset().modify(|_r, w| w.dma().clear_bit());
    while resets.reset_done().read().dma().bit_is_clear() {}

    // This is the whole pixel program. Every output byte carries the colour
    // and both sync signals, so there is nothing to wait for.
    //
    // Note: autopull should be set to 32-bits, OSR is set to shift right, so
    // the lowest byte of each word comes out first.
    let pixel_program = pio_proc::pio_asm!(
        ".wrap_target"
        "out pins, 8"
        ".wrap"
    );

    let (int, frac) = mode.clock_divisor(sys_clock_hz);
    defmt::info!(
        "Pixel SM divisor is {=u16}+{=u8}/256, on GPIO{=u8}..",
        int,
        frac,
        FIRST_VGA_PIN
    );

    let pixels_installed = pio
        .install(&pixel_program.program)
        .unwrap_or_else(|_| defmt::panic!("Pixel program does not fit in PIO0"));
    let (mut pixel_sm, _, pixel_fifo) =
        hal::pio::PIOBuilder::from_installed_program(pixels_installed)
            .buffers(hal::pio::Buffers::OnlyTx)
            .out_pins(FIRST_VGA_PIN, 8)
            .autopull(true)
            .out_shift_direction(hal::pio::ShiftDirection::Right)
            .pull_threshold(32)
            .clock_divisor_fixed_point(int, frac)
            .build(sm0);
    pixel_sm.set_pindirs((FIRST_VGA_PIN..FIRST_VGA_PIN + 8).map(|x| (x, hal::pio::PinDir::Output)));

    let chain = ChainedDma::new(
        dma,
        pixel_fifo.fifo_address() as usize as u32,
        pixel_fifo.dreq_value(),
        mode.line_words() as u32,
    );
    let mut engine = ScanoutEngine::new(FrameTiming::new(mode), blank, vsync, strategy, chain);

    pixel_sm.start();

    // Anything pending is from before we were ready
    cortex_m::peripheral::NVIC::unpend(pac::Interrupt::DMA_IRQ_0);

    defmt::info!("Starting DMA, {=usize} words per line", mode.line_words());
    engine.start();
    critical_section::with(|cs| {
        ENGINE.borrow(cs).replace(Some(engine));
    });

    // The first line is already streaming, and the interrupt has to be
    // running before it ends.
    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::DMA_IRQ_0);
    }

    // We drop our state-machine and PIO objects here - this means the video
    // cannot be reconfigured at a later time, but they do keep on running
    // as-is.
}

/// Get the current scan line.
pub fn scan_line() -> u16 {
    SCAN_LINE.load(Ordering::Relaxed)
}

/// Get the number of frames scanned out so far.
pub fn frame_count() -> u32 {
    FRAME_COUNT.load(Ordering::Acquire)
}

/// Sleep until the picture after frame `last` has been scanned out, and
/// return the new frame number.
///
/// We wake at the top of vertical blanking, so whatever the caller touches
/// first is not on screen.
pub fn wait_for_frame(last: u32) -> u32 {
    loop {
        let now = frame_count();
        if now != last {
            return now;
        }
        // The scan-line interrupt wakes us every line
        cortex_m::asm::wfi();
    }
}

/// Called when DMA channel 1 has reloaded channel 0, i.e. once per
/// scan-line.
///
/// Channel 0 is now streaming the line we published last time, so we have
/// until it finishes to publish the next one.
#[link_section = ".data"]
#[interrupt]
fn DMA_IRQ_0() {
    static mut LOCAL_ENGINE: Option<Engine> = None;

    let dma = unsafe { &*pac::DMA::ptr() };
    dma.ints0()
        .write(|w| unsafe { w.ints0().bits(1 << CONTROL_DMA_CHAN) });

    if LOCAL_ENGINE.is_none() {
        *LOCAL_ENGINE = critical_section::with(|cs| ENGINE.borrow(cs).take());
    }

    if let Some(engine) = LOCAL_ENGINE {
        let line = engine.on_line_complete();
        SCAN_LINE.store(line, Ordering::Relaxed);
        if engine.timing().starts_vertical_blank(line) {
            // Only we write this, so no compare-and-swap needed
            let frames = FRAME_COUNT.load(Ordering::Relaxed);
            FRAME_COUNT.store(frames.wrapping_add(1), Ordering::Release);
        }
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
