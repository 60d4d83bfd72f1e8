//! Clocks, core voltage and pins.

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

use agat_vga::VideoMode;
use fugit::RateExtU32;
use rp2040_hal::{
    clocks,
    gpio::{
        bank0, DynPinId, FunctionPio0, FunctionSioOutput, OutputDriveStrength, OutputSlewRate,
        Pin, Pins, PullDown, PullNone,
    },
    pac, pll, xosc, Clock as _, Sio, Watchdog,
};

// -----------------------------------------------------------------------------
// Macros
// -----------------------------------------------------------------------------

/// Hand a pin over to PIO0, with a slow edge and low drive.
macro_rules! vga_pin {
    ($pin:expr) => {{
        let mut pin = $pin.reconfigure::<FunctionPio0, PullNone>();
        pin.set_drive_strength(OutputDriveStrength::FourMilliAmps);
        pin.set_slew_rate(OutputSlewRate::Slow);
        pin.into_dyn_pin()
    }};
}

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One of the eight pins driven by the pixel state machine
pub type VgaPin = Pin<DynPinId, FunctionPio0, PullNone>;

/// The eight VGA pins, starting at [`FIRST_VGA_PIN`].
///
/// Bits 0-1 are red, 2-3 green, 4-5 blue, then H-Sync and V-Sync. They are
/// owned by PIO0 once configured; we only hold them so nothing else can.
pub struct VgaPins {
    _pins: [VgaPin; 8],
}

/// The peripherals the video code takes over.
pub struct VideoHardware {
    /// Drives the pins, from the pixel state machine
    pub pio: pac::PIO0,
    /// Feeds the pixel state machine
    pub dma: pac::DMA,
    pub resets: pac::RESETS,
    /// What the system clock actually came out as
    pub sys_clock_hz: u32,
}

pub struct Hardware {
    pub video: VideoHardware,
    pub _vga_pins: VgaPins,
    /// Toggled once per drawn frame
    pub led: Pin<bank0::Gpio25, FunctionSioOutput, PullDown>,
}

impl Hardware {
    /// Call this once on start-up to initialise the hardware
    pub fn init(mut periph: pac::Peripherals, mode: &VideoMode) -> Hardware {
        let mut watchdog = Watchdog::new(periph.WATCHDOG);
        let sio = Sio::new(periph.SIO);

        // Both modes run the core faster than the default 1.10 V is good for
        defmt::info!("Setting core voltage to 1.25 V");
        periph
            .VREG_AND_CHIP_RESET
            .vreg()
            .modify(|_r, w| unsafe { w.vsel().bits(VREG_VSEL_1V25) });
        // Let the regulator settle (around 1 ms on the ring oscillator)
        cortex_m::asm::delay(VREG_SETTLE_CYCLES);

        defmt::info!("Configuring clocks for {=u32} kHz...", mode.sys_freq_khz);

        // Step 1. Turn on the crystal.
        let xosc = xosc::setup_xosc_blocking(periph.XOSC, XOSC_CRYSTAL_FREQ.Hz())
            .unwrap_or_else(|_| defmt::panic!("Crystal oscillator failed to start"));
        // Step 2. Configure watchdog tick generation to tick over every microsecond.
        watchdog.enable_tick_generation((XOSC_CRYSTAL_FREQ / 1_000_000) as u8);
        // Step 3. Create a clocks manager.
        let mut clocks = clocks::ClocksManager::new(periph.CLOCKS);
        // Step 4. Set up the system PLL.
        //
        // We take the Crystal Oscillator (=12 MHz) with no divider, and ×126 to
        // give a FOUTVCO of 1512 MHz, then post-divide down to the system
        // clock the mode wants.
        let pll_sys = pll::setup_pll_blocking(
            periph.PLL_SYS,
            xosc.operating_frequency(),
            sys_pll_config(mode),
            &mut clocks,
            &mut periph.RESETS,
        )
        .unwrap_or_else(|_| defmt::panic!("System PLL failed to lock"));
        // Step 5. Set up a 48 MHz PLL for the USB system.
        let pll_usb = pll::setup_pll_blocking(
            periph.PLL_USB,
            xosc.operating_frequency(),
            pll::common_configs::PLL_USB_48MHZ,
            &mut clocks,
            &mut periph.RESETS,
        )
        .unwrap_or_else(|_| defmt::panic!("USB PLL failed to lock"));
        // Step 6. Set the system to run from the PLLs we just configured.
        clocks
            .init_default(&xosc, &pll_sys, &pll_usb)
            .unwrap_or_else(|_| defmt::panic!("Clock tree failed to configure"));

        let sys_clock_hz = clocks.system_clock.freq().to_Hz();
        defmt::info!("Clocks OK! System clock is {=u32} Hz", sys_clock_hz);

        defmt::info!("Configuring pins, first VGA pin is GPIO{=u8}", FIRST_VGA_PIN);

        let hal_pins = Pins::new(
            periph.IO_BANK0,
            periph.PADS_BANK0,
            sio.gpio_bank0,
            &mut periph.RESETS,
        );

        #[cfg(not(feature = "board-murmulator"))]
        let pins = [
            vga_pin!(hal_pins.gpio8),
            vga_pin!(hal_pins.gpio9),
            vga_pin!(hal_pins.gpio10),
            vga_pin!(hal_pins.gpio11),
            vga_pin!(hal_pins.gpio12),
            vga_pin!(hal_pins.gpio13),
            vga_pin!(hal_pins.gpio14),
            vga_pin!(hal_pins.gpio15),
        ];
        #[cfg(feature = "board-murmulator")]
        let pins = [
            vga_pin!(hal_pins.gpio6),
            vga_pin!(hal_pins.gpio7),
            vga_pin!(hal_pins.gpio8),
            vga_pin!(hal_pins.gpio9),
            vga_pin!(hal_pins.gpio10),
            vga_pin!(hal_pins.gpio11),
            vga_pin!(hal_pins.gpio12),
            vga_pin!(hal_pins.gpio13),
        ];

        Hardware {
            video: VideoHardware {
                pio: periph.PIO0,
                dma: periph.DMA,
                resets: periph.RESETS,
                sys_clock_hz,
            },
            _vga_pins: VgaPins { _pins: pins },
            led: hal_pins.gpio25.reconfigure(),
        }
    }
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// On-board crystal frequency, in Hz.
const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;

/// VREG VSEL value for 1.25 V
const VREG_VSEL_1V25: u8 = 0b1110;

const VREG_SETTLE_CYCLES: u32 = 10_000;

/// The GPIO carrying red bit 0. The other seven follow on from it.
#[cfg(not(feature = "board-murmulator"))]
pub const FIRST_VGA_PIN: u8 = 8;

/// The GPIO carrying red bit 0. The other seven follow on from it.
#[cfg(feature = "board-murmulator")]
pub const FIRST_VGA_PIN: u8 = 6;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Pick the PLL post dividers that give the mode's system clock from a
/// 1512 MHz VCO.
fn sys_pll_config(mode: &VideoMode) -> pll::PLLConfig {
    let (post_div1, post_div2) = match mode.sys_freq_khz {
        126_000 => (6, 2),
        252_000 => (6, 1),
        other => defmt::panic!("No PLL configuration for {=u32} kHz", other),
    };
    pll::PLLConfig {
        vco_freq: 1512.MHz(),
        refdiv: 1,
        post_div1,
        post_div2,
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
