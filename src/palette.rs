//! Code for handling RGBI colours, and turning them into output bytes.

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

use crate::line::NO_SYNC;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Represents a 4-bit colour.
///
/// Bit 3 is intensity, then bits 2, 1 and 0 are red, green and blue.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgbi(u8);

impl Rgbi {
    pub const BLACK: Rgbi = Rgbi(0b0000);
    pub const BLUE: Rgbi = Rgbi(0b0001);
    pub const GREEN: Rgbi = Rgbi(0b0010);
    pub const CYAN: Rgbi = Rgbi(0b0011);
    pub const RED: Rgbi = Rgbi(0b0100);
    pub const MAGENTA: Rgbi = Rgbi(0b0101);
    pub const BROWN: Rgbi = Rgbi(0b0110);
    pub const GREY: Rgbi = Rgbi(0b0111);
    pub const DARK_GREY: Rgbi = Rgbi(0b1000);
    pub const LIGHT_BLUE: Rgbi = Rgbi(0b1001);
    pub const LIGHT_GREEN: Rgbi = Rgbi(0b1010);
    pub const LIGHT_CYAN: Rgbi = Rgbi(0b1011);
    pub const LIGHT_RED: Rgbi = Rgbi(0b1100);
    pub const LIGHT_MAGENTA: Rgbi = Rgbi(0b1101);
    pub const YELLOW: Rgbi = Rgbi(0b1110);
    pub const WHITE: Rgbi = Rgbi(0b1111);

    /// Make a colour from the bottom four bits of `value`.
    pub const fn new(value: u8) -> Rgbi {
        Rgbi(value & 0x0F)
    }

    /// Get the raw 4-bit value
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Pack two pixels into one frame buffer byte, left pixel in the low nibble.
    pub const fn pack(left: Rgbi, right: Rgbi) -> u8 {
        (right.0 << 4) | left.0
    }

    /// Split a frame buffer byte into its `(left, right)` pixels.
    pub const fn unpack(packed: u8) -> (Rgbi, Rgbi) {
        (Rgbi(packed & 0x0F), Rgbi(packed >> 4))
    }

    /// Expand to the six colour bits of an output byte.
    ///
    /// A channel that is on gives `0b11` with intensity and `0b10` without.
    /// Red is bits 0-1, green bits 2-3 and blue bits 4-5. The sync bits are
    /// left clear.
    pub const fn to_output(self) -> u8 {
        let level = if (self.0 & 0b1000) != 0 { 0b11 } else { 0b10 };
        let mut out = 0;
        if (self.0 & 0b0100) != 0 {
            out |= level;
        }
        if (self.0 & 0b0010) != 0 {
            out |= level << 2;
        }
        if (self.0 & 0b0001) != 0 {
            out |= level << 4;
        }
        out
    }
}

/// Represents two output bytes packed together.
///
/// The `first` pixel is packed in the lower 8 bits. This is because the PIO
/// shifts-right.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelPair(pub u16);

impl PixelPair {
    pub const fn from_lanes(first: u8, second: u8) -> PixelPair {
        PixelPair(((second as u16) << 8) | first as u16)
    }

    /// The left pixel's output byte
    pub const fn first(self) -> u8 {
        self.0 as u8
    }

    /// The right pixel's output byte
    pub const fn second(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// Maps every frame buffer byte (two pixels) to the two output bytes.
///
/// Each output byte carries the idle sync level as well as the colour, so a
/// looked-up pair can be dropped straight into a scan-line.
pub struct Palette {
    entries: [PixelPair; 256],
}

impl Palette {
    /// Build the table for the given sync polarity mask.
    pub const fn new(polarity: u8) -> Palette {
        let idle = NO_SYNC ^ polarity;
        let mut entries = [PixelPair(0); 256];
        let mut i = 0;
        while i < 16 {
            let mut j = 0;
            while j < 16 {
                let second = Rgbi(i as u8).to_output() | idle;
                let first = Rgbi(j as u8).to_output() | idle;
                entries[(i * 16) + j] = PixelPair::from_lanes(first, second);
                j += 1;
            }
            i += 1;
        }
        Palette { entries }
    }

    /// Look up the output for one frame buffer byte.
    #[inline(always)]
    pub fn lookup(&self, packed: u8) -> PixelPair {
        self.entries[usize::from(packed)]
    }

    /// What we draw in the margins: two black pixels.
    #[inline(always)]
    pub fn background(&self) -> PixelPair {
        self.entries[0]
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgbi_expansion() {
        assert_eq!(Rgbi::BLACK.to_output(), 0);
        assert_eq!(Rgbi::DARK_GREY.to_output(), 0);
        assert_eq!(Rgbi::RED.to_output(), 0b00_00_10);
        assert_eq!(Rgbi::LIGHT_RED.to_output(), 0b00_00_11);
        assert_eq!(Rgbi::GREEN.to_output(), 0b00_10_00);
        assert_eq!(Rgbi::BLUE.to_output(), 0b10_00_00);
        assert_eq!(Rgbi::GREY.to_output(), 0b10_10_10);
        assert_eq!(Rgbi::WHITE.to_output(), 0b11_11_11);
        assert_eq!(Rgbi::YELLOW.to_output(), 0b00_11_11);
    }

    #[test]
    fn pack_puts_left_pixel_low() {
        let b = Rgbi::pack(Rgbi::RED, Rgbi::BLUE);
        assert_eq!(b, 0x14);
        assert_eq!(Rgbi::unpack(b), (Rgbi::RED, Rgbi::BLUE));
    }

    #[test]
    fn lanes_decode_back_to_nibbles() {
        let palette = Palette::new(0b1100_0000);
        for b in 0..=255u8 {
            let pair = palette.lookup(b);
            let (left, right) = Rgbi::unpack(b);
            assert_eq!(pair.first() & 0x3F, left.to_output(), "byte {:#04x}", b);
            assert_eq!(pair.second() & 0x3F, right.to_output(), "byte {:#04x}", b);
            assert_eq!(pair.first() & 0xC0, 0xC0);
            assert_eq!(pair.second() & 0xC0, 0xC0);
        }
    }

    #[test]
    fn entry_layout() {
        let palette = Palette::new(0);
        assert_eq!(palette.background(), PixelPair(0));
        // i = 0xF (right), j = 0x4 (left)
        assert_eq!(palette.lookup(0xF4), PixelPair(0x3F02));
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
