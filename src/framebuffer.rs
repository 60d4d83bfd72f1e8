//! The packed 4-bpp frame buffer the producer draws into.

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

use core::cell::UnsafeCell;
use core::marker::PhantomData;

use crate::palette::Rgbi;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Things that can go wrong drawing into a [`FrameBuffer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Some part of the shape is off the edge of the frame
    OutOfBounds,
}

/// Holds a 256x256 picture, with two pixels per byte.
///
/// The left pixel of each pair is in the low nibble. Rows are
/// [`FRAME_STRIDE`] bytes apart.
///
/// Access is through `&self`, because the scan-out interrupt may be reading
/// a buffer at the same time as the producer writes it (always in single
/// buffer mode, and only by mistake otherwise). That shows up as tearing on
/// screen, nothing worse.
#[repr(C, align(4))]
pub struct FrameBuffer {
    contents: UnsafeCell<[u8; FRAME_BYTES]>,
}

impl FrameBuffer {
    /// Make a black frame buffer.
    pub const fn new() -> FrameBuffer {
        FrameBuffer {
            contents: UnsafeCell::new([0u8; FRAME_BYTES]),
        }
    }

    /// Set every pixel to black.
    pub fn clear(&self) {
        self.fill(Rgbi::BLACK);
    }

    /// Set every pixel to one colour.
    pub fn fill(&self, colour: Rgbi) {
        let ptr = self.contents.get() as *mut u8;
        unsafe {
            ptr.write_bytes(Rgbi::pack(colour, colour), FRAME_BYTES);
        }
    }

    /// Set one pixel. Pixels off the edge are ignored.
    pub fn store_pixel(&self, x: usize, y: usize, colour: Rgbi) {
        if x >= FRAME_WIDTH || y >= FRAME_HEIGHT {
            return;
        }
        let offset = (y * FRAME_STRIDE) + (x / 2);
        let ptr = self.contents.get() as *mut u8;
        unsafe {
            let old = ptr.add(offset).read();
            let new = if (x & 1) == 0 {
                (old & 0xF0) | colour.value()
            } else {
                (old & 0x0F) | (colour.value() << 4)
            };
            ptr.add(offset).write(new);
        }
    }

    /// Read one pixel. Pixels off the edge are black.
    pub fn read_pixel(&self, x: usize, y: usize) -> Rgbi {
        if x >= FRAME_WIDTH || y >= FRAME_HEIGHT {
            return Rgbi::BLACK;
        }
        let (left, right) = Rgbi::unpack(self.read_packed(x / 2, y));
        if (x & 1) == 0 {
            left
        } else {
            right
        }
    }

    /// Set a pixel pair from a packed byte. Pairs off the edge are ignored.
    pub fn store_packed(&self, x_pair: usize, y: usize, packed: u8) {
        if x_pair >= FRAME_STRIDE || y >= FRAME_HEIGHT {
            return;
        }
        let ptr = self.contents.get() as *mut u8;
        unsafe {
            ptr.add((y * FRAME_STRIDE) + x_pair).write(packed);
        }
    }

    /// Read a pixel pair as a packed byte. Pairs off the edge read as zero.
    pub fn read_packed(&self, x_pair: usize, y: usize) -> u8 {
        if x_pair >= FRAME_STRIDE || y >= FRAME_HEIGHT {
            return 0;
        }
        let ptr = self.contents.get() as *const u8;
        unsafe { ptr.add((y * FRAME_STRIDE) + x_pair).read() }
    }

    /// Fill `len_pairs` pixel pairs along row `y`, starting at `x_pair`.
    ///
    /// Nothing is drawn unless the whole span fits.
    pub fn fill_span(
        &self,
        x_pair: usize,
        y: usize,
        len_pairs: usize,
        colour: Rgbi,
    ) -> Result<(), FrameError> {
        let end = x_pair.checked_add(len_pairs).ok_or(FrameError::OutOfBounds)?;
        if end > FRAME_STRIDE || y >= FRAME_HEIGHT {
            return Err(FrameError::OutOfBounds);
        }
        let ptr = self.contents.get() as *mut u8;
        unsafe {
            ptr.add((y * FRAME_STRIDE) + x_pair)
                .write_bytes(Rgbi::pack(colour, colour), len_pairs);
        }
        Ok(())
    }

    /// Fill pixel pair `x_pair` on `len` rows, starting at row `y`.
    ///
    /// Nothing is drawn unless the whole column fits.
    pub fn fill_column(
        &self,
        x_pair: usize,
        y: usize,
        len: usize,
        colour: Rgbi,
    ) -> Result<(), FrameError> {
        let end = y.checked_add(len).ok_or(FrameError::OutOfBounds)?;
        if x_pair >= FRAME_STRIDE || end > FRAME_HEIGHT {
            return Err(FrameError::OutOfBounds);
        }
        let packed = Rgbi::pack(colour, colour);
        for row in y..end {
            self.store_packed(x_pair, row, packed);
        }
        Ok(())
    }

    /// Walk the packed bytes of row `y`, left to right.
    ///
    /// A row off the bottom of the frame is empty.
    #[inline(always)]
    pub fn row(&self, y: usize) -> Row<'_> {
        let remaining = if y < FRAME_HEIGHT { FRAME_STRIDE } else { 0 };
        let offset = if y < FRAME_HEIGHT { y * FRAME_STRIDE } else { 0 };
        Row {
            ptr: unsafe { (self.contents.get() as *const u8).add(offset) },
            remaining,
            _buffer: PhantomData,
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        FrameBuffer::new()
    }
}

unsafe impl Sync for FrameBuffer {}

/// The bytes of one frame buffer row. See [`FrameBuffer::row`].
pub struct Row<'a> {
    ptr: *const u8,
    remaining: usize,
    _buffer: PhantomData<&'a FrameBuffer>,
}

impl Iterator for Row<'_> {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        // Safety: we started inside a row and never step past its end
        let value = unsafe { self.ptr.read() };
        self.remaining -= 1;
        if self.remaining != 0 {
            self.ptr = unsafe { self.ptr.add(1) };
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Row<'_> {}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Pixels across
pub const FRAME_WIDTH: usize = 256;
/// Pixels down
pub const FRAME_HEIGHT: usize = 256;
/// Bytes per row
pub const FRAME_STRIDE: usize = FRAME_WIDTH / 2;
/// Bytes per frame
pub const FRAME_BYTES: usize = FRAME_STRIDE * FRAME_HEIGHT;

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> Box<FrameBuffer> {
        Box::new(FrameBuffer::new())
    }

    #[test]
    fn pixels_pack_left_low() {
        let fb = buffer();
        fb.store_pixel(10, 3, Rgbi::RED);
        fb.store_pixel(11, 3, Rgbi::CYAN);
        assert_eq!(fb.read_packed(5, 3), 0x34);
        assert_eq!(fb.read_pixel(10, 3), Rgbi::RED);
        assert_eq!(fb.read_pixel(11, 3), Rgbi::CYAN);
        // Replacing one half leaves the other alone
        fb.store_pixel(10, 3, Rgbi::WHITE);
        assert_eq!(fb.read_packed(5, 3), 0x3F);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let fb = buffer();
        fb.store_pixel(256, 0, Rgbi::WHITE);
        fb.store_pixel(0, 256, Rgbi::WHITE);
        fb.store_packed(128, 0, 0xFF);
        assert!(fb.row(0).all(|b| b == 0));
        assert_eq!(fb.read_pixel(300, 300), Rgbi::BLACK);
        assert_eq!(fb.row(256).count(), 0);
    }

    #[test]
    fn spans_and_columns() {
        let fb = buffer();
        assert_eq!(fb.fill_span(120, 7, 8, Rgbi::GREEN), Ok(()));
        assert_eq!(
            fb.fill_span(121, 7, 8, Rgbi::WHITE),
            Err(FrameError::OutOfBounds)
        );
        assert_eq!(
            fb.fill_span(usize::MAX, 7, 2, Rgbi::WHITE),
            Err(FrameError::OutOfBounds)
        );
        let row: Vec<u8> = fb.row(7).collect();
        assert!(row[..120].iter().all(|b| *b == 0));
        assert!(row[120..].iter().all(|b| *b == 0x22));

        assert_eq!(fb.fill_column(3, 250, 6, Rgbi::BLUE), Ok(()));
        assert_eq!(
            fb.fill_column(3, 251, 6, Rgbi::WHITE),
            Err(FrameError::OutOfBounds)
        );
        for y in 250..256 {
            assert_eq!(fb.read_packed(3, y), 0x11);
        }
        assert_eq!(fb.read_packed(3, 249), 0);
    }

    #[test]
    fn clear_and_fill() {
        let fb = buffer();
        fb.fill(Rgbi::YELLOW);
        assert!((0..FRAME_HEIGHT).all(|y| fb.row(y).all(|b| b == 0xEE)));
        fb.clear();
        assert!((0..FRAME_HEIGHT).all(|y| fb.row(y).all(|b| b == 0)));
    }

    #[test]
    fn row_iterator() {
        let fb = buffer();
        for x in 0..FRAME_STRIDE {
            fb.store_packed(x, 255, x as u8);
        }
        let row = fb.row(255);
        assert_eq!(row.len(), FRAME_STRIDE);
        assert!(row.enumerate().all(|(x, b)| b == x as u8));
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
