//! One-shot access to big statics.
//!
//! The prepared lines are around 100 KiB, far too big to build on the stack,
//! so they live in a `static` and whoever sets up video takes them once.

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

use core::cell::{Cell, UnsafeCell};

use critical_section::Mutex;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A value in a `static` that can be taken, mutably, exactly once.
pub struct TakeOnce<T> {
    taken: Mutex<Cell<bool>>,
    value: UnsafeCell<T>,
}

impl<T> TakeOnce<T> {
    pub const fn new(value: T) -> TakeOnce<T> {
        TakeOnce {
            taken: Mutex::new(Cell::new(false)),
            value: UnsafeCell::new(value),
        }
    }

    /// Get the value. Every call after the first gets `None`.
    pub fn take(&'static self) -> Option<&'static mut T> {
        let already = critical_section::with(|cs| self.taken.borrow(cs).replace(true));
        if already {
            None
        } else {
            // Safety: the flag above means this reference is the only one
            Some(unsafe { &mut *self.value.get() })
        }
    }
}

unsafe impl<T: Send> Sync for TakeOnce<T> {}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    static COUNTER: TakeOnce<u32> = TakeOnce::new(5);

    #[test]
    fn only_once() {
        let first = COUNTER.take();
        assert!(first.is_some());
        if let Some(value) = first {
            *value += 1;
            assert_eq!(*value, 6);
        }
        assert!(COUNTER.take().is_none());
        assert!(COUNTER.take().is_none());
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
