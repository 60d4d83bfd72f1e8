//! Hands frame buffers between the producer and the scan-out.
//!
//! With three slots, the producer draws into one, the scan-out shows another,
//! and the third holds whichever finished frame is waiting. Neither side ever
//! blocks, and neither side ever gets the slot the other one is using.
//!
//! Each slot has a `ready` flag, meaning "the scan-out has finished with this,
//! the producer may draw into it". Only the display side sets a flag and only
//! the write side clears one:
//!
//! * [`FrameProducer::acquire_for_write`] commits the slot the producer was
//!   drawing into (clears its flag) and moves on to the next ready slot, or
//!   returns `None` if there isn't one. Call it once per frame, and draw into
//!   what it returns.
//! * [`FrameConsumer::acquire_for_display`] releases the slot being shown
//!   (sets its flag) and moves on to a slot that is not ready, i.e. one the
//!   producer has committed. If there is no such slot the current frame is
//!   shown again. Call it once per frame, before the first visible line.
//!
//! Until the producer's first call, the scan-out shows slot 0. With
//! buffering turned off, or with only one slot, both sides always get slot 0
//! and tearing is possible.
//!
//! The Cortex-M0+ has no compare-and-swap, so every flag is a plain atomic
//! load or store, and each field has one writer per transition.

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

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use critical_section::Mutex;

use crate::framebuffer::FrameBuffer;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Three slots, rotated between producer and scan-out.
pub type TripleBuffers = VideoBuffers<3>;

/// One slot, shared by producer and scan-out.
pub type SingleBuffer = VideoBuffers<1>;

/// A pool of frame buffers and the state that rotates them.
///
/// Only one or three slots are supported.
pub struct VideoBuffers<const N: usize> {
    slots: [FrameBuffer; N],
    rotation: Rotation,
    split: Mutex<Cell<bool>>,
}

impl<const N: usize> VideoBuffers<N> {
    /// Make a pool of black frame buffers, with buffering turned off.
    pub const fn new() -> VideoBuffers<N> {
        const {
            assert!(N == 1 || N == 3, "VideoBuffers needs one or three slots");
        }
        VideoBuffers {
            slots: [const { FrameBuffer::new() }; N],
            rotation: Rotation::new(),
            split: Mutex::new(Cell::new(false)),
        }
    }

    /// Get the producer and consumer handles.
    ///
    /// Only the first call gets them. Each side has exactly one owner.
    pub fn split(&self) -> Option<(FrameProducer<'_, N>, FrameConsumer<'_, N>)> {
        let already = critical_section::with(|cs| self.split.borrow(cs).replace(true));
        if already {
            None
        } else {
            Some((FrameProducer { buffers: self }, FrameConsumer { buffers: self }))
        }
    }

    /// Turn frame rotation on or off.
    ///
    /// Has no effect with a single slot.
    pub fn set_buffering_mode(&self, enabled: bool) {
        self.rotation.buffering.store(enabled, Ordering::Release);
    }

    /// Is frame rotation turned on?
    #[inline(always)]
    pub fn buffering_mode(&self) -> bool {
        N > 1 && self.rotation.buffering.load(Ordering::Acquire)
    }

    /// Blank every slot and put the rotation back to where it started.
    ///
    /// Only call this when neither side is part-way through an acquire.
    pub fn clear_video_buffers(&self) {
        for slot in self.slots.iter() {
            slot.clear();
        }
        self.rotation.reset();
    }

    /// Get a slot by number.
    pub fn slot(&self, index: usize) -> Option<&FrameBuffer> {
        self.slots.get(index)
    }

    /// Which slot is this?
    pub fn index_of(&self, buffer: &FrameBuffer) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| core::ptr::eq(slot, buffer))
    }

    fn acquire_in(&self) -> Option<usize> {
        if self.buffering_mode() {
            self.rotation.acquire_in()
        } else {
            Some(0)
        }
    }

    #[inline(always)]
    fn acquire_out(&self) -> usize {
        if self.buffering_mode() {
            self.rotation.acquire_out()
        } else {
            0
        }
    }
}

impl<const N: usize> Default for VideoBuffers<N> {
    fn default() -> Self {
        VideoBuffers::new()
    }
}

/// The drawing side of a [`VideoBuffers`].
pub struct FrameProducer<'a, const N: usize> {
    buffers: &'a VideoBuffers<N>,
}

impl<'a, const N: usize> FrameProducer<'a, N> {
    /// Commit the last frame, and get a buffer for the next one.
    ///
    /// `None` means the scan-out hasn't finished with anything yet. Skip this
    /// frame and try again later.
    #[doc(alias = "get_v_buf_in")]
    pub fn acquire_for_write(&mut self) -> Option<&'a FrameBuffer> {
        let index = self.buffers.acquire_in()?;
        Some(&self.buffers.slots[index])
    }
}

/// The display side of a [`VideoBuffers`].
pub struct FrameConsumer<'a, const N: usize> {
    buffers: &'a VideoBuffers<N>,
}

impl<'a, const N: usize> FrameConsumer<'a, N> {
    /// Get the buffer to show for the next frame.
    ///
    /// Returns the current buffer again if the producer hasn't committed
    /// anything new.
    #[doc(alias = "get_v_buf_out")]
    #[inline(always)]
    pub fn acquire_for_display(&mut self) -> &'a FrameBuffer {
        let index = self.buffers.acquire_out();
        &self.buffers.slots[index]
    }
}

/// The cursors and flags for three rotating slots.
struct Rotation {
    /// Set by the display side when it leaves a slot, cleared by the write
    /// side when it commits one
    ready: [AtomicBool; 3],
    /// Only written by the write side
    in_index: AtomicU8,
    /// Only written by the display side
    out_index: AtomicU8,
    /// Set until the producer's first acquire
    first_frame: AtomicBool,
    buffering: AtomicBool,
}

impl Rotation {
    const fn new() -> Rotation {
        Rotation {
            ready: [const { AtomicBool::new(false) }; 3],
            in_index: AtomicU8::new(0),
            out_index: AtomicU8::new(0),
            first_frame: AtomicBool::new(true),
            buffering: AtomicBool::new(false),
        }
    }

    fn reset(&self) {
        self.in_index.store(0, Ordering::Relaxed);
        self.out_index.store(0, Ordering::Relaxed);
        for flag in self.ready.iter() {
            flag.store(false, Ordering::Relaxed);
        }
        self.first_frame.store(true, Ordering::Release);
    }

    fn acquire_in(&self) -> Option<usize> {
        self.first_frame.store(false, Ordering::Release);
        let current = usize::from(self.in_index.load(Ordering::Relaxed));
        self.ready[current].store(false, Ordering::Release);
        for step in 1..3 {
            let next = (current + step) % 3;
            if self.ready[next].load(Ordering::Acquire) {
                self.in_index.store(next as u8, Ordering::Relaxed);
                return Some(next);
            }
        }
        None
    }

    #[inline(always)]
    fn acquire_out(&self) -> usize {
        if self.first_frame.load(Ordering::Acquire) {
            return 0;
        }
        let current = usize::from(self.out_index.load(Ordering::Relaxed));
        for step in 1..3 {
            let next = (current + step) % 3;
            if !self.ready[next].load(Ordering::Acquire) {
                self.ready[current].store(true, Ordering::Release);
                self.out_index.store(next as u8, Ordering::Relaxed);
                return next;
            }
        }
        current
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgbi;

    #[derive(Debug, Copy, Clone)]
    enum Step {
        Write,
        Display,
    }

    /// Run one interleaving, checking the two sides never share a slot.
    fn run(steps: &[Step]) {
        let rotation = Rotation::new();
        let mut held: Option<usize> = None;
        let mut shown = 0;
        for (idx, step) in steps.iter().enumerate() {
            match step {
                Step::Write => held = rotation.acquire_in(),
                Step::Display => shown = rotation.acquire_out(),
            }
            if let Some(slot) = held {
                assert_ne!(slot, shown, "shared slot after {:?}", &steps[..=idx]);
            }
        }
    }

    #[test]
    fn never_display_the_slot_being_written() {
        const DEPTH: u32 = 14;
        for pattern in 0..(1u32 << DEPTH) {
            let steps: Vec<Step> = (0..DEPTH)
                .map(|bit| {
                    if (pattern >> bit) & 1 == 0 {
                        Step::Write
                    } else {
                        Step::Display
                    }
                })
                .collect();
            run(&steps);
        }
    }

    #[test]
    fn steady_state_shows_every_committed_frame() {
        let rotation = Rotation::new();
        // Nothing is free until the scan-out has moved on twice
        assert_eq!(rotation.acquire_in(), None);
        assert_eq!(rotation.acquire_out(), 1);
        assert_eq!(rotation.acquire_out(), 2);
        let mut drawing = rotation.acquire_in().unwrap();
        assert_eq!(drawing, 1);
        // One display then one commit per frame
        let mut committed = None;
        for _ in 0..10 {
            let shown = rotation.acquire_out();
            if let Some(previous) = committed {
                assert_eq!(shown, previous);
            }
            committed = Some(drawing);
            drawing = rotation.acquire_in().unwrap();
            assert_ne!(drawing, shown);
        }
    }

    #[test]
    fn slow_producer_repeats_frames() {
        let rotation = Rotation::new();
        assert_eq!(rotation.acquire_in(), None);
        rotation.acquire_out();
        rotation.acquire_out();
        let drawing = rotation.acquire_in().unwrap();
        let shown = rotation.acquire_out();
        // Nothing new has been committed, so the same frame comes back
        assert_eq!(rotation.acquire_out(), shown);
        assert_eq!(rotation.acquire_out(), shown);
        assert_ne!(shown, drawing);
    }

    fn pool() -> Box<TripleBuffers> {
        Box::new(TripleBuffers::new())
    }

    #[test]
    fn split_only_once() {
        let buffers = pool();
        assert!(buffers.split().is_some());
        assert!(buffers.split().is_none());
    }

    #[test]
    fn unbuffered_always_slot_zero() {
        let buffers = pool();
        let (mut producer, mut consumer) = buffers.split().unwrap();
        for _ in 0..5 {
            let fb = producer.acquire_for_write().unwrap();
            assert_eq!(buffers.index_of(fb), Some(0));
            assert_eq!(buffers.index_of(consumer.acquire_for_display()), Some(0));
        }
    }

    #[test]
    fn single_slot_ignores_buffering_mode() {
        let buffers = Box::new(SingleBuffer::new());
        buffers.set_buffering_mode(true);
        assert!(!buffers.buffering_mode());
        let (mut producer, mut consumer) = buffers.split().unwrap();
        for _ in 0..5 {
            let fb = producer.acquire_for_write().unwrap();
            assert!(core::ptr::eq(fb, consumer.acquire_for_display()));
        }
    }

    #[test]
    fn first_frame_gate_shows_slot_zero() {
        let buffers = pool();
        buffers.set_buffering_mode(true);
        // The producer has scribbled on slot 1 without ever acquiring it
        buffers.slot(1).unwrap().fill(Rgbi::WHITE);
        let (_producer, mut consumer) = buffers.split().unwrap();
        for _ in 0..3 {
            assert_eq!(buffers.index_of(consumer.acquire_for_display()), Some(0));
        }
    }

    #[test]
    fn clear_is_idempotent() {
        let buffers = pool();
        buffers.set_buffering_mode(true);
        let (mut producer, mut consumer) = buffers.split().unwrap();
        producer.acquire_for_write();
        consumer.acquire_for_display();
        consumer.acquire_for_display();
        producer.acquire_for_write().unwrap().fill(Rgbi::RED);

        buffers.clear_video_buffers();
        buffers.clear_video_buffers();

        for index in 0..3 {
            let slot = buffers.slot(index).unwrap();
            assert!((0..256).all(|y| slot.row(y).all(|b| b == 0)));
        }
        // Back to the start: gated on slot 0, and nothing free to draw in
        assert_eq!(buffers.index_of(consumer.acquire_for_display()), Some(0));
        assert!(producer.acquire_for_write().is_none());
        assert_eq!(buffers.index_of(consumer.acquire_for_display()), Some(1));
    }
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
