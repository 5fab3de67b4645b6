//! Reader endpoints.
//!
//! Each reader owns a private cursor into the shared stream and hands out
//! scoped [`ReadSequence`] / [`PeekSequence`] windows over the published
//! span. Releasing a read sequence is the only point where a reader touches
//! shared state: the cursor advances, and if that advance crosses the half
//! boundary the reader checks itself off `readers_left`.

use crate::buffer::{RingBuffer, RingShared};
use crate::ring::{RingConfig, crosses_half};
use crate::sequence::{PeekSequence, ReadSequence};
use crate::RingError;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// A consumer endpoint over one ring.
///
/// Readers are independent: each observes the complete element stream in
/// order, at its own pace, without affecting what the others see. An
/// endpoint belongs to one thread at a time (`Send`, and the read methods
/// take `&mut self`); run one endpoint per consumer thread.
pub struct Reader<T: Copy> {
    shared: Arc<RingShared<T>>,
    /// Next-read index. Private to this endpoint.
    read_ptr: usize,
}

impl<T: Copy> Reader<T> {
    pub(crate) fn attached(shared: Arc<RingShared<T>>) -> Self {
        Self { shared, read_ptr: 0 }
    }

    /// Capacity of the ring this reader consumes from.
    pub fn capacity(&self) -> usize {
        self.shared.cfg.capacity()
    }

    /// Lower bound on the elements ready to read.
    ///
    /// # Returns
    /// How far the published stream runs past this reader's cursor. The
    /// writer may publish more concurrently, but never less: the acquire
    /// load of `w_ptr` guarantees every element inside the returned span is
    /// fully visible.
    pub fn read_space(&self) -> usize {
        let w = self.shared.w_ptr.load(Ordering::Acquire);
        (w + self.shared.cfg.capacity() - self.read_ptr) & self.shared.cfg.mask()
    }

    /// Request exactly `n` elements.
    ///
    /// # Arguments
    /// - `n`: the window length; nothing smaller is acceptable.
    ///
    /// # Returns
    /// A sequence of exactly `n` elements, or an empty one when fewer are
    /// available. Non-blocking either way; releasing the sequence consumes
    /// whatever it covered.
    pub fn read(&mut self, n: usize) -> ReadSequence<'_, T> {
        let len = self.exact_len(n);
        ReadSequence::new(self, len)
    }

    /// Request up to `n` elements. Pass `usize::MAX` to drain everything
    /// published so far.
    ///
    /// # Returns
    /// A sequence of `min(n, read_space())` elements.
    pub fn read_max(&mut self, n: usize) -> ReadSequence<'_, T> {
        let len = self.capped_len(n);
        ReadSequence::new(self, len)
    }

    /// Like [`Reader::read`], but releasing the sequence does not consume
    /// the elements; the next read or peek sees them again.
    ///
    /// # Returns
    /// A window of exactly `n` elements, or an empty one when fewer are
    /// available.
    pub fn peek(&self, n: usize) -> PeekSequence<'_, T> {
        PeekSequence::new(self, self.exact_len(n))
    }

    /// Like [`Reader::read_max`] without consuming on release.
    pub fn peek_max(&self, n: usize) -> PeekSequence<'_, T> {
        PeekSequence::new(self, self.capped_len(n))
    }

    fn exact_len(&self, n: usize) -> usize {
        if self.read_space() >= n { n } else { 0 }
    }

    fn capped_len(&self, n: usize) -> usize {
        self.read_space().min(n)
    }

    pub(crate) fn shared(&self) -> &RingShared<T> {
        &self.shared
    }

    pub(crate) fn read_ptr(&self) -> usize {
        self.read_ptr
    }

    /// Consume `len` elements on behalf of a released read sequence.
    ///
    /// Runs exactly once per sequence (its `Drop`). The acq-rel decrement
    /// orders every load this reader did in the old half before the
    /// writer's next stores into it.
    pub(crate) fn advance(&mut self, len: usize) {
        let old = self.read_ptr;
        self.read_ptr = (old + len) & self.shared.cfg.mask();
        if crosses_half(old, self.read_ptr, self.shared.cfg.half()) {
            self.shared.readers_left.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A reader declared before the ring it will consume from.
///
/// Carries only the expected geometry; [`DetachedReader::connect`] turns it
/// into a live [`Reader`] and fails if the ring was built with a different
/// capacity. Like [`RingBuffer::attach_reader`], connecting must happen
/// before the writer starts.
pub struct DetachedReader {
    cfg: RingConfig,
}

impl DetachedReader {
    /// Declare a reader for a ring of (rounded) `requested` capacity.
    ///
    /// # Arguments
    /// - `requested`: rounded up exactly the way [`RingBuffer::new`] rounds
    ///   its own request, so equal requests always connect.
    pub fn new(requested: usize) -> Self {
        Self {
            cfg: RingConfig::for_request(requested),
        }
    }

    /// The capacity this reader expects from the ring it connects to.
    pub fn capacity(&self) -> usize {
        self.cfg.capacity()
    }

    /// Register at `ring`, consuming the declaration.
    ///
    /// # Errors
    /// [`RingError::CapacityMismatch`] when the declared capacity disagrees
    /// with the ring's; the declaration is consumed either way and the ring
    /// is left unchanged.
    ///
    /// # Panics
    /// Panics once the writer has started, like
    /// [`RingBuffer::attach_reader`].
    pub fn connect<T: Copy>(self, ring: &mut RingBuffer<T>) -> Result<Reader<T>, RingError> {
        if self.cfg.capacity() != ring.capacity() {
            return Err(RingError::CapacityMismatch {
                expected: self.cfg.capacity(),
                actual: ring.capacity(),
            });
        }
        Ok(ring.attach_reader())
    }
}
