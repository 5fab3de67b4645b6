//! Buffer core and the single writer endpoint.
//!
//! One contiguous array of `T`, one writer, N registered readers. The whole
//! handshake runs on two atomic words:
//!
//! - `w_ptr`: the writer's next-write index. Published with release so a
//!   reader that acquire-loads it also sees every element stored before it.
//! - `readers_left`: how many readers have not yet followed the writer
//!   across the current half boundary. The writer arms it to the reader
//!   count on each of its own crossings; every reader decrements it once on
//!   its own crossing. While it is nonzero, [`RingBuffer::write_space`]
//!   stops short of the boundary, so the writer can never lap a reader.
//!
//! The buffer therefore behaves as two alternating generations:
//!
//! ```text
//!           half boundary
//!                 |
//!   +-------------------------+
//!   |  lower half | upper half|      writer fills one half while readers
//!   +-------------------------+      drain the other; the boundary only
//!        ^                ^          moves once readers_left == 0
//!     readers          writer
//! ```
//!
//! Readers that have caught up cost the writer nothing; only a reader still
//! in the previous half throttles it, and by at most half the capacity.

use crate::reader::Reader;
use crate::ring::{RingConfig, crosses_half};
use crate::RingError;
use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata_mem::AnonRegion;

/// State shared between the writer endpoint and every reader.
pub(crate) struct RingShared<T: Copy> {
    /// Owns the mapping lifetime; all access after init goes through `buf`.
    mem: AnonRegion,
    /// Element array inside `mem`.
    pub(crate) buf: *mut T,
    pub(crate) cfg: RingConfig,
    /// Next-write index, in `[0, capacity)`. Written only by the writer.
    pub(crate) w_ptr: AtomicUsize,
    /// Readers that have not yet crossed into the half the writer last
    /// entered. In `[0, num_readers]`.
    pub(crate) readers_left: AtomicUsize,
    /// Fixed once concurrent operation starts.
    pub(crate) num_readers: AtomicUsize,
}

// SAFETY: the half-generation protocol partitions the storage in time. The
// writer only stores into slots readers are barred from (beyond `w_ptr`, on
// the writer's side of an armed boundary), and readers only load slots the
// writer has published. `T: Copy` rules out drop-glue races.
unsafe impl<T: Copy + Send> Send for RingShared<T> {}
unsafe impl<T: Copy + Send> Sync for RingShared<T> {}

impl<T: Copy> RingShared<T> {
    /// Free space derived from preloaded atomics.
    ///
    /// # Arguments
    /// - `w`: the write index as last loaded
    /// - `readers_left`: the lag count as last loaded
    ///
    /// # Returns
    /// The run up to the next half boundary, plus the entire other half
    /// once no reader lags. The first term is at most `half - 1` (it is 0
    /// when `w` sits exactly on a boundary), so the result never reaches
    /// capacity and a single write can cross at most one boundary.
    #[inline]
    pub(crate) fn write_space_preloaded(&self, w: usize, readers_left: usize) -> usize {
        let mask = self.cfg.mask();
        let to_boundary = (mask - w) & (mask >> 1);
        if readers_left == 0 {
            to_boundary + self.cfg.half()
        } else {
            to_boundary
        }
    }
}

/// Bounded single-producer / multi-consumer broadcast ring.
///
/// This handle is the unique producer. Readers are registered through
/// [`RingBuffer::attach_reader`] (or [`crate::DetachedReader::connect`])
/// before the writer starts; each then observes the full element stream
/// independently, with no drops and no interference between readers.
///
/// All operations are wait-free: they make progress or return `0`/empty.
/// Callers that want to block poll [`RingBuffer::write_space`] /
/// [`Reader::read_space`] with a back-off of their choosing.
pub struct RingBuffer<T: Copy> {
    pub(crate) shared: Arc<RingShared<T>>,
}

impl<T: Copy> RingBuffer<T> {
    /// Allocate a ring with the smallest power-of-two capacity holding
    /// `requested` elements.
    ///
    /// # Errors
    /// [`RingError::Alloc`] when the backing region cannot be mapped, or
    /// when its byte size would overflow `usize`.
    pub fn new(requested: usize) -> Result<Self, RingError> {
        let cfg = RingConfig::for_request(requested);
        let bytes = cfg
            .capacity()
            .checked_mul(size_of::<T>())
            .ok_or_else(|| RingError::Alloc {
                bytes: usize::MAX,
                source: io::Error::from(io::ErrorKind::OutOfMemory),
            })?;
        // map_anon rejects len 0, and a zero-sized T still needs a mapping
        // to hang the pointer off.
        let mut mem = AnonRegion::alloc(bytes.max(1))
            .map_err(|source| RingError::Alloc { bytes, source })?;
        let buf = mem.as_mut_ptr() as *mut T;

        Ok(Self {
            shared: Arc::new(RingShared {
                mem,
                buf,
                cfg,
                w_ptr: AtomicUsize::new(0),
                readers_left: AtomicUsize::new(0),
                num_readers: AtomicUsize::new(0),
            }),
        })
    }

    /// Number of slots in the ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.cfg.capacity()
    }

    /// Register a new reader starting at the head of the stream.
    ///
    /// Not thread-safe: all readers must be attached before the writer's
    /// first [`RingBuffer::write`] and before any endpoint is handed to
    /// another thread.
    ///
    /// # Panics
    /// Panics once the writer has started (the write index has moved or a
    /// boundary is armed): a reader attached mid-stream could never be
    /// folded into the boundary accounting.
    pub fn attach_reader(&mut self) -> Reader<T> {
        assert!(
            self.shared.w_ptr.load(Ordering::Relaxed) == 0
                && self.shared.readers_left.load(Ordering::Relaxed) == 0,
            "readers must be attached before the writer starts"
        );
        self.shared.num_readers.fetch_add(1, Ordering::Relaxed);
        Reader::attached(Arc::clone(&self.shared))
    }

    /// Readers registered on this ring.
    pub fn reader_count(&self) -> usize {
        self.shared.num_readers.load(Ordering::Relaxed)
    }

    /// Readers that have not yet crossed the current half boundary. Nonzero
    /// means the writer is throttled at that boundary. Diagnostic only; the
    /// value may be stale by the time it is returned.
    pub fn lagging_readers(&self) -> usize {
        self.shared.readers_left.load(Ordering::Relaxed)
    }

    /// Lower bound on how many elements [`RingBuffer::write`] would accept
    /// right now.
    ///
    /// # Returns
    /// A value in `[0, capacity - 1]`. A reader catching up concurrently
    /// can only increase the real figure, so the returned value is always
    /// safe to consume.
    pub fn write_space(&self) -> usize {
        let w = self.shared.w_ptr.load(Ordering::Relaxed);
        let rl = self.shared.readers_left.load(Ordering::Acquire);
        self.shared.write_space_preloaded(w, rl)
    }

    /// Space guaranteed to become writable once every reader has consumed
    /// everything. Size messages against this, not against `capacity`.
    ///
    /// # Returns
    /// Half the capacity, constant for the life of the ring.
    pub fn maximum_eventual_write_space(&self) -> usize {
        self.shared.cfg.half()
    }

    /// Append elements from `src` to the stream.
    ///
    /// The copy runs in up to two segments (tail of the array, then the
    /// wrapped head), and `w_ptr` is published after each one, so readers
    /// can start draining the first segment while the second is still being
    /// copied.
    ///
    /// # Arguments
    /// - `src`: the elements to append; only a prefix is taken when the
    ///   ring lacks room for all of them.
    ///
    /// # Returns
    /// How many elements were accepted, `0` when the ring is full against
    /// the slowest reader.
    ///
    /// # Panics
    /// Panics if the write would cross a half boundary while `readers_left`
    /// is nonzero. `write_space` never hands out such a span, so this fires
    /// only when the protocol has already been broken (e.g. a reader
    /// registered mid-stream); the ring is undefined afterwards.
    pub fn write(&mut self, src: &[T]) -> usize {
        let shared = &*self.shared;
        let mask = shared.cfg.mask();
        let half = shared.cfg.half();

        let w = shared.w_ptr.load(Ordering::Relaxed);
        let rl = shared.readers_left.load(Ordering::Acquire);

        let to_write = src.len().min(shared.write_space_preloaded(w, rl));
        if to_write == 0 {
            return 0;
        }

        let n1 = to_write.min(shared.cfg.capacity() - w);
        let n2 = to_write - n1;

        let end = (w + to_write) & mask;
        if crosses_half(w, end, half) {
            assert!(
                rl == 0,
                "writer crossed the half boundary with {rl} reader(s) still in it"
            );
            // Re-arm before publishing anything from the new generation, so
            // no reader can race past the boundary ahead of the count.
            shared
                .readers_left
                .store(shared.num_readers.load(Ordering::Relaxed), Ordering::Release);
        }

        // SAFETY: `w + n1 <= capacity`, and no reader loads `[w, w + n1)`
        // until the release store below publishes it.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), shared.buf.add(w), n1);
        }
        shared.w_ptr.store((w + n1) & mask, Ordering::Release);

        if n2 > 0 {
            // SAFETY: `n2 < half`, and `[0, n2)` is on the writer's side of
            // the boundary that was just re-armed.
            unsafe {
                ptr::copy_nonoverlapping(src.as_ptr().add(n1), shared.buf, n2);
            }
            shared.w_ptr.store(n2, Ordering::Release);
        }

        to_write
    }

    /// Pin the backing pages in physical memory. Pages are unpinned when
    /// the ring is dropped.
    ///
    /// # Returns
    /// `true` iff the pages are now resident. Best-effort: `false` means
    /// the pages stay swappable, not that the ring is unusable.
    pub fn lock_pages(&mut self) -> bool {
        self.shared.mem.lock()
    }

    /// Zero the whole array to pre-fault its pages.
    ///
    /// The zeroed bytes are never observed because readers only load
    /// published slots.
    ///
    /// # Panics
    /// Panics once the writer has started; pre-faulting is a setup-time
    /// operation only.
    pub fn touch(&mut self) {
        assert!(
            self.shared.w_ptr.load(Ordering::Relaxed) == 0
                && self.shared.readers_left.load(Ordering::Relaxed) == 0,
            "touch is only allowed before the writer starts"
        );
        let bytes = self.shared.cfg.capacity() * size_of::<T>();
        // SAFETY: the region spans `bytes` and nothing reads it concurrently
        // (asserted above, and registration is sequenced before use).
        unsafe {
            ptr::write_bytes(self.shared.buf as *mut u8, 0, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn capacity_is_rounded_up() {
        let rb = RingBuffer::<u8>::new(5).unwrap();
        assert_eq!(rb.capacity(), 8);
        assert_eq!(rb.maximum_eventual_write_space(), 4);
    }

    #[test]
    fn exact_fill_then_drain() {
        let mut rb = RingBuffer::<u8>::new(4).unwrap();
        let mut rd = rb.attach_reader();

        // One slot stays reserved between writer and readers.
        assert_eq!(rb.write(b"abcde"), 3);
        assert_eq!(rb.write_space(), 0);
        assert_eq!(rb.write(b"xyz!"), 0);

        {
            let seq = rd.read(3);
            assert_eq!(seq.len(), 3);
            assert_eq!((seq[0], seq[1], seq[2]), (b'a', b'b', b'c'));
        }
        assert_eq!(rd.read_space(), 0);
    }

    #[test]
    fn write_space_throttles_until_every_reader_crosses() {
        let mut rb = RingBuffer::<u8>::new(4).unwrap();
        let mut r1 = rb.attach_reader();
        let mut r2 = rb.attach_reader();
        assert_eq!(rb.reader_count(), 2);

        assert_eq!(rb.write(b"abc"), 3);
        assert_eq!(rb.lagging_readers(), 2);

        assert_eq!(r1.read_max(3).len(), 3);
        // r2 still sits in the old generation, so the other half stays shut.
        assert_eq!(rb.lagging_readers(), 1);
        assert_eq!(rb.write_space(), 0);

        assert_eq!(r2.read_max(3).len(), 3);
        assert_eq!(rb.lagging_readers(), 0);
        assert_eq!(rb.write_space(), 2);
    }

    #[test]
    fn sequential_wrap_matches_hand_computed_spaces() {
        // Walks a 4-slot ring through two full laps, checking the free
        // space the formula yields at every stop.
        let mut rb = RingBuffer::<u8>::new(4).unwrap();
        let mut rd = rb.attach_reader();

        assert_eq!(rb.write(b"abcde"), 3);
        assert_eq!(rd.read(3).len(), 3);

        assert_eq!(rb.write(b"ab"), 2); // wraps: slot 3, then slot 0
        assert_eq!(rb.write_space(), 0);
        assert_eq!(rd.read_max(1)[0], b'a');
        assert_eq!(rd.read_max(1)[0], b'b');
        assert_eq!(rb.write_space(), 2);

        assert_eq!(rb.write(b"x"), 1);
        assert_eq!(rb.write_space(), 1);
        assert_eq!(rd.read_max(1)[0], b'x');
        assert_eq!(rb.write_space(), 3);
    }

    #[test]
    fn crossing_arms_readers_left_and_draining_clears_it() {
        let mut rb = RingBuffer::<u8>::new(64).unwrap();
        let mut rd = rb.attach_reader();
        assert_eq!(rb.shared.readers_left.load(Ordering::Relaxed), 0);

        // Filling the lower half lands exactly on the boundary, which is
        // itself a crossing into the upper generation.
        let first = vec![1u8; 32];
        assert_eq!(rb.write(&first), 32);
        assert_eq!(rb.shared.readers_left.load(Ordering::Relaxed), 1);

        assert_eq!(rb.write(&[2u8]), 1);
        assert_eq!(rb.shared.readers_left.load(Ordering::Relaxed), 1);

        // The reader crossing the same boundary releases the writer.
        assert_eq!(rd.read_max(33).len(), 33);
        assert_eq!(rb.shared.readers_left.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn touch_and_lock_pages_leave_the_ring_usable() {
        let mut rb = RingBuffer::<u64>::new(1024).unwrap();
        rb.touch();
        let _ = rb.lock_pages(); // may be refused by RLIMIT_MEMLOCK
        let mut rd = rb.attach_reader();

        assert_eq!(rb.write(&[7, 8, 9]), 3);
        let seq = rd.read(3);
        assert_eq!((seq[0], seq[1], seq[2]), (7, 8, 9));
    }

    #[test]
    #[should_panic(expected = "before the writer starts")]
    fn attaching_after_the_first_write_is_refused() {
        let mut rb = RingBuffer::<u8>::new(8).unwrap();
        let _early = rb.attach_reader();
        rb.write(b"a");
        let _late = rb.attach_reader();
    }

    #[test]
    fn writer_without_readers_is_never_throttled_below_half() {
        let mut rb = RingBuffer::<u8>::new(8).unwrap();
        let chunk = [0u8; 3];
        for _ in 0..100 {
            // With nobody registered every crossing arms the count to 0, so
            // at least the far half is always writable and any message sized
            // against maximum_eventual_write_space is accepted whole.
            assert!(rb.write_space() >= rb.maximum_eventual_write_space());
            assert_eq!(rb.write(&chunk), 3);
        }
    }
}
