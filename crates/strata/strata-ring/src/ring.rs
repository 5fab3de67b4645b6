//! Ring geometry: capacity rounding and index arithmetic.
//!
//! Every ring has a power-of-two capacity, so index wrapping reduces to a
//! bitmask and the buffer splits into two equal halves whose membership is a
//! single bit of any index. That bit drives the writer/reader handshake in
//! [`crate::RingBuffer`].

/// Geometry of a ring: capacity, mask, and half size.
///
/// The capacity is fixed at construction and is always a power of two, never
/// below 2 (a one-slot ring has no halves and could never accept a write).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingConfig {
    capacity: usize,
}

impl RingConfig {
    /// Smallest valid capacity that can hold `requested` elements.
    ///
    /// # Arguments
    /// - `requested`: the element count the caller needs room for.
    ///
    /// # Returns
    /// A configuration whose capacity is the smallest power of two at or
    /// above `requested`, never below 2.
    ///
    /// # Example
    /// ```
    /// use strata_ring::RingConfig;
    /// assert_eq!(RingConfig::for_request(5).capacity(), 8);
    /// assert_eq!(RingConfig::for_request(8).capacity(), 8);
    /// ```
    pub fn for_request(requested: usize) -> Self {
        Self {
            capacity: requested.next_power_of_two().max(2),
        }
    }

    /// Number of slots in the ring.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bitmask for index wrapping: `idx & mask()` equals `idx % capacity()`.
    ///
    /// # Example
    /// ```
    /// use strata_ring::RingConfig;
    /// assert_eq!(RingConfig::for_request(8).mask(), 7); // 0b111
    /// ```
    #[inline(always)]
    pub fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Half the capacity. Doubles as the single bit that tells the two
    /// halves of the buffer apart.
    #[inline(always)]
    pub fn half(&self) -> usize {
        self.capacity >> 1
    }
}

/// Detects a half-boundary transition between two indices.
///
/// A wrapping transition from the upper half back to index 0 flips the bit
/// just like the transition across `half`, so one test covers both boundary
/// events.
///
/// # Arguments
/// - `a`: index before the move
/// - `b`: index after the move, already wrapped
/// - `half`: the ring's half size, doubling as a bitmask
///
/// # Returns
/// `true` when `a` and `b` fall in different halves of the ring.
#[inline(always)]
pub(crate) fn crosses_half(a: usize, b: usize, half: usize) -> bool {
    (a ^ b) & half != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_up_to_power_of_two() {
        assert_eq!(RingConfig::for_request(0).capacity(), 2);
        assert_eq!(RingConfig::for_request(1).capacity(), 2);
        assert_eq!(RingConfig::for_request(2).capacity(), 2);
        assert_eq!(RingConfig::for_request(3).capacity(), 4);
        assert_eq!(RingConfig::for_request(4).capacity(), 4);
        assert_eq!(RingConfig::for_request(1000).capacity(), 1024);
        assert_eq!(RingConfig::for_request(1 << 20).capacity(), 1 << 20);
    }

    #[test]
    fn mask_and_half_derive_from_capacity() {
        let cfg = RingConfig::for_request(64);
        assert_eq!(cfg.mask(), 63);
        assert_eq!(cfg.half(), 32);
    }

    #[test]
    fn half_crossing_detects_both_boundaries() {
        let half = 2; // capacity 4
        assert!(crosses_half(1, 2, half)); // lower -> upper
        assert!(crosses_half(3, 0, half)); // upper wraps -> lower
        assert!(!crosses_half(0, 1, half));
        assert!(!crosses_half(2, 3, half));
        assert!(!crosses_half(3, 3, half));
    }
}
