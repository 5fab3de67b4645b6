use thiserror::Error;

/// Construction-time failures.
///
/// Runtime contract violations (a writer crossing a half boundary while
/// readers still occupy it) are not values of this type: they indicate the
/// handshake itself is broken, leave the ring undefined, and surface as a
/// panic from [`crate::RingBuffer::write`].
#[derive(Debug, Error)]
pub enum RingError {
    /// The backing region could not be mapped.
    #[error("failed to map {bytes} bytes of ring storage")]
    Alloc {
        bytes: usize,
        #[source]
        source: std::io::Error,
    },

    /// A reader and the ring it tried to connect to disagree about capacity.
    #[error("reader expects capacity {expected}, ring was built with {actual}")]
    CapacityMismatch { expected: usize, actual: usize },
}
