//! Broadcast demonstration: one writer streams length-tagged messages to N
//! reader threads over a single ring, everybody busy-waiting on the derived
//! spaces. Each reader verifies every payload byte, so a run that finishes
//! is a run where nobody dropped or tore a message.

mod config;

use config::FanoutConfig;
use std::thread;
use std::time::Instant;
use strata_ring::{Reader, RingBuffer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Deterministic message lengths so runs are comparable.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// Stream `count` messages, each `r + 1` copies of the byte `r`, then a
/// zero terminator. Returns the number of messages published.
fn produce(ring: &mut RingBuffer<u8>, count: usize) -> usize {
    let max_msg = ring.maximum_eventual_write_space();
    let mut rng = Lcg(42);
    let mut scratch = vec![0u8; max_msg];

    for _ in 0..count {
        let r = (rng.next() as usize % (max_msg - 1) + 1) as u8;
        while ring.write_space() <= r as usize {
            std::hint::spin_loop();
        }
        scratch[..r as usize + 1].fill(r);
        let written = ring.write(&scratch[..r as usize + 1]);
        debug_assert_eq!(written, r as usize + 1);
    }

    while ring.write_space() == 0 {
        std::hint::spin_loop();
    }
    ring.write(&[0]);
    count
}

/// Drain one endpoint until the terminator, verifying every byte. Returns
/// messages and payload bytes seen.
fn consume(mut rd: Reader<u8>) -> (usize, u64) {
    let mut messages = 0usize;
    let mut bytes = 0u64;
    loop {
        while rd.read_space() == 0 {
            std::hint::spin_loop();
        }
        let r = rd.read_max(1)[0];
        if r == 0 {
            return (messages, bytes);
        }

        while rd.read_space() < r as usize {
            std::hint::spin_loop();
        }
        let seq = rd.read_max(r as usize);
        assert_eq!(seq.len(), r as usize, "short read of a {r}-byte message");
        for i in 0..seq.len() {
            assert_eq!(seq[i], r, "corrupt byte {i} in a {r}-byte message");
        }
        messages += 1;
        bytes += r as u64 + 1;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => FanoutConfig::load(path)?,
        None => FanoutConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(?config, "fanout starting");

    let mut ring = RingBuffer::<u8>::new(config.capacity)?;
    if ring.maximum_eventual_write_space() < 2 {
        return Err("capacity too small: need at least 4 slots to frame a message".into());
    }
    if config.lock_pages && !ring.lock_pages() {
        warn!("could not pin ring pages; continuing unpinned");
    }
    ring.touch();

    let readers: Vec<_> = (0..config.readers).map(|_| ring.attach_reader()).collect();
    info!(
        capacity = ring.capacity(),
        readers = ring.reader_count(),
        "ring ready"
    );

    let started = Instant::now();

    let mut handles = Vec::new();
    for (i, rd) in readers.into_iter().enumerate() {
        handles.push(
            thread::Builder::new()
                .name(format!("fanout-reader-{i}"))
                .spawn(move || consume(rd))?,
        );
    }

    let count = config.messages;
    let writer = thread::Builder::new()
        .name("fanout-writer".into())
        .spawn(move || produce(&mut ring, count))?;

    let published = writer.join().expect("writer panicked");
    for handle in handles {
        let (messages, bytes) = handle.join().expect("reader panicked");
        assert_eq!(messages, published, "a reader missed messages");
        info!(messages, bytes, "reader drained the stream");
    }

    let elapsed = started.elapsed();
    info!(
        ?elapsed,
        msgs_per_sec = published as f64 / elapsed.as_secs_f64(),
        "fanout complete"
    );

    Ok(())
}
