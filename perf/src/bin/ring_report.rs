//! Percentile report over the ring hot paths, single-threaded.
//!
//! Criterion (`benches/bench_ring.rs`) owns the rigorous comparisons; this
//! binary is the quick p99 sanity check plus a resource snapshot.

use std::hint::black_box;
use strata_perf::{
    capture_rusage, print_result_row, print_table_header, run_message, section_header,
    time_windows,
};
use strata_ring::RingBuffer;

const WINDOWS: usize = 2_000;
const WINDOW: usize = 256;

fn main() {
    section_header("strata-ring hot paths (ns/op, single thread)");
    print_table_header();

    {
        let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
        let mut rd = ring.attach_reader();
        let r = time_windows("roundtrip 1x u64 (1 reader)", WINDOWS, WINDOW, || {
            ring.write(black_box(&[42u64]));
            black_box(rd.read_max(1).len());
        });
        print_result_row(&r);
    }

    {
        let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
        let mut r1 = ring.attach_reader();
        let mut r2 = ring.attach_reader();
        let r = time_windows("roundtrip 1x u64 (2 readers)", WINDOWS, WINDOW, || {
            ring.write(black_box(&[42u64]));
            black_box(r1.read_max(1).len());
            black_box(r2.read_max(1).len());
        });
        print_result_row(&r);
    }

    {
        let mut ring = RingBuffer::<u8>::new(65536).expect("failed to allocate ring");
        let mut rd = ring.attach_reader();
        let msg = run_message(31);
        let mut out = vec![0u8; msg.len()];
        let r = time_windows("32B message write+copy_to", WINDOWS, WINDOW, || {
            ring.write(black_box(&msg));
            let seq = rd.read_max(msg.len());
            black_box(seq.copy_to(&mut out));
        });
        print_result_row(&r);
    }

    {
        let ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
        let r = time_windows("write_space", WINDOWS, WINDOW, || {
            black_box(ring.write_space());
        });
        print_result_row(&r);
    }

    {
        let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
        let rd = ring.attach_reader();
        let r = time_windows("read_space", WINDOWS, WINDOW, || {
            black_box(rd.read_space());
        });
        print_result_row(&r);
    }

    let usage = capture_rusage();
    section_header("resource usage");
    println!("  max rss:            {} bytes", usage.max_rss_bytes);
    println!("  minor faults:       {}", usage.minor_faults);
    println!("  major faults:       {}", usage.major_faults);
    println!("  ctx switches (vol): {}", usage.vol_ctx_switches);
    println!("  ctx switches (inv): {}", usage.invol_ctx_switches);
}
