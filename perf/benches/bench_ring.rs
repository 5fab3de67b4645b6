use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use strata_perf::run_message;
use strata_ring::RingBuffer;

fn bench_roundtrip(c: &mut Criterion) {
    let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
    let mut rd = ring.attach_reader();

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("write_read_roundtrip", |b| {
        b.iter(|| {
            ring.write(black_box(&[42u64]));
            black_box(rd.read_max(1).len());
        });
    });

    group.finish();
}

fn bench_read_empty(c: &mut Criterion) {
    let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
    let mut rd = ring.attach_reader();

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_max (empty)", |b| {
        b.iter(|| black_box(rd.read_max(1).len()));
    });

    group.finish();
}

fn bench_spaces(c: &mut Criterion) {
    let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
    let rd = ring.attach_reader();

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("write_space", |b| {
        b.iter(|| black_box(ring.write_space()));
    });
    group.bench_function("read_space", |b| {
        b.iter(|| black_box(rd.read_space()));
    });

    group.finish();
}

fn bench_message_copy(c: &mut Criterion) {
    let mut ring = RingBuffer::<u8>::new(65536).expect("failed to allocate ring");
    let mut rd = ring.attach_reader();
    let msg = run_message(31);
    let mut out = vec![0u8; msg.len()];

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Bytes(msg.len() as u64));

    group.bench_function("32B message write+copy_to", |b| {
        b.iter(|| {
            ring.write(black_box(&msg));
            let seq = rd.read_max(msg.len());
            black_box(seq.copy_to(&mut out));
        });
    });

    group.finish();
}

fn bench_fanout(c: &mut Criterion) {
    let mut ring = RingBuffer::<u64>::new(65536).expect("failed to allocate ring");
    let mut r1 = ring.attach_reader();
    let mut r2 = ring.attach_reader();

    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    group.bench_function("write_read_roundtrip (2 readers)", |b| {
        b.iter(|| {
            ring.write(black_box(&[42u64]));
            black_box(r1.read_max(1).len());
            black_box(r2.read_max(1).len());
        });
    });

    group.finish();
}

fn bench_throughput_capacities(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_capacity");
    group.throughput(Throughput::Elements(1));

    for &cap in &[1024usize, 4096, 16384, 65536] {
        let mut ring = RingBuffer::<u64>::new(cap).expect("failed to allocate ring");
        let mut rd = ring.attach_reader();

        group.bench_function(format!("roundtrip_cap_{cap}"), |b| {
            b.iter(|| {
                ring.write(black_box(&[42u64]));
                black_box(rd.read_max(1).len());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_roundtrip,
    bench_read_empty,
    bench_spaces,
    bench_message_copy,
    bench_fanout,
    bench_throughput_capacities,
);
criterion_main!(benches);
