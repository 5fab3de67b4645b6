use std::time::Instant;

// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

impl Stats {
    /// Nearest-rank percentile summary. Consumes and sorts the samples.
    ///
    /// # Panics
    /// Panics on an empty sample set.
    pub fn from_samples(mut samples: Vec<u64>) -> Self {
        assert!(!samples.is_empty(), "no samples to summarise");
        samples.sort_unstable();

        let count = samples.len();
        // rank = ceil(count * pct), pct given in tenths of a percent so
        // p99.9 stays in integer arithmetic
        let at = |tenths: usize| samples[(count * tenths).div_ceil(1000).max(1) - 1];

        Self {
            min: samples[0],
            max: samples[count - 1],
            mean: samples.iter().sum::<u64>() as f64 / count as f64,
            p50: at(500),
            p90: at(900),
            p99: at(990),
            p999: at(999),
            count,
        }
    }
}

// ─── Measurement Harness ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

/// Run `f` in fixed windows of `window` calls, recording each window's mean
/// cost per call. Windowing keeps the clock reads off the hot path; the
/// first tenth of the windows is thrown away as warmup.
pub fn time_windows<F: FnMut()>(
    name: &str,
    windows: usize,
    window: usize,
    mut f: F,
) -> BenchResult {
    assert!(windows > 0 && window > 0, "empty measurement plan");

    let warmup = windows.div_ceil(10);
    let mut samples = Vec::with_capacity(windows);

    for round in 0..warmup + windows {
        let begin = Instant::now();
        for _ in 0..window {
            f();
        }
        let spent = begin.elapsed().as_nanos();
        if round >= warmup {
            samples.push((spent / window as u128).max(1) as u64);
        }
    }

    BenchResult {
        name: name.into(),
        unit: "ns/op".into(),
        stats: Stats::from_samples(samples),
    }
}

// ─── Resource Usage ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub max_rss_bytes: i64,
    pub minor_faults: i64,
    pub major_faults: i64,
    pub vol_ctx_switches: i64,
    pub invol_ctx_switches: i64,
}

pub fn capture_rusage() -> ResourceSnapshot {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    #[cfg(target_os = "linux")]
    let max_rss_bytes = usage.ru_maxrss * 1024;
    #[cfg(not(target_os = "linux"))]
    let max_rss_bytes = usage.ru_maxrss;
    ResourceSnapshot {
        max_rss_bytes,
        minor_faults: usage.ru_minflt,
        major_faults: usage.ru_majflt,
        vol_ctx_switches: usage.ru_nvcsw,
        invol_ctx_switches: usage.ru_nivcsw,
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

pub fn print_table_header() {
    println!(
        "  {:<36} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(96));
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<36} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name,
        r.stats.min,
        r.stats.p50,
        r.stats.p90,
        r.stats.p99,
        r.stats.p999,
        r.stats.max,
        r.unit,
    );
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(90));
    println!("  {title}");
    println!("{}\n", "─".repeat(90));
}

// ─── Workload Helpers ───────────────────────────────────────────────────────

/// A framed demo message: `r + 1` copies of the byte `r`.
pub fn run_message(r: u8) -> Vec<u8> {
    vec![r; r as usize + 1]
}
