//! Run diagnostics (C11): lightweight atomic counters, snapshotted and
//! logged as a single summary event rather than scattered through the run,
//! using structured `tracing` fields instead of ad hoc verbosity-gated
//! prints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::info;

/// Wall-clock elapsed-time reporting for one phase of a run (collection or
/// correction). Wraps a plain [`Instant`]; callers log the elapsed duration
/// as a `tracing` field rather than a bespoke `fprintf` at phase end.
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch { start: Instant::now() }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Counters updated from worker threads during collection and correction.
/// All fields use relaxed ordering: these are summary statistics, not
/// synchronization points.
#[derive(Default)]
pub struct Diagnostics {
    kmers_collected: AtomicU64,
    reads_corrected: AtomicU64,
    bases_emitted: AtomicU64,
}

impl Diagnostics {
    pub fn record_collection(&self, n_cells: u64) {
        self.kmers_collected.fetch_add(n_cells, Ordering::Relaxed);
    }

    pub fn record_read(&self, n_bases: usize) {
        self.reads_corrected.fetch_add(1, Ordering::Relaxed);
        self.bases_emitted.fetch_add(n_bases as u64, Ordering::Relaxed);
    }

    /// Emit one `tracing::info!` event summarizing the run so far. Intended
    /// to be called once, after collection or after a batch completes.
    pub fn log_summary(&self) {
        info!(
            kmers_collected = self.kmers_collected.load(Ordering::Relaxed),
            reads_corrected = self.reads_corrected.load(Ordering::Relaxed),
            bases_emitted = self.bases_emitted.load(Ordering::Relaxed),
            "run summary"
        );
    }
}
