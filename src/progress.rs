//! advisory progress and resource reporting
//!
//! Status lines go through `tracing`; dropping the monitor entirely changes
//! nothing about the clip result.

use std::time::{Duration, Instant};

/// tracks blocks completed against wall time and emits one status line per
/// block
pub struct ProgressMonitor {
    /// total block count, when the caller knows it up front. Streaming runs
    /// discover the count at the end and get no ETA
    total_blocks: Option<usize>,
    completed: usize,
    started: Instant,
}

impl ProgressMonitor {
    pub fn new(total_blocks: Option<usize>) -> Self {
        ProgressMonitor {
            total_blocks,
            completed: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// remaining time extrapolated linearly from blocks completed so far
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total_blocks?;
        if self.completed == 0 || total <= self.completed {
            return None;
        }

        let per_block = self.elapsed().as_secs_f64() / self.completed as f64;
        let remaining = (total - self.completed) as f64 * per_block;
        Some(Duration::from_secs_f64(remaining))
    }

    /// record one finished block and emit a status line
    pub fn block_completed(&mut self, block_id: usize) {
        self.completed += 1;

        let elapsed = self.elapsed().as_secs_f64();
        let eta = self
            .eta()
            .map(|eta| format!("{:.0}s", eta.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());
        let memory = resident_memory_kib()
            .map(|kib| format!("{} MiB", kib / 1024))
            .unwrap_or_else(|| "-".to_string());

        match self.total_blocks {
            Some(total) => tracing::info!(
                "part {block_id}: {}/{total} done | {elapsed:.1}s | ETA {eta} | {memory}",
                self.completed,
            ),
            None => tracing::info!(
                "part {block_id}: {} done | {elapsed:.1}s | {memory}",
                self.completed,
            ),
        }
    }

    pub fn finish(self) {
        tracing::info!(
            "{} parts in {:.1}s",
            self.completed,
            self.elapsed().as_secs_f64()
        );
    }
}

/// resident set size of this process in KiB, where the kernel exposes it
pub fn resident_memory_kib() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;

    // page size is overwhelmingly 4 KiB on the machines this runs on; statm
    // reports pages, not bytes
    Some(resident_pages * 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_extrapolates_linearly() {
        let mut monitor = ProgressMonitor::new(Some(4));
        assert!(monitor.eta().is_none());

        monitor.block_completed(1);
        monitor.block_completed(2);

        // half done: the remaining estimate is close to the elapsed time
        let eta = monitor.eta().unwrap();
        let elapsed = monitor.elapsed();
        assert!((eta.as_secs_f64() - elapsed.as_secs_f64()).abs() <= elapsed.as_secs_f64());
    }

    #[test]
    fn unknown_totals_have_no_eta() {
        let mut monitor = ProgressMonitor::new(None);
        monitor.block_completed(1);
        assert!(monitor.eta().is_none());
    }
}
