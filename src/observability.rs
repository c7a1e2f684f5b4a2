use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Board-wide counters: data service traffic and move reconciliation
#[derive(Debug, Default)]
pub struct BoardMetrics {
    pub total_requests: AtomicU64,
    pub errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub moves_dispatched: AtomicU64,
    pub moves_queued: AtomicU64,
    pub moves_succeeded: AtomicU64,
    pub moves_failed: AtomicU64,
    pub moves_rejected: AtomicU64,
    pub refetches: AtomicU64,
    pub stale_refetches: AtomicU64,
}

impl BoardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_dispatched(&self) {
        self.moves_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_queued(&self) {
        self.moves_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_succeeded(&self) {
        self.moves_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_failed(&self) {
        self.moves_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_rejected(&self) {
        self.moves_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refetch(&self) {
        self.refetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_refetch(&self) {
        self.stale_refetches.fetch_add(1, Ordering::Relaxed);
        debug!("Discarded stale roster refetch");
    }

    pub fn get_stats(&self) -> BoardStats {
        BoardStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            moves_dispatched: self.moves_dispatched.load(Ordering::Relaxed),
            moves_queued: self.moves_queued.load(Ordering::Relaxed),
            moves_succeeded: self.moves_succeeded.load(Ordering::Relaxed),
            moves_failed: self.moves_failed.load(Ordering::Relaxed),
            moves_rejected: self.moves_rejected.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            stale_refetches: self.stale_refetches.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Board metrics: requests={}, errors={}, cache_hits={}, cache_misses={}, moves dispatched={} queued={} succeeded={} failed={} rejected={}, refetches={} (stale={})",
            stats.total_requests,
            stats.errors,
            stats.cache_hits,
            stats.cache_misses,
            stats.moves_dispatched,
            stats.moves_queued,
            stats.moves_succeeded,
            stats.moves_failed,
            stats.moves_rejected,
            stats.refetches,
            stats.stale_refetches
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardStats {
    pub total_requests: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub moves_dispatched: u64,
    pub moves_queued: u64,
    pub moves_succeeded: u64,
    pub moves_failed: u64,
    pub moves_rejected: u64,
    pub refetches: u64,
    pub stale_refetches: u64,
}

/// Global metrics instance
static BOARD_METRICS: std::sync::LazyLock<BoardMetrics> = std::sync::LazyLock::new(BoardMetrics::new);

pub fn board_metrics() -> &'static BoardMetrics {
    &BOARD_METRICS
}

/// Logs how long an operation took when dropped
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        debug!(
            operation = %self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "Operation completed"
        );
    }
}

#[macro_export]
macro_rules! time_operation {
    ($operation:expr) => {
        let _timer = $crate::observability::OperationTimer::new($operation);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = BoardMetrics::new();
        metrics.record_move_dispatched();
        metrics.record_move_dispatched();
        metrics.record_move_failed();
        metrics.record_stale_refetch();

        let stats = metrics.get_stats();
        assert_eq!(stats.moves_dispatched, 2);
        assert_eq!(stats.moves_failed, 1);
        assert_eq!(stats.stale_refetches, 1);
        assert_eq!(stats.moves_succeeded, 0);
    }
}
