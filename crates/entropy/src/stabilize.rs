//! Shared stabilization primitives.
//!
//! Every source that faces an inherently noisy raw signal funnels it
//! through one of these: rounding for values that drift every second,
//! once-guarded memoization for values that are only stable within a
//! session, and bisection for values the host will confirm but not state.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

/// Rounds to the nearest multiple of `step`.
///
/// Raw battery levels and RTT readings change constantly; snapping them to
/// a coarse grid is what makes them usable as fingerprint components.
pub fn round_to_multiple(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// A deferred computation resolved at most once.
///
/// The first `get` runs the closure; every later `get` returns a clone of
/// the first result without re-entering the computation, even when calls
/// overlap. This is the whole stabilization story for signals whose
/// pipeline is non-deterministic per run (noise-injecting audio hosts):
/// within a session the producer's answer never changes.
pub struct MemoizedProducer<T> {
    cell: Arc<OnceCell<T>>,
    compute: Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>,
}

impl<T: Clone + Send + Sync + 'static> MemoizedProducer<T> {
    pub fn new(compute: impl Fn() -> BoxFuture<'static, T> + Send + Sync + 'static) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            compute: Arc::new(compute),
        }
    }

    pub async fn get(&self) -> T {
        self.cell.get_or_init(|| (self.compute)()).await.clone()
    }
}

impl<T> Clone for MemoizedProducer<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            compute: self.compute.clone(),
        }
    }
}

/// Bisection over `[0, limit]` for a monotone predicate, stopping once the
/// window is at most `tolerance` wide.
///
/// With `limit` a power of two the probed windows stay aligned to dyadic
/// boundaries, so two searches converging on the same value from opposite
/// sides land in the same window — that is what keeps the combined
/// dimension bracket within the tolerance.
///
/// Returns the final `(low, high)` window: `matches(low)` held (or `low`
/// was never probed at 0) and `matches(high)` failed, for a predicate true
/// below the hidden threshold.
pub fn bracket_search(
    limit: u32,
    tolerance: u32,
    mut matches: impl FnMut(u32) -> bool,
) -> (u32, u32) {
    let (mut low, mut high) = (0u32, limit);
    while high - low > tolerance {
        let mid = (low + high) / 2;
        if matches(mid) {
            low = mid;
        } else {
            high = mid;
        }
    }
    (low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn rounds_to_step_grid() {
        assert!((round_to_multiple(0.93, 0.05) - 0.95).abs() < 1e-9);
        assert_eq!(round_to_multiple(0.0, 0.05), 0.0);
        assert_eq!(round_to_multiple(1234.0, 60.0), 1260.0);
        assert_eq!(round_to_multiple(112.0, 25.0), 100.0);
        assert_eq!(round_to_multiple(113.0, 25.0), 125.0);
    }

    #[test]
    fn producer_resolves_exactly_once() {
        let runs = Arc::new(AtomicU32::new(0));
        let counted = runs.clone();
        let producer = MemoizedProducer::new(move || {
            let counted = counted.clone();
            Box::pin(async move { counted.fetch_add(1, Ordering::SeqCst) + 1 })
        });
        let clone = producer.clone();
        tokio_test::block_on(async {
            let first = producer.get().await;
            let second = producer.get().await;
            let third = clone.get().await;
            assert_eq!(first, second);
            assert_eq!(first, third);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bisection_brackets_hidden_threshold() {
        for truth in [0u32, 1, 767, 1280, 4096, 8191, 8192] {
            let (low, high) = bracket_search(8192, 10, |m| truth >= m);
            assert!(high - low <= 10);
            assert!(low <= truth);
            assert!(truth <= high);
        }
    }
}
