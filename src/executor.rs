//! Fork-join execution abstraction (`spec.md` §4.H).
//!
//! Every bulk driver (`fingerprint`, `sort`, and the similarity scorers'
//! batch entry points) is generic over an [`Executor`], so callers can pick
//! [`Serial`] for deterministic single-threaded runs or [`ForkJoin`] to
//! spread work across a `rayon` thread pool. Grounded on `rayon`'s usage in
//! `examples/Himasnhu-AT-rvector` and `examples/jafreck-lz4r`, which both
//! reach for `rayon::prelude::*` rather than hand-rolled thread pools.

use parking_lot::Mutex;
use rayon::prelude::*;

/// A source of parallelism for bulk operations, mirroring `spec.md`
/// §4.H's `for_each_static` / `for_each_dynamic` / `for_each_slice` /
/// `threads_count` contract.
pub trait Executor: Sync {
    /// Number of worker threads this executor would use for a large job.
    fn threads_count(&self) -> usize;

    /// Run `f(i)` for every `i` in `0..count`, with work split into
    /// `threads_count()` equal, contiguous chunks ahead of time. Cheapest
    /// when every iteration costs about the same.
    fn for_each_static(&self, count: usize, f: &(dyn Fn(usize) + Sync));

    /// Run `f(i)` for every `i` in `0..count`, handing iterations out one
    /// at a time as workers free up. Use when iteration cost is uneven.
    fn for_each_dynamic(&self, count: usize, f: &(dyn Fn(usize) + Sync));

    /// Run `f(start, end)` once per contiguous slice of `0..count`, split
    /// into `threads_count()` pieces. Use when a chunk, not a single
    /// index, is the natural unit of work (e.g. fingerprinting a byte
    /// range with carried rolling-hash state).
    fn for_each_slice(&self, count: usize, f: &(dyn Fn(usize, usize) + Sync));
}

/// Single-threaded executor: every `for_each_*` call runs its iterations in
/// order on the calling thread. The baseline every parallel executor must
/// agree with on results (`spec.md` §8's parallel/serial-equivalence
/// testable property).
pub struct Serial;

impl Executor for Serial {
    fn threads_count(&self) -> usize {
        1
    }

    fn for_each_static(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
        for i in 0..count {
            f(i);
        }
    }

    fn for_each_dynamic(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
        for i in 0..count {
            f(i);
        }
    }

    fn for_each_slice(&self, count: usize, f: &(dyn Fn(usize, usize) + Sync)) {
        if count > 0 {
            f(0, count);
        }
    }
}

/// Fork-join executor backed by the global `rayon` thread pool.
pub struct ForkJoin;

impl Executor for ForkJoin {
    fn threads_count(&self) -> usize {
        rayon::current_num_threads()
    }

    fn for_each_static(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
        (0..count).into_par_iter().for_each(|i| f(i));
    }

    fn for_each_dynamic(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
        // rayon's work-stealing scheduler already hands out iterations
        // dynamically; static and dynamic coincide here.
        (0..count).into_par_iter().for_each(|i| f(i));
    }

    fn for_each_slice(&self, count: usize, f: &(dyn Fn(usize, usize) + Sync)) {
        let slices = self.threads_count().max(1).min(count.max(1));
        let base = count / slices;
        let bounds: Vec<(usize, usize)> = (0..slices)
            .map(|i| {
                let start = i * base;
                let end = if i + 1 == slices { count } else { (i + 1) * base };
                (start, end)
            })
            .filter(|(s, e)| s < e)
            .collect();
        bounds.into_par_iter().for_each(|(start, end)| f(start, end));
    }
}

/// Map `f` over `0..count` using `executor`'s dynamic scheduling, collecting
/// results in index order. A free function rather than an `Executor`
/// method: a generic method can't be called through `&dyn Executor`, and
/// callers (bulk fingerprint/sort drivers) always hold a trait object.
pub fn map_indices<T: Send>(executor: &dyn Executor, count: usize, f: impl Fn(usize) -> T + Sync) -> Vec<T> {
    let slots: Vec<Mutex<Option<T>>> = (0..count).map(|_| Mutex::new(None)).collect();
    executor.for_each_dynamic(count, &|i| {
        *slots[i].lock() = Some(f(i));
    });
    slots.into_iter().map(|m| m.into_inner().expect("every index visited exactly once")).collect()
}

/// Map `f` over a set of contiguous slices of `0..count`, one call per
/// slice, collecting results in slice order. Built on [`Executor::for_each_slice`].
pub fn map_slices<T: Send>(executor: &dyn Executor, count: usize, f: impl Fn(usize, usize) -> T + Sync) -> Vec<T> {
    let slices = executor.threads_count().max(1).min(count.max(1));
    let base = if slices == 0 { count } else { count / slices };
    let bounds: Vec<(usize, usize)> = (0..slices)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == slices { count } else { (i + 1) * base };
            (start, end)
        })
        .filter(|(s, e)| s < e)
        .collect();

    let slots: Vec<Mutex<Option<T>>> = (0..bounds.len()).map(|_| Mutex::new(None)).collect();
    executor.for_each_dynamic(bounds.len(), &|i| {
        let (start, end) = bounds[i];
        *slots[i].lock() = Some(f(start, end));
    });
    slots.into_iter().map(|m| m.into_inner().expect("every slice visited exactly once")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn serial_visits_every_index_in_order() {
        let seen = Mutex::new(Vec::new());
        Serial.for_each_static(5, &|i| seen.lock().push(i));
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn fork_join_visits_every_index_exactly_once() {
        let total = AtomicUsize::new(0);
        ForkJoin.for_each_dynamic(1000, &|_| {
            total.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(total.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn map_indices_matches_serial_and_fork_join() {
        let serial = map_indices(&Serial, 50, |i| i * i);
        let parallel = map_indices(&ForkJoin, 50, |i| i * i);
        assert_eq!(serial, parallel);
        assert_eq!(serial[7], 49);
    }

    #[test]
    fn for_each_slice_covers_the_full_range_without_overlap() {
        let hits = Mutex::new(vec![0u32; 97]);
        Serial.for_each_slice(97, &|start, end| {
            let mut hits = hits.lock();
            for i in start..end {
                hits[i] += 1;
            }
        });
        assert!(hits.lock().iter().all(|&c| c == 1));
    }

    #[test]
    fn map_slices_fork_join_covers_full_range() {
        let out = map_slices(&ForkJoin, 97, |start, end| end - start);
        let total: usize = out.iter().sum();
        assert_eq!(total, 97);
    }
}
