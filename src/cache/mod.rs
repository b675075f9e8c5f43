// Memoization layer listeners may refresh or evict rows through

pub mod memory;

pub use memory::*;

/// Read and compute-or-insert contract of a key-value cache.
///
/// `get_or_put` does not promise single-flight computation: concurrent callers
/// for the same absent key may each run `compute`.
pub trait Cache<K, V>: Send + Sync {
    /// Pure lookup, never computes
    fn get(&self, key: &K) -> Option<V>;

    /// Cached value if present, otherwise `compute(key)` stored under `key`.
    /// Errors from `compute` propagate unchanged and nothing is stored.
    fn get_or_put<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>;

    fn invalidate(&self, key: &K);

    fn clear(&self);
}
