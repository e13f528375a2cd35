//! Deterministic key-to-shard routing.

use std::sync::Arc;

/// Routing function: maps an item key to a shard index given the shard count.
///
/// Must be deterministic for a fixed `(key, count)` pair; no distribution
/// quality is assumed beyond that.
pub type RouteFn = dyn Fn(&str, usize) -> usize + Send + Sync;

/// Maps item keys onto a fixed, sorted set of underlying domains.
///
/// Routing is a pure function of the key and the shard count: the same pair
/// always yields the same shard. That is what keeps all of an item's
/// attributes on a single shard across writes.
#[derive(Clone)]
pub struct Router {
    route: Arc<RouteFn>,
}

impl Router {
    /// Router using the default hash policy.
    pub fn new() -> Self {
        Self::with_fn(Arc::new(default_route))
    }

    /// Router with a caller-supplied policy.
    pub fn with_fn(route: Arc<RouteFn>) -> Self {
        Self { route }
    }

    /// Returns the shard index for `key` among `count` shards (`count` >= 1).
    ///
    /// Out-of-range results from a custom policy wrap around rather than
    /// index past the shard list.
    pub fn route(&self, key: &str, count: usize) -> usize {
        (self.route)(key, count) % count.max(1)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Default policy: signed 31-polynomial hash of the key, made positive,
/// remainder by shard count.
///
/// A non-positive remainder lands on shard 0. This keeps the historical
/// quirk where `wrapping_abs` leaves the minimum hash value negative, so
/// such keys collapse onto the first shard instead of distributing.
pub fn default_route(key: &str, count: usize) -> usize {
    let mut hash: i32 = 0;
    for byte in key.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as i32);
    }
    let rem = hash.wrapping_abs() % count.max(1) as i32;
    if rem <= 0 {
        0
    } else {
        rem as usize
    }
}
