//! Sharded sequence pool.

use core::ops::Range;
use std::collections::VecDeque;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::mutex::{self, Mutex};
use crate::ring::Ring;
use crate::{Error, Result};

/// Capacity of each per-user cache ring.
const CACHE_SLOTS: u32 = 32;

/// Slow-path state. Only ever touched while holding the pool lock.
struct Shared {
    /// Recycled IDs, consumed before the cursor is advanced.
    free_ids: VecDeque<u32>,
    /// Monotonic cursor: the lowest ID never yet drawn from the range. Never
    /// decreases and never exceeds `base + n_ids`.
    next_id: u32,
}

/// A sharded pool of unique 32-bit IDs.
///
/// The pool hands out IDs from the half-open range `[base, base + n_ids)`
/// and takes them back in any order. Each user shard fronts the shared state
/// with its own lock-free [`Ring`] cache, so the steady-state acquire and
/// release paths touch no lock at all.
///
/// ## Features
///
/// - ✅ Thread-safe: any thread may call any operation with any `uid`
/// - ✅ Lock-free fast paths; the shared lock is only taken to refill or
///   flush a cache, in batches bounded by the cache capacity
/// - ✅ Deadlock-free stealing: peers take from each other's caches through
///   the ring alone
/// - ❌ No ordering: IDs come back from caches, the free list, or the cursor
///   in no particular order
///
/// Shards are a performance hint, not an ownership boundary: `uid` is folded
/// by `uid % nb_user`, and distribution quality is the caller's concern.
///
/// # Example
/// ```
/// use seqpool::SeqPool;
///
/// let pool = SeqPool::new(4, 0, 1024).unwrap();
/// let id = pool.new_id(0).expect("fresh pool has IDs");
/// assert!(pool.id_range().contains(&id));
/// pool.free_id(0, id);
/// ```
pub struct SeqPool {
    /// Per-user ID caches. Each cache is MPMC so that peers may steal.
    caches: Box<[Ring]>,
    shared: Mutex<Shared>,
    base: u32,
    n_ids: u32,
}

impl SeqPool {
    /// Creates a pool of `n_ids` IDs starting at `base`, sharded across
    /// `nb_user` caches.
    ///
    /// # Errors
    /// - [`Error::NoUsers`] if `nb_user` is zero.
    /// - [`Error::RangeOverflow`] if `base + n_ids` overflows a `u32`.
    pub fn new(nb_user: usize, base: u32, n_ids: u32) -> Result<Self> {
        if nb_user == 0 {
            return Err(Error::NoUsers);
        }
        if base.checked_add(n_ids).is_none() {
            return Err(Error::RangeOverflow);
        }

        let caches = (0..nb_user)
            .map(|_| Ring::with_capacity(CACHE_SLOTS))
            .collect::<Result<_>>()?;

        Ok(Self {
            caches,
            shared: Mutex::new(Shared {
                free_ids: VecDeque::new(),
                next_id: base,
            }),
            base,
            n_ids,
        })
    }

    /// Number of user shards.
    pub fn users(&self) -> usize {
        self.caches.len()
    }

    /// The half-open range of IDs this pool manages.
    pub fn id_range(&self) -> Range<u32> {
        self.base..self.base + self.n_ids
    }

    /// Fetches an unused ID from the pool.
    ///
    /// Returns `None` when the pool is exhausted. Exhaustion can be
    /// transient: a concurrent [`Self::free_id`] that has not yet landed
    /// anywhere visible makes the ID reappear on a later call.
    ///
    /// # Panics
    /// Panics if the shared lock is poisoned. For explicitly fallible
    /// behavior, use [`Self::try_new_id`] instead.
    pub fn new_id(&self, uid: usize) -> Option<u32> {
        self.try_new_id(uid).unwrap()
    }

    /// A fallible version of [`Self::new_id`] that returns a [`Result`].
    ///
    /// The allocator works through four tiers and returns the first hit:
    ///
    /// 1. Pop the caller's own cache.
    /// 2. Under the shared lock, refill the cache from the free list, then
    ///    from the cursor.
    /// 3. Retry the pop.
    /// 4. Steal a single ID from a peer cache.
    ///
    /// # Returns
    /// - `Ok(Some(id))`: an ID unused by anyone else until freed
    /// - `Ok(None)`: every tier came up empty
    /// - `Err(e)`: the shared lock was poisoned
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_new_id(&self, uid: usize) -> Result<Option<u32>> {
        let uid = uid % self.caches.len();
        let cache = &self.caches[uid];

        if let Some(id) = cache.try_pop() {
            return Ok(Some(id));
        }

        self.refill(cache)?;

        if let Some(id) = cache.try_pop() {
            return Ok(Some(id));
        }

        Ok(self.steal(uid))
    }

    /// Returns `id` to the pool.
    ///
    /// An `id` outside the pool's range is ignored. The caller must own the
    /// ID, i.e. it came from [`Self::new_id`] and has not been freed since;
    /// freeing an ID twice breaks the uniqueness contract and is not
    /// detected.
    ///
    /// # Panics
    /// Panics if the shared lock is poisoned. For explicitly fallible
    /// behavior, use [`Self::try_free_id`] instead.
    pub fn free_id(&self, uid: usize, id: u32) {
        self.try_free_id(uid, id).unwrap()
    }

    /// A fallible version of [`Self::free_id`] that returns a [`Result`].
    ///
    /// The ID lands in the caller's cache when there is room. A full cache
    /// is drained wholesale into the shared free list together with the
    /// freed ID, leaving the cache empty for the next burst of frees.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_free_id(&self, uid: usize, id: u32) -> Result<()> {
        if !self.id_range().contains(&id) {
            return Ok(());
        }

        let cache = &self.caches[uid % self.caches.len()];

        if cache.try_push(id).is_ok() {
            return Ok(());
        }

        let mut batch = Vec::with_capacity(CACHE_SLOTS as usize + 1);
        while let Some(cached) = cache.try_pop() {
            batch.push(cached);
        }
        batch.push(id);

        mutex::lock(&self.shared)?.free_ids.extend(batch);

        Ok(())
    }

    /// Slow path: top up `cache` under the lock, recycled IDs first, then
    /// the cursor. Both loops stop at a full cache, which bounds the
    /// critical section to one cache's worth of ring operations.
    fn refill(&self, cache: &Ring) -> Result<()> {
        let mut shared = mutex::lock(&self.shared)?;

        while let Some(&id) = shared.free_ids.front() {
            if cache.try_push(id).is_err() {
                break;
            }
            shared.free_ids.pop_front();
        }

        let end = self.base + self.n_ids;
        while shared.next_id < end {
            if cache.try_push(shared.next_id).is_err() {
                break;
            }
            shared.next_id += 1;
        }

        Ok(())
    }

    /// Last resort: take one ID from another user's cache. A single attempt
    /// per peer keeps the latency bounded when every cache is running dry,
    /// and the rings make this safe without any lock.
    fn steal(&self, uid: usize) -> Option<u32> {
        self.caches
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != uid)
            .find_map(|(_, peer)| peer.try_pop())
    }

    #[cfg(test)]
    pub(crate) fn free_list_len(&self) -> usize {
        mutex::lock(&self.shared).unwrap().free_ids.len()
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> u32 {
        self.caches.iter().map(Ring::len).sum()
    }
}
