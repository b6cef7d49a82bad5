//! Bounded lockless queue.
//!
//! A fixed-capacity FIFO of `u32` payloads that any number of threads may
//! push to and pop from concurrently. Each operation uses a single CAS, and
//! an operation that cannot complete because the queue is full or empty
//! fails immediately instead of waiting on a state change.

use core::cell::UnsafeCell;

#[cfg(not(loom))]
use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;

use crate::{Error, Result};

/// A queue slot.
///
/// `seq` encodes the slot state relative to the logical position `pos`
/// observing it (`pos & mask` selects this slot):
///
/// - `seq == pos`: empty, claimable by the producer at `pos`.
/// - `seq == pos + 1`: full, claimable by the consumer at `pos`.
/// - `seq == pos + capacity`: empty again, one generation later.
struct Slot {
    seq: AtomicU32,
    data: UnsafeCell<u32>,
}

/// A bounded lock-free MPMC queue of `u32` payloads.
///
/// ## Features
///
/// - ✅ Multi-producer: any number of threads may push concurrently
/// - ✅ Multi-consumer: any number of threads may pop concurrently
/// - ✅ Lock-free: no locks taken; some operation always completes in a
///   bounded number of steps system-wide
/// - ❌ Not wait-free: a preempted thread that has claimed a slot delays the
///   peer of that slot until it publishes
///
/// The head and tail indices are padded to separate cache lines, which
/// avoids false sharing between producers and consumers at the cost of some
/// memory.
///
/// # Example
/// ```
/// use seqpool::Ring;
///
/// let ring = Ring::with_capacity(8).unwrap();
/// assert!(ring.try_push(7).is_ok());
/// assert_eq!(ring.try_pop(), Some(7));
/// assert_eq!(ring.try_pop(), None);
/// ```
pub struct Ring {
    /// Next producer position.
    head: CachePadded<AtomicU32>,
    /// Next consumer position.
    tail: CachePadded<AtomicU32>,
    mask: u32,
    slots: Box<[Slot]>,
}

// SAFETY: a slot payload is only accessed by the thread that claimed the
// slot through the `(pos, seq)` protocol: the winning CAS on `head`/`tail`
// paired with the acquire load of `seq` proves exclusive ownership until the
// release store hands the slot over. The release/acquire pair on `seq` also
// orders the payload transfer between producer and consumer.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Creates a ring with room for `capacity` elements.
    ///
    /// `capacity` must be a power of two and at least 4; anything else
    /// returns [`Error::InvalidCapacity`].
    pub fn with_capacity(capacity: u32) -> Result<Self> {
        if capacity < 4 || !capacity.is_power_of_two() {
            return Err(Error::InvalidCapacity);
        }

        let slots = (0..capacity)
            .map(|i| Slot {
                seq: AtomicU32::new(i),
                data: UnsafeCell::new(0),
            })
            .collect();

        Ok(Self {
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            mask: capacity - 1,
            slots,
        })
    }

    /// Attempts to push `value` into the queue.
    ///
    /// Returns `Err(value)` if the queue is full. Never blocks.
    #[inline]
    pub fn try_push(&self, value: u32) -> Result<(), u32> {
        let mut pos = self.head.load(Ordering::Relaxed);
        let slot = loop {
            let slot = &self.slots[(pos & self.mask) as usize];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = i64::from(seq) - i64::from(pos);

            if diff == 0 {
                // The slot is empty and `pos` is current: race peers for it.
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break slot,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // The slot still holds the element one generation behind.
                return Err(value);
            } else {
                // Another producer claimed `pos`; chase the head.
                pos = self.head.load(Ordering::Relaxed);
            }
        };

        // SAFETY: the winning CAS above makes this thread the slot's sole
        // owner until the release store publishes it to the consumer.
        unsafe { *slot.data.get() = value };
        slot.seq.store(pos.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Attempts to pop the oldest element from the queue.
    ///
    /// Returns `None` if the queue is empty. Never blocks.
    #[inline]
    pub fn try_pop(&self) -> Option<u32> {
        let mut pos = self.tail.load(Ordering::Relaxed);
        let slot = loop {
            let slot = &self.slots[(pos & self.mask) as usize];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = i64::from(seq) - i64::from(pos.wrapping_add(1));

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break slot,
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return None;
            } else {
                // Another consumer claimed `pos`; chase the tail.
                pos = self.tail.load(Ordering::Relaxed);
            }
        };

        // SAFETY: the winning CAS above gives exclusive access to the slot;
        // the acquire load of `seq` synchronizes with the producer's release
        // store, so the payload read observes the published value.
        let value = unsafe { *slot.data.get() };
        // Roll the slot into the next generation.
        slot.seq
            .store(pos.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);

        Some(value)
    }

    /// The fixed number of slots.
    pub fn capacity(&self) -> u32 {
        self.mask + 1
    }

    /// Number of occupied slots.
    ///
    /// The two indices are sampled independently, so under concurrent use
    /// the result is a snapshot that may already be stale on return.
    pub fn len(&self) -> u32 {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    /// Whether the queue currently holds no elements. Same caveat as
    /// [`Self::len`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(all(test, loom))]
mod loom_tests;
