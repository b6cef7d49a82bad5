use core::fmt;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `seqpool` can emit.
///
/// Construction errors report caller bugs and are returned eagerly. At
/// runtime the crate is effectively infallible unless a thread panics while
/// holding the shared pool lock; with the `parking-lot` feature enabled,
/// mutexes do not poison and that variant is not available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Error {
    /// A ring was created with a capacity that is not a power of two of at
    /// least 4.
    InvalidCapacity,

    /// A pool was created with zero user shards.
    NoUsers,

    /// `base + n_ids` does not fit in a `u32`.
    RangeOverflow,

    /// The operation failed because the shared pool lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    LockPoisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl core::error::Error for Error {}
