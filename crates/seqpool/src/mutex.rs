#[cfg(all(loom, not(feature = "parking-lot")))]
pub(crate) use loom::sync::{Mutex, MutexGuard};
#[cfg(all(not(loom), not(feature = "parking-lot")))]
pub(crate) use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Mutex, MutexGuard};

/// Acquires `mutex`, folding a poisoned lock into [`Error::LockPoisoned`].
///
/// [`Error::LockPoisoned`]: crate::Error::LockPoisoned
#[cfg(not(feature = "parking-lot"))]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> crate::Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| crate::Error::LockPoisoned)
}

/// Acquires `mutex`. `parking_lot` mutexes cannot poison, so this never
/// fails; the `Result` shape is kept so call sites read the same under both
/// lock backends.
#[cfg(feature = "parking-lot")]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> crate::Result<MutexGuard<'_, T>> {
    Ok(mutex.lock())
}
