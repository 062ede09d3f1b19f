pub(crate) use ::std::sync::atomic;
pub(crate) use ::std::sync::Arc;
use std::ops::{Deref, DerefMut};

pub(crate) struct MutexGuard<'a, T: ?Sized> {
    inner: ::std::sync::MutexGuard<'a, T>,
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.deref()
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.deref_mut()
    }
}

pub(crate) struct Mutex<T: ?Sized> {
    inner: ::std::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: ::std::sync::Mutex::new(value),
        }
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Lock the mutex. Poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };

        MutexGuard { inner }
    }
}
