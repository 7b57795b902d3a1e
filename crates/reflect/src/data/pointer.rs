//! Storage for a Data binding
//!
//! A [`DataPtr`] either owns its value (standalone mode) or points at a value
//! that lives inside an object or structure (connected mode).

use std::ptr::NonNull;

/// Owned value or pointer into live storage
///
/// While disconnected the pointer is never dereferenced; all access goes to
/// the owned value.
pub struct DataPtr<T> {
    owned: T,
    target: Option<NonNull<T>>,
}

impl<T> DataPtr<T> {
    /// Standalone storage holding `value`
    pub fn new(value: T) -> Self {
        Self {
            owned: value,
            target: None,
        }
    }

    /// Point at external storage
    ///
    /// # Safety
    /// - `target` must point to a valid, initialized `T`
    /// - The storage must outlive the connection (until `disconnect` is called
    ///   or this `DataPtr` is dropped)
    /// - If the storage was only borrowed shared, the caller must not write
    ///   through this `DataPtr` while connected
    #[inline]
    pub unsafe fn connect(&mut self, target: NonNull<T>) {
        self.target = Some(target);
    }

    /// Return to standalone mode
    #[inline]
    pub fn disconnect(&mut self) {
        self.target = None;
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    #[inline]
    pub fn get(&self) -> &T {
        match self.target {
            // SAFETY: the connect contract keeps the target valid while connected
            Some(target) => unsafe { target.as_ref() },
            None => &self.owned,
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        match self.target {
            // SAFETY: the connect contract keeps the target valid and writable
            Some(mut target) => unsafe { target.as_mut() },
            None => &mut self.owned,
        }
    }

    #[inline]
    pub fn set(&mut self, value: T) {
        *self.get_mut() = value;
    }
}

impl<T: Default> DataPtr<T> {
    /// Disconnect and drop the owned value
    pub fn reset(&mut self) {
        self.target = None;
        self.owned = T::default();
    }
}

impl<T: Default> Default for DataPtr<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
