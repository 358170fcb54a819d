//! Scoped ownership of the flash control interface.

use crate::domain::{ControllerError, FlashController};
use core::ops::{Deref, DerefMut};

/// RAII guard holding the flash control interface unlocked.
///
/// Acquiring the guard unlocks the controller; dropping it locks the
/// controller again. Every exit path out of a program or erase, including
/// `?` early returns, therefore leaves the interface locked.
///
/// The guard borrows the controller mutably, so a second guard cannot be
/// taken while one is alive.
///
/// # Examples
///
/// ```ignore
/// let mut guard = ControlGuard::acquire(&mut controller)?;
/// guard.clear_status(StatusFlags::STALE);
/// guard.erase_page(Bank::Bank2, PageNumber::new(3))?;
/// // locked again here
/// ```
pub struct ControlGuard<'a, C: FlashController> {
    controller: &'a mut C,
}

impl<'a, C: FlashController> ControlGuard<'a, C> {
    /// Unlock `controller` for the lifetime of the returned guard.
    ///
    /// # Errors
    ///
    /// Propagates the controller's unlock failure. The controller is locked
    /// again before the error is returned.
    pub fn acquire(controller: &'a mut C) -> Result<Self, ControllerError> {
        if let Err(e) = controller.unlock() {
            controller.lock();
            return Err(e);
        }
        Ok(Self { controller })
    }
}

impl<C: FlashController> Deref for ControlGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.controller
    }
}

impl<C: FlashController> DerefMut for ControlGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.controller
    }
}

impl<C: FlashController> Drop for ControlGuard<'_, C> {
    fn drop(&mut self) {
        self.controller.lock();
    }
}
