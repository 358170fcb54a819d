//! FlashController port - Secondary (driven) port for on-chip flash hardware.
//!
//! This port captures the handful of operations a flash macro exposes: a
//! lock that gates every mutating command, a status register with sticky
//! error flags, double-word programming and single-page erase. Reads go
//! straight to the memory-mapped array.

use crate::domain::{
    error::ControllerError,
    value_objects::{Bank, FlashAddress, PageNumber, StatusFlags},
};

/// Port for on-chip flash controller operations.
///
/// # Hexagonal Architecture
///
/// ```text
/// ┌─────────────────────┐
/// │   Adapter Layer     │
/// │  (InternalFlash)    │
/// └──────────┬──────────┘
///            │ depends on
///            ▼
/// ┌─────────────────────┐
/// │ FlashController     │  ◄── This trait
/// └──────────┬──────────┘
///            │ implemented by
///            ▼
/// ┌─────────────────────────────────────────────┐
/// │ Stm32l4Controller / NorFlashController /    │
/// │ SimulatedFlash                              │
/// └─────────────────────────────────────────────┘
/// ```
///
/// The lock is a single global resource. Implementations are not reentrant
/// and must not be shared between execution contexts without external
/// mutual exclusion.
pub trait FlashController {
    /// Unlock the control interface so program and erase commands are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnlockFailed`] if the hardware stays locked.
    fn unlock(&mut self) -> Result<(), ControllerError>;

    /// Lock the control interface again. Infallible by design of the hardware.
    fn lock(&mut self);

    /// Whether the control interface currently rejects mutating commands.
    fn is_locked(&self) -> bool;

    /// Clear the given sticky status flags.
    fn clear_status(&mut self, flags: StatusFlags);

    /// Read one 32-bit word from the memory-mapped array.
    ///
    /// `address` is 4-byte aligned.
    fn read_word(&mut self, address: FlashAddress) -> Result<u32, ControllerError>;

    /// Program one double-word at an 8-byte aligned, erased `address`.
    ///
    /// Requires the control interface to be unlocked.
    fn program_double_word(&mut self, address: FlashAddress, value: u64)
    -> Result<(), ControllerError>;

    /// Erase one page of `bank`, resetting it to all ones.
    ///
    /// Requires the control interface to be unlocked.
    fn erase_page(&mut self, bank: Bank, page: PageNumber) -> Result<(), ControllerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Controller that only tracks the lock, for checking the port is object safe.
    struct LockOnly {
        locked: bool,
    }

    impl FlashController for LockOnly {
        fn unlock(&mut self) -> Result<(), ControllerError> {
            self.locked = false;
            Ok(())
        }

        fn lock(&mut self) {
            self.locked = true;
        }

        fn is_locked(&self) -> bool {
            self.locked
        }

        fn clear_status(&mut self, _flags: StatusFlags) {}

        fn read_word(&mut self, _address: FlashAddress) -> Result<u32, ControllerError> {
            Ok(u32::MAX)
        }

        fn program_double_word(
            &mut self,
            _address: FlashAddress,
            _value: u64,
        ) -> Result<(), ControllerError> {
            if self.locked {
                return Err(ControllerError::Locked);
            }
            Ok(())
        }

        fn erase_page(&mut self, _bank: Bank, _page: PageNumber) -> Result<(), ControllerError> {
            if self.locked {
                return Err(ControllerError::Locked);
            }
            Ok(())
        }
    }

    #[test]
    fn test_port_is_object_safe() {
        let mut controller = LockOnly { locked: true };
        let port: &mut dyn FlashController = &mut controller;

        assert_eq!(
            port.program_double_word(FlashAddress::new(0), 0),
            Err(ControllerError::Locked)
        );
        port.unlock().unwrap();
        assert!(port.erase_page(Bank::Bank2, PageNumber::new(0)).is_ok());
        port.lock();
        assert!(port.is_locked());
    }
}
