//! Domain-level errors.
//!
//! These describe why the flash hardware refused or failed an operation.
//! The adapter layer folds all of them into the consumer's I/O error; they
//! exist so controllers and tests can say precisely what went wrong.

use crate::domain::value_objects::{FlashAddress, StatusFlags};
use core::fmt;

/// Errors reported through the [`FlashController`](crate::FlashController) port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum ControllerError {
    /// A program or erase was attempted without unlocking the controller.
    Locked,
    /// The unlock key sequence was rejected.
    UnlockFailed,
    /// The controller stayed busy past its wait budget.
    Busy,
    /// The operation completed with error flags set.
    Status(StatusFlags),
    /// The address does not belong to the flash array.
    OutOfBounds(FlashAddress),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "Flash controller is locked"),
            Self::UnlockFailed => write!(f, "Flash controller rejected the unlock sequence"),
            Self::Busy => write!(f, "Flash controller timed out while busy"),
            Self::Status(flags) => write!(f, "Flash operation failed with status {:#x}", flags.bits()),
            Self::OutOfBounds(addr) => write!(f, "Address {} is outside the flash array", addr),
        }
    }
}

impl core::error::Error for ControllerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let error = ControllerError::Status(StatusFlags::PROGERR);
        let msg = format!("{}", error);
        assert!(msg.contains("0x8"));
    }

    #[test]
    fn test_out_of_bounds_display() {
        let error = ControllerError::OutOfBounds(FlashAddress::new(0x0820_0000));
        assert_eq!(
            format!("{}", error),
            "Address 0x08200000 is outside the flash array"
        );
    }
}
