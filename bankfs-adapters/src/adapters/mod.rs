//! Adapter layer - Concrete implementations connecting domain to hardware.
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │   Flash filesystem (consumer)    │
//!     └────────────┬─────────────────────┘
//!                  │ BlockDevice
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - InternalFlash                 │
//!     │  - ControlGuard                  │
//!     └────────────┬─────────────────────┘
//!                  │ FlashController
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │  Stm32l4Controller               │
//!     │  NorFlashController              │
//!     │  SimulatedFlash                  │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Available Adapters
//!
//! - **`InternalFlash`**: `BlockDevice` over an on-chip flash region
//! - **`ControlGuard`**: Scoped unlock of the flash control interface
//! - **`Stm32l4Controller`**: Register-level controller (requires `stm32l4`)
//! - **`NorFlashController`**: Controller over `embedded-storage` drivers
//!   (requires `embedded-storage`)
//! - **`SimulatedFlash`**: RAM-backed controller with fault injection
//!   (requires `sim`)

mod control_guard;
mod internal_flash;

#[cfg(any(test, feature = "sim"))]
mod sim;

#[cfg(any(test, feature = "stm32l4"))]
pub mod stm32l4;

#[cfg(any(test, feature = "embedded-storage"))]
mod nor_flash_controller;

pub use control_guard::ControlGuard;
pub use internal_flash::InternalFlash;

#[cfg(any(test, feature = "sim"))]
pub use sim::SimulatedFlash;

#[cfg(any(test, feature = "stm32l4"))]
pub use stm32l4::Stm32l4Controller;

#[cfg(any(test, feature = "embedded-storage"))]
pub use nor_flash_controller::NorFlashController;
