//! Domain layer - flash region model with zero hardware dependencies.
//!
//! The domain layer contains:
//! - **Value Objects**: `FlashAddress`, `PageNumber`, `Bank`, `FlashLayout`,
//!   `RegionConfig`, `StatusFlags`
//! - **Ports**: `FlashController`, the interface to the flash hardware
//! - **Domain Errors**: `ControllerError`
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer (Core)         │
//!     │                                  │
//!     │  ┌────────────────────────────┐  │
//!     │  │      Value Objects         │  │
//!     │  │  - RegionConfig, etc.      │  │
//!     │  └────────────────────────────┘  │
//!     │              │                   │
//!     │              ▼                   │
//!     │  ┌────────────────────────────┐  │
//!     │  │    Ports (Interfaces)      │  │
//!     │  │    - FlashController       │  │
//!     │  └────────────────────────────┘  │
//!     └──────────────────────────────────┘
//!                    ▲
//!                    │ used by / implemented by
//!                    │
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │
//!     │  - InternalFlash (BlockDevice)   │
//!     │  - ControlGuard                  │
//!     │  - Stm32l4Controller, ...        │
//!     └──────────────────────────────────┘
//! ```

pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::ControllerError;
pub use ports::FlashController;
pub use value_objects::{
    Bank, FlashAddress, FlashLayout, PROGRAM_WIDTH, PageNumber, READ_WIDTH, RegionConfig,
    RegionConfigError, STM32L4R5_BANK1_BASE, STM32L4R5_BANK2_BASE, STM32L4R5_PAGE_SIZE,
    STM32L4R5_PAGES_PER_BANK, StatusFlags,
};
