//! Ports define the interfaces between the domain and the outside world.
//!
//! The adapter drives the flash hardware through a single **secondary
//! (driven) port**: [`FlashController`]. Register-level drivers, HAL
//! wrappers and simulators all plug in here.

mod flash_controller;

pub use flash_controller::FlashController;
