//! Trait definitions for the hardware seam.
//!
//! This module defines the abstractions that let the register driver run
//! against real I2C hardware or against the desktop mocks:
//!
//! - `hardware`: register transport ([`PwmBus`]), delay and clock sources
//!
//! The traits are deliberately narrow: everything the driver needs from a
//! platform is byte-level register access plus millisecond timing. All
//! numeric logic (codec, normalization, allocation) lives above this seam
//! and is platform-free.

pub mod hardware;

pub use hardware::*;
