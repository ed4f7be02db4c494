//! ESP32 hardware abstraction layer for the PCA9685 driver.
//!
//! This module provides the real register transport over the ESP32's I2C
//! peripheral via `esp-idf-hal`, plus the matching delay and clock
//! sources.
//!
//! # Hardware Configuration
//!
//! - **MCU**: any ESP32 variant supported by esp-idf
//! - **Device**: PCA9685 breakout on the I2C pins of your choice
//!   (default address 0x40; solder jumpers select 0x40-0x7F)
//!
//! The caller constructs the `I2cDriver` (pins, clock speed) and hands it
//! to [`Esp32I2c`] together with the device address, mirroring how one
//! driver instance maps to one (bus, address) pair.

mod i2c;
mod time;

pub use i2c::Esp32I2c;
pub use time::{Esp32Clock, Esp32Delay};
