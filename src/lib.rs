//! # rs-pca9685
//!
//! Core logic for driving a PCA9685 16-channel, 12-bit PWM controller
//! over I2C: the register driver, value normalization, and channel
//! allocation used by light and number entities in a home-automation
//! host.
//!
//! ## Features
//!
//! - **Register driver**: MODE1/prescaler state machine, single-burst
//!   channel updates, bounded retry on transient bus errors
//! - **Value normalization**: configurable ramp bounds (including
//!   out-of-range clipping points) and output inversion over the 12-bit
//!   duty range
//! - **Pin allocation**: per-device bookkeeping so two entities never
//!   claim the same output, with "next free pin" suggestions
//! - **Hardware abstraction**: the same core runs against desktop mocks
//!   and the ESP32 I2C peripheral
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Register transport, delay, and clock abstractions
//! - `registers` - PCA9685 register map and channel codec
//! - `driver` - Device state machine and retry policy
//! - `normalize` - Logical value to duty-cycle mapping
//! - `pins` - Channel allocation bookkeeping
//! - `outputs` - Light and number entities over allocated channels
//! - `hal` - Concrete implementations (mock for testing, esp32 for
//!   hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_pca9685::{
//!     config::{DeviceConfig, NumberConfig},
//!     driver::Pca9685,
//!     hal::{MockBus, MockDelay},
//!     outputs::NumberOutput,
//!     pins::PinAllocator,
//! };
//!
//! // Bring the device up at its configured frequency
//! let device = DeviceConfig::default();
//! device.validate().unwrap();
//! let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
//! dev.configure(device.frequency_hz).unwrap();
//!
//! // Allocate a channel and drive a number entity over it
//! let mut pins = PinAllocator::new();
//! let pin = pins.allocate(None).unwrap();
//!
//! let config = NumberConfig::default()
//!     .with_pin(pin)
//!     .with_range(0.0, 100.0)
//!     .with_normalize(10.0, 60.0);
//! let mut valve = NumberOutput::new(&config).unwrap();
//! valve.set_value(&mut dev, 35.0).unwrap();
//!
//! assert_eq!(dev.get_duty(pin).unwrap(), 2048);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Configuration types for devices and channel entities.
pub mod config;
/// PCA9685 register driver and its state machine.
pub mod driver;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Logical value to duty-cycle normalization.
pub mod normalize;
/// Light and number entities over allocated channels.
pub mod outputs;
/// Channel allocation bookkeeping.
pub mod pins;
/// PCA9685 register map and channel codec.
pub mod registers;
/// Core traits for the hardware seam.
pub mod traits;

// Re-exports for convenience
pub use config::{ConfigError, DeviceConfig, LightConfig, NumberConfig};
pub use driver::{DriverState, Error as DriverError, Pca9685};
pub use normalize::{NormalizeError, NormalizeRange, Normalizer};
pub use outputs::{LightOutput, NumberOutput, PwmOutput};
pub use pins::{AllocError, PinAllocator};
pub use registers::{CHANNEL_COUNT, DUTY_MAX};
pub use traits::{Clock, Delay, PwmBus};
