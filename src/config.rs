//! Configuration types for devices and channel entities.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Validation happens here, at
//! configuration time: a config that passes `validate()` can no longer
//! fail value conversion at runtime.
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::config::{DeviceConfig, NumberConfig};
//!
//! // Use defaults
//! let device = DeviceConfig::default();
//! assert_eq!(device.address, 0x40);
//!
//! // Or customize
//! let valve = NumberConfig::default()
//!     .with_name("valve position")
//!     .with_pin(4)
//!     .with_range(0.0, 100.0)
//!     .with_normalize(10.0, 60.0);
//! assert!(valve.validate().is_ok());
//! ```

use heapless::String as HString;

use crate::normalize::{NormalizeError, NormalizeRange, Normalizer};
use crate::registers::prescale_for_frequency;

/// Maximum length for entity and device names.
pub const MAX_NAME: usize = 64;

/// Type alias for name strings.
pub type ShortString = HString<MAX_NAME>;

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let take = s.len().min(MAX_NAME);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, _)| *i < take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

/// Invalid configuration, rejected before any bus traffic.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConfigError {
    /// Frequency whose prescaler falls outside the 3..=255 register
    /// range (roughly 24-1526 Hz).
    FrequencyOutOfRange(u16),
    /// Channel outside 0..=15.
    PinOutOfRange(u8),
    /// Normalize bounds with `upper <= lower`.
    InvalidNormalizeBounds {
        /// Configured lower bound.
        lower: f64,
        /// Configured upper bound.
        upper: f64,
    },
    /// Domain with `minimum > maximum`.
    EmptyRange {
        /// Configured minimum.
        minimum: f64,
        /// Configured maximum.
        maximum: f64,
    },
    /// Step that is zero or negative.
    InvalidStep(f64),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::FrequencyOutOfRange(hz) => {
                write!(f, "PWM frequency {hz} Hz is outside the supported range")
            }
            ConfigError::PinOutOfRange(pin) => {
                write!(f, "pin {pin} is outside the valid range 0-15")
            }
            ConfigError::InvalidNormalizeBounds { lower, upper } => write!(
                f,
                "normalize upper bound must be greater than lower bound, got [{lower}, {upper}]"
            ),
            ConfigError::EmptyRange { minimum, maximum } => {
                write!(f, "minimum {minimum} exceeds maximum {maximum}")
            }
            ConfigError::InvalidStep(step) => write!(f, "step must be positive, got {step}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl From<NormalizeError> for ConfigError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::InvalidRange { lower, upper } => {
                ConfigError::InvalidNormalizeBounds { lower, upper }
            }
            NormalizeError::EmptyDomain { min, max } => ConfigError::EmptyRange {
                minimum: min,
                maximum: max,
            },
        }
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Configuration for one physical PCA9685.
///
/// One driver instance is created per (bus, address) pair; the PWM
/// frequency is a device-global setting shared by all 16 channels.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// I2C bus number (`/dev/i2c-N` on Linux hosts).
    pub bus: u8,
    /// 7-bit device address.
    pub address: u8,
    /// Shared PWM frequency in Hz.
    pub frequency_hz: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            address: 0x40,
            frequency_hz: 200,
        }
    }
}

impl DeviceConfig {
    /// Set the I2C bus number
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Set the 7-bit device address
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Set the shared PWM frequency
    pub fn with_frequency_hz(mut self, hz: u16) -> Self {
        self.frequency_hz = hz;
        self
    }

    /// Checks the frequency against the device's prescaler range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        prescale_for_frequency(self.frequency_hz)
            .map(|_| ())
            .ok_or(ConfigError::FrequencyOutOfRange(self.frequency_hz))
    }
}

// ============================================================================
// Light Config
// ============================================================================

/// Configuration for a single-channel dimmable light.
///
/// Brightness runs 0..=255 and maps linearly onto the full duty range.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightConfig {
    /// Human-readable entity name.
    pub name: ShortString,
    /// Assigned output channel.
    pub pin: u8,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            name: short_string("pwm-light"),
            pin: 0,
        }
    }
}

impl LightConfig {
    /// Set the entity name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the output channel
    pub fn with_pin(mut self, pin: u8) -> Self {
        self.pin = pin;
        self
    }

    /// Checks the pin against the channel range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pin > 15 {
            return Err(ConfigError::PinOutOfRange(self.pin));
        }
        Ok(())
    }
}

// ============================================================================
// Number Config
// ============================================================================

/// Configuration for a numeric PWM output.
///
/// The logical value runs `minimum..=maximum`; the normalize bounds move
/// the duty ramp's end points, including outside the visible range to
/// clip the ends of the ramp (see [`crate::normalize`]).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberConfig {
    /// Human-readable entity name.
    pub name: ShortString,
    /// Assigned output channel.
    pub pin: u8,
    /// Logical domain minimum.
    pub minimum: f64,
    /// Logical domain maximum.
    pub maximum: f64,
    /// UI step size in logical units.
    pub step: f64,
    /// Logical value mapped to duty 0.
    pub normalize_lower: f64,
    /// Logical value mapped to duty 4095.
    pub normalize_upper: f64,
    /// Whether the duty output is inverted.
    pub invert: bool,
}

impl Default for NumberConfig {
    fn default() -> Self {
        Self {
            name: short_string("pwm-number"),
            pin: 0,
            minimum: 0.0,
            maximum: 100.0,
            step: 1.0,
            normalize_lower: 0.0,
            normalize_upper: 100.0,
            invert: false,
        }
    }
}

impl NumberConfig {
    /// Set the entity name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the output channel
    pub fn with_pin(mut self, pin: u8) -> Self {
        self.pin = pin;
        self
    }

    /// Set the logical domain
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Set the UI step size
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the normalization ramp bounds
    pub fn with_normalize(mut self, lower: f64, upper: f64) -> Self {
        self.normalize_lower = lower;
        self.normalize_upper = upper;
        self
    }

    /// Set output inversion
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Builds the value normalizer this configuration describes.
    pub fn normalizer(&self) -> Result<Normalizer, NormalizeError> {
        Normalizer::new(
            self.minimum,
            self.maximum,
            NormalizeRange::new(self.normalize_lower, self.normalize_upper),
            self.invert,
        )
    }

    /// Full validation: pin, step, domain, and normalize bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pin > 15 {
            return Err(ConfigError::PinOutOfRange(self.pin));
        }
        if !(self.step > 0.0) {
            return Err(ConfigError::InvalidStep(self.step));
        }
        self.normalizer()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_device_config() {
        let device = DeviceConfig::default();
        assert_eq!(device.bus, 1);
        assert_eq!(device.address, 0x40);
        assert_eq!(device.frequency_hz, 200);
        assert!(device.validate().is_ok());
    }

    #[test]
    fn device_builder_pattern() {
        let device = DeviceConfig::default()
            .with_bus(3)
            .with_address(0x41)
            .with_frequency_hz(50);

        assert_eq!(device.bus, 3);
        assert_eq!(device.address, 0x41);
        assert_eq!(device.frequency_hz, 50);
    }

    #[test]
    fn device_rejects_unreachable_frequency() {
        let device = DeviceConfig::default().with_frequency_hz(10_000);
        assert_eq!(
            device.validate(),
            Err(ConfigError::FrequencyOutOfRange(10_000))
        );
    }

    // =========================================================================
    // LightConfig Tests
    // =========================================================================

    #[test]
    fn light_config_defaults() {
        let light = LightConfig::default();
        assert_eq!(light.name.as_str(), "pwm-light");
        assert_eq!(light.pin, 0);
        assert!(light.validate().is_ok());
    }

    #[test]
    fn light_pin_out_of_range() {
        let light = LightConfig::default().with_pin(16);
        assert_eq!(light.validate(), Err(ConfigError::PinOutOfRange(16)));
    }

    // =========================================================================
    // NumberConfig Tests
    // =========================================================================

    #[test]
    fn number_config_defaults_validate() {
        let number = NumberConfig::default();
        assert_eq!(number.minimum, 0.0);
        assert_eq!(number.maximum, 100.0);
        assert_eq!(number.step, 1.0);
        assert!(!number.invert);
        assert!(number.validate().is_ok());
    }

    #[test]
    fn number_builder_pattern() {
        let number = NumberConfig::default()
            .with_name("fan speed")
            .with_pin(9)
            .with_range(0.0, 10.0)
            .with_step(0.5)
            .with_normalize(-2.0, 12.0)
            .with_invert(true);

        assert_eq!(number.name.as_str(), "fan speed");
        assert_eq!(number.pin, 9);
        assert_eq!(number.normalize_lower, -2.0);
        assert_eq!(number.normalize_upper, 12.0);
        assert!(number.invert);
        assert!(number.validate().is_ok());
    }

    #[test]
    fn number_rejects_degenerate_normalize_bounds() {
        let number = NumberConfig::default().with_normalize(40.0, 40.0);
        assert_eq!(
            number.validate(),
            Err(ConfigError::InvalidNormalizeBounds {
                lower: 40.0,
                upper: 40.0
            })
        );
    }

    #[test]
    fn number_rejects_empty_domain() {
        let number = NumberConfig::default().with_range(10.0, 0.0);
        assert!(matches!(
            number.validate(),
            Err(ConfigError::EmptyRange { .. })
        ));
    }

    #[test]
    fn number_rejects_non_positive_step() {
        assert_eq!(
            NumberConfig::default().with_step(0.0).validate(),
            Err(ConfigError::InvalidStep(0.0))
        );
        assert_eq!(
            NumberConfig::default().with_step(-1.0).validate(),
            Err(ConfigError::InvalidStep(-1.0))
        );
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncates() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert!(s.len() <= MAX_NAME);
    }
}
