//! PCA9685 register transport over the ESP32 I2C peripheral.

use crate::traits::PwmBus;
use esp_idf_hal::delay::TickType;
use esp_idf_hal::i2c::I2cDriver;
use esp_idf_hal::sys::EspError;

/// Per-transfer timeout so a wedged bus fails the call instead of
/// hanging the caller.
const BUS_TIMEOUT_MS: u64 = 50;

/// I2C register transport for one PCA9685 device.
///
/// Wraps an `esp-idf-hal` I2C driver together with the device's 7-bit
/// address. Burst writes go out as a single I2C transaction (register
/// address followed by the data bytes) so the device's auto-increment
/// mode applies them atomically.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
/// use esp_idf_hal::peripherals::Peripherals;
/// use esp_idf_hal::prelude::*;
/// use rs_pca9685::hal::esp32::Esp32I2c;
///
/// let peripherals = Peripherals::take()?;
/// let config = I2cConfig::new().baudrate(400.kHz().into());
/// let i2c = I2cDriver::new(
///     peripherals.i2c0,
///     peripherals.pins.gpio8,
///     peripherals.pins.gpio9,
///     &config,
/// )?;
/// let bus = Esp32I2c::new(i2c, 0x40);
/// ```
pub struct Esp32I2c<'d> {
    i2c: I2cDriver<'d>,
    address: u8,
}

impl<'d> Esp32I2c<'d> {
    /// Creates a transport for the device at `address` on the given I2C
    /// driver.
    pub fn new(i2c: I2cDriver<'d>, address: u8) -> Self {
        Self { i2c, address }
    }

    /// The 7-bit device address this transport talks to.
    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    #[inline]
    fn timeout() -> u32 {
        TickType::new_millis(BUS_TIMEOUT_MS).ticks()
    }
}

impl PwmBus for Esp32I2c<'_> {
    type Error = EspError;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), EspError> {
        self.i2c.write(self.address, &[reg, value], Self::timeout())
    }

    fn write_block(&mut self, reg: u8, bytes: &[u8]) -> Result<(), EspError> {
        // Register address plus up to one channel's 4 data bytes.
        debug_assert!(bytes.len() <= 4);
        let mut frame = [0u8; 5];
        frame[0] = reg;
        frame[1..=bytes.len()].copy_from_slice(bytes);
        self.i2c
            .write(self.address, &frame[..=bytes.len()], Self::timeout())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, EspError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf, Self::timeout())?;
        Ok(buf[0])
    }

    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), EspError> {
        self.i2c
            .write_read(self.address, &[reg], buf, Self::timeout())
    }
}
