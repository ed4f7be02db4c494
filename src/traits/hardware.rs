//! Hardware abstraction traits for the PCA9685 register transport.
//!
//! This module defines the interfaces that allow the driver core to work
//! across different platforms (ESP32, desktop mocks, etc.).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PwmBus`] | Byte-level register transport to one device |
//! | [`Delay`] | Blocking millisecond delay for settle/backoff timing |
//! | [`Clock`] | Time source for fade transitions |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::traits::PwmBus;
//! use rs_pca9685::hal::MockBus;
//!
//! let mut bus = MockBus::new();
//! bus.write_register(0x00, 0x20).unwrap();
//! assert_eq!(bus.read_register(0x00).unwrap(), 0x20);
//! ```

/// Register transport to a single PCA9685 device.
///
/// An implementation owns whatever identifies the physical device (the
/// I2C peripheral plus the 7-bit address); one bus value addresses
/// exactly one device. Two driver instances must not share one (bus,
/// address) pair without external synchronization.
///
/// # Implementation Notes
///
/// - `write_block` must issue a single bus transaction so the device's
///   auto-increment mode applies the bytes as one burst. Splitting it
///   into per-register writes makes partial channel updates visible as
///   flicker.
/// - No operation may block indefinitely: a transfer that cannot
///   complete fails with `Self::Error` after a bounded timeout.
pub trait PwmBus {
    /// Error type for failed transfers (no-ack, timeout).
    type Error;

    /// Write one byte to a register.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error>;

    /// Write consecutive bytes starting at `reg` as a single burst.
    fn write_block(&mut self, reg: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read one byte from a register.
    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error>;

    /// Read consecutive bytes starting at `reg` into `buf`.
    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Blocking millisecond delay source.
///
/// The driver needs two kinds of waits: the oscillator settle time after
/// clearing the MODE1 sleep bit, and the backoff between bus write
/// retries. On desktop this wraps `std::thread::sleep`; on embedded, the
/// RTOS delay.
pub trait Delay {
    /// Block the calling thread/task for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u16);
}

/// Monotonic time source in milliseconds.
///
/// Used by light fade transitions for progress interpolation. On
/// desktop, wrap `std::time::Instant`; on embedded, a hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_pca9685::traits::Clock;
/// use rs_pca9685::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
