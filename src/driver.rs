//! PCA9685 register driver.
//!
//! [`Pca9685`] owns the bus handle for one device and walks the
//! `Uninitialized -> Configured -> Running` state machine: configuration
//! programs MODE1 (auto-increment on, sleep off) and the frequency
//! prescaler, and only a Running driver accepts channel writes.
//!
//! # Overview
//!
//! - Channel updates go out as one 4-byte auto-increment burst so a
//!   partially written ON/OFF pair is never visible on the output.
//! - Transient bus failures on channel writes/reads are retried a bounded
//!   number of times with a short backoff; the prescaler sequence is
//!   never retried, since a partial prescaler write leaves the device
//!   with inconsistent timing.
//! - All validation happens before any bus traffic; nothing is clamped
//!   or wrapped silently.
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::driver::Pca9685;
//! use rs_pca9685::hal::{MockBus, MockDelay};
//!
//! let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
//! dev.configure(200).unwrap();
//!
//! // Half brightness on channel 3 (on phase starts at 0)
//! dev.set_duty(3, 2048).unwrap();
//! assert_eq!(dev.get_duty(3).unwrap(), 2048);
//! ```
//!
//! # Thread Safety
//!
//! The driver is single-writer by construction: every operation takes
//! `&mut self`. For concurrent entities (lights, numbers) updating
//! different channels, wrap the whole driver in `Arc<Mutex<Pca9685<..>>>`
//! so register bursts and the sleep/prescale/wake sequence never
//! interleave.

use log::{debug, warn};

use crate::registers::{self, mode1, CHANNEL_COUNT, DUTY_MAX};
use crate::traits::{Delay, PwmBus};

/// Bounded attempts per channel transfer, including the first one.
pub const RETRY_ATTEMPTS: u8 = 3;

/// Base backoff between retry attempts, doubled per attempt.
pub const RETRY_BACKOFF_MS: u16 = 2;

/// Oscillator settle time after clearing the MODE1 sleep bit.
pub const OSC_SETTLE_MS: u16 = 1;

/// Driver lifecycle state.
///
/// Channel operations are only legal in `Running`; a failed
/// configuration attempt falls back to `Uninitialized`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverState {
    /// No configuration has succeeded yet.
    #[default]
    Uninitialized,
    /// MODE1 and the prescaler are written; the oscillator is waking.
    Configured,
    /// Fully configured, accepting channel writes.
    Running,
}

/// Driver error taxonomy.
///
/// The first three variants are caller bugs or configuration mistakes,
/// rejected before any bus traffic and never retried. `Bus` is the
/// transient class: it surfaces only after the bounded retries are
/// exhausted (or immediately for the unretried prescaler sequence).
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// Channel outside 0..=15.
    InvalidChannel(u8),
    /// Duty count outside 0..=4095. Never wrapped mod 4096.
    InvalidValue(u16),
    /// Frequency whose prescaler falls outside 3..=255.
    InvalidFrequency(u16),
    /// Channel operation on a driver that is not `Running`.
    NotConfigured,
    /// I2C transfer failure (no-ack, timeout) after retries.
    Bus(E),
}

impl<E> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidChannel(ch) => {
                write!(f, "channel {ch} is outside the valid range 0-15")
            }
            Error::InvalidValue(value) => {
                write!(f, "duty value {value} is outside the valid range 0-4095")
            }
            Error::InvalidFrequency(hz) => write!(
                f,
                "frequency {hz} Hz maps outside the valid prescaler range"
            ),
            Error::NotConfigured => write!(f, "device has not been configured"),
            Error::Bus(_) => write!(f, "I2C bus transfer failed"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for Error<E> {}

/// Driver for one PCA9685 device.
///
/// Generic over the register transport and the delay source so the same
/// logic runs against [`crate::hal::mock`] on the desktop and the real
/// I2C peripheral on hardware. One instance per (bus, address) pair;
/// the bus value itself carries the device address.
pub struct Pca9685<B: PwmBus, D: Delay> {
    bus: B,
    delay: D,
    state: DriverState,
}

impl<B: PwmBus, D: Delay> Pca9685<B, D> {
    /// Creates an unconfigured driver around a bus handle.
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            state: DriverState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Whether the driver accepts channel operations.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    /// Borrows the underlying bus (inspection, mostly for tests).
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Consumes the driver, returning the bus and delay handles.
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Programs the shared PWM frequency and brings the device up.
    ///
    /// The prescaler can only be written while the oscillator sleeps, so
    /// the sequence is: MODE1 = AI|SLEEP, PRE_SCALE, MODE1 = AI, settle
    /// delay, MODE1 = AI|RESTART. The frequency is global: re-calling
    /// this on a running driver retunes every channel at once.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFrequency`] when the prescaler would leave
    /// 3..=255 (roughly 24-1526 Hz). Any bus failure mid-sequence is
    /// fatal for the attempt: nothing is retried, the state falls back
    /// to `Uninitialized`, and the caller decides whether to re-run the
    /// whole sequence.
    pub fn configure(&mut self, frequency_hz: u16) -> Result<(), Error<B::Error>> {
        let prescale = registers::prescale_for_frequency(frequency_hz)
            .ok_or(Error::InvalidFrequency(frequency_hz))?;
        debug!("configuring {frequency_hz} Hz (prescale {prescale})");

        self.state = DriverState::Uninitialized;
        match self.configure_sequence(prescale) {
            Ok(()) => {
                self.state = DriverState::Running;
                Ok(())
            }
            Err(err) => {
                warn!("configuration failed mid-sequence, device left unconfigured");
                self.state = DriverState::Uninitialized;
                Err(Error::Bus(err))
            }
        }
    }

    fn configure_sequence(&mut self, prescale: u8) -> Result<(), B::Error> {
        self.bus.write_register(registers::MODE1, mode1::AI | mode1::SLEEP)?;
        self.bus.write_register(registers::PRE_SCALE, prescale)?;
        self.state = DriverState::Configured;
        self.bus.write_register(registers::MODE1, mode1::AI)?;
        self.delay.delay_ms(OSC_SETTLE_MS);
        self.bus.write_register(registers::MODE1, mode1::AI | mode1::RESTART)?;
        Ok(())
    }

    /// Writes one channel's ON/OFF register pair as a single burst.
    ///
    /// `on` is the count at which the output rises within the PWM
    /// period, `off` the count at which it falls. Entities normally keep
    /// `on == 0` and vary only the off point; a non-zero `on` staggers
    /// the phase across channels to spread supply current.
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`], [`Error::InvalidChannel`] and
    /// [`Error::InvalidValue`] are raised before any bus traffic;
    /// [`Error::Bus`] after [`RETRY_ATTEMPTS`] failed transfers.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<B::Error>> {
        self.ensure_running()?;
        Self::check_channel(channel)?;
        Self::check_value(on)?;
        Self::check_value(off)?;
        let bytes = registers::encode(on, off);
        self.write_block_retry(registers::channel_base(channel), &bytes)
    }

    /// Sets a channel's duty cycle with the on phase fixed at 0.
    pub fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), Error<B::Error>> {
        self.set_pwm(channel, 0, duty)
    }

    /// Writes the broadcast ALL_LED registers, updating every channel at
    /// once. Used for global on/off.
    pub fn set_all_pwm(&mut self, on: u16, off: u16) -> Result<(), Error<B::Error>> {
        self.ensure_running()?;
        Self::check_value(on)?;
        Self::check_value(off)?;
        let bytes = registers::encode(on, off);
        self.write_block_retry(registers::ALL_LED_ON_L, &bytes)
    }

    /// Broadcast duty cycle with the on phase fixed at 0.
    pub fn set_all_duty(&mut self, duty: u16) -> Result<(), Error<B::Error>> {
        self.set_all_pwm(0, duty)
    }

    /// Reads back a channel's (on, off) register pair.
    pub fn get_pwm(&mut self, channel: u8) -> Result<(u16, u16), Error<B::Error>> {
        self.ensure_running()?;
        Self::check_channel(channel)?;
        let mut buf = [0u8; 4];
        self.read_block_retry(registers::channel_base(channel), &mut buf)?;
        Ok(registers::decode(buf))
    }

    /// Reads back a channel's duty cycle (the off point).
    pub fn get_duty(&mut self, channel: u8) -> Result<u16, Error<B::Error>> {
        self.get_pwm(channel).map(|(_, off)| off)
    }

    /// Reads the prescaler back and converts it to Hz.
    pub fn frequency(&mut self) -> Result<u16, Error<B::Error>> {
        self.ensure_running()?;
        let prescale = self.read_register_retry(registers::PRE_SCALE)?;
        Ok(registers::frequency_for_prescale(prescale))
    }

    /// Puts the oscillator to sleep (outputs stop).
    ///
    /// The configuration survives; [`wake`](Self::wake) resumes PWM
    /// without reprogramming.
    pub fn sleep(&mut self) -> Result<(), Error<B::Error>> {
        self.ensure_running()?;
        debug!("sleeping the controller");
        let mode = self.read_register_retry(registers::MODE1)?;
        self.write_register_retry(registers::MODE1, mode | mode1::SLEEP)
    }

    /// Wakes the oscillator and waits for it to settle.
    pub fn wake(&mut self) -> Result<(), Error<B::Error>> {
        self.ensure_running()?;
        debug!("waking the controller");
        let mode = self.read_register_retry(registers::MODE1)?;
        self.write_register_retry(registers::MODE1, mode & !mode1::SLEEP)?;
        self.delay.delay_ms(OSC_SETTLE_MS);
        Ok(())
    }

    #[inline]
    fn ensure_running(&self) -> Result<(), Error<B::Error>> {
        if self.state == DriverState::Running {
            Ok(())
        } else {
            Err(Error::NotConfigured)
        }
    }

    #[inline]
    fn check_channel(channel: u8) -> Result<(), Error<B::Error>> {
        if channel < CHANNEL_COUNT {
            Ok(())
        } else {
            Err(Error::InvalidChannel(channel))
        }
    }

    #[inline]
    fn check_value(value: u16) -> Result<(), Error<B::Error>> {
        if value <= DUTY_MAX {
            Ok(())
        } else {
            Err(Error::InvalidValue(value))
        }
    }

    fn write_block_retry(&mut self, reg: u8, bytes: &[u8]) -> Result<(), Error<B::Error>> {
        let mut attempt = 1;
        loop {
            match self.bus.write_block(reg, bytes) {
                Ok(()) => {
                    debug!("wrote {} bytes at register {reg:#04x}", bytes.len());
                    return Ok(());
                }
                Err(err) => {
                    if attempt >= RETRY_ATTEMPTS {
                        warn!("burst write to register {reg:#04x} failed, giving up");
                        return Err(Error::Bus(err));
                    }
                    warn!("burst write to register {reg:#04x} failed (attempt {attempt}/{RETRY_ATTEMPTS})");
                    self.backoff(attempt);
                    attempt += 1;
                }
            }
        }
    }

    fn write_register_retry(&mut self, reg: u8, value: u8) -> Result<(), Error<B::Error>> {
        let mut attempt = 1;
        loop {
            match self.bus.write_register(reg, value) {
                Ok(()) => {
                    debug!("wrote {value:#04x} to register {reg:#04x}");
                    return Ok(());
                }
                Err(err) => {
                    if attempt >= RETRY_ATTEMPTS {
                        return Err(Error::Bus(err));
                    }
                    warn!("write to register {reg:#04x} failed (attempt {attempt}/{RETRY_ATTEMPTS})");
                    self.backoff(attempt);
                    attempt += 1;
                }
            }
        }
    }

    fn read_register_retry(&mut self, reg: u8) -> Result<u8, Error<B::Error>> {
        let mut attempt = 1;
        loop {
            match self.bus.read_register(reg) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= RETRY_ATTEMPTS {
                        return Err(Error::Bus(err));
                    }
                    warn!("read of register {reg:#04x} failed (attempt {attempt}/{RETRY_ATTEMPTS})");
                    self.backoff(attempt);
                    attempt += 1;
                }
            }
        }
    }

    fn read_block_retry(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<B::Error>> {
        let mut attempt = 1;
        loop {
            match self.bus.read_block(reg, buf) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if attempt >= RETRY_ATTEMPTS {
                        return Err(Error::Bus(err));
                    }
                    warn!("block read at register {reg:#04x} failed (attempt {attempt}/{RETRY_ATTEMPTS})");
                    self.backoff(attempt);
                    attempt += 1;
                }
            }
        }
    }

    /// Doubling backoff: 2ms after the first failure, 4ms after the
    /// second, and so on.
    fn backoff(&mut self, attempt: u8) {
        self.delay.delay_ms(RETRY_BACKOFF_MS << (attempt - 1));
    }
}

// ============================================================================
// Tests
// ============================================================================
