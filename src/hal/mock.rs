//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware traits, enabling
//! development and testing on desktop without a physical PCA9685.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockBus`] | [`PwmBus`] | Records transactions, serves a register image, injects faults |
//! | [`MockDelay`] | [`Delay`] | Records requested sleeps |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::driver::Pca9685;
//! use rs_pca9685::hal::{MockBus, MockDelay, Transaction};
//!
//! let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
//! dev.configure(200).unwrap();
//! dev.bus().clear_log();
//!
//! dev.set_duty(0, 4095).unwrap();
//!
//! // One burst write at LED0_ON_L
//! let log = dev.bus().transactions();
//! assert!(matches!(log[0], Transaction::WriteBlock(0x06, _)));
//! ```
//!
//! [`PwmBus`]: crate::traits::PwmBus
//! [`Delay`]: crate::traits::Delay
//! [`Clock`]: crate::traits::Clock

use core::cell::RefCell;

use crate::traits::{Clock, Delay, PwmBus};

extern crate alloc;
use alloc::vec::Vec;

/// Error type returned by injected [`MockBus`] failures.
///
/// Stands in for the no-ack/timeout class of a real transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusFault;

impl core::fmt::Display for BusFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "simulated bus fault")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BusFault {}

/// One attempted bus operation, failed or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transaction {
    /// Single-register write: (register, value).
    WriteRegister(u8, u8),
    /// Burst write: (start register, bytes).
    WriteBlock(u8, Vec<u8>),
    /// Single-register read.
    ReadRegister(u8),
    /// Burst read: (start register, length).
    ReadBlock(u8, usize),
}

impl Transaction {
    /// Whether this transaction was a write attempt.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Transaction::WriteRegister(..) | Transaction::WriteBlock(..)
        )
    }
}

struct BusState {
    registers: [u8; 256],
    log: Vec<Transaction>,
    /// Write ordinal, 1-based, counted across the life of the log.
    writes_seen: u64,
    /// Remaining scripted write failures (consumed first).
    failing_writes: usize,
    /// Absolute write ordinal scheduled to fail.
    fail_write_ordinal: Option<u64>,
    /// Remaining scripted read failures.
    failing_reads: usize,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            registers: [0; 256],
            log: Vec::new(),
            writes_seen: 0,
            failing_writes: 0,
            fail_write_ordinal: None,
            failing_reads: 0,
        }
    }
}

/// Mock register transport for testing.
///
/// Keeps a full register image so reads observe earlier successful
/// writes, records every attempted transaction (including failed ones),
/// and injects scripted failures to exercise the driver's retry and
/// fatality paths. Inspection and scripting go through `&self` so tests
/// can poke the bus while the driver owns it.
///
/// # Example
///
/// ```rust
/// use rs_pca9685::hal::MockBus;
/// use rs_pca9685::traits::PwmBus;
///
/// let mut bus = MockBus::new();
/// bus.write_block(0x06, &[1, 2, 3, 4]).unwrap();
/// assert_eq!(bus.read_register(0x08).unwrap(), 3);
///
/// bus.fail_next_writes(1);
/// assert!(bus.write_register(0x00, 0).is_err());
/// ```
#[derive(Default)]
pub struct MockBus {
    state: RefCell<BusState>,
}

impl MockBus {
    /// Creates a bus with a zeroed register image and no scripted
    /// failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `count` write attempts to fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.borrow_mut().failing_writes = count;
    }

    /// Scripts the `ordinal`-th write attempt from now (1-based) to
    /// fail.
    pub fn fail_write_at(&self, ordinal: u64) {
        let mut state = self.state.borrow_mut();
        let absolute = state.writes_seen + ordinal;
        state.fail_write_ordinal = Some(absolute);
    }

    /// Scripts the next `count` read attempts to fail.
    pub fn fail_next_reads(&self, count: usize) {
        self.state.borrow_mut().failing_reads = count;
    }

    /// Snapshot of every attempted transaction since the last
    /// [`clear_log`](Self::clear_log).
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.borrow().log.clone()
    }

    /// Number of write attempts in the log, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.state.borrow().log.iter().filter(|t| t.is_write()).count()
    }

    /// Clears the transaction log. The register image survives.
    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Current value of a register in the image.
    pub fn register(&self, reg: u8) -> u8 {
        self.state.borrow().registers[reg as usize]
    }

    /// Seeds a register value, e.g. a power-on default.
    pub fn set_register(&self, reg: u8, value: u8) {
        self.state.borrow_mut().registers[reg as usize] = value;
    }

    fn take_write_failure(state: &mut BusState) -> bool {
        state.writes_seen += 1;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return true;
        }
        if state.fail_write_ordinal == Some(state.writes_seen) {
            state.fail_write_ordinal = None;
            return true;
        }
        false
    }

    fn take_read_failure(state: &mut BusState) -> bool {
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return true;
        }
        false
    }
}

impl PwmBus for MockBus {
    type Error = BusFault;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), BusFault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Transaction::WriteRegister(reg, value));
        if Self::take_write_failure(&mut state) {
            return Err(BusFault);
        }
        state.registers[reg as usize] = value;
        Ok(())
    }

    fn write_block(&mut self, reg: u8, bytes: &[u8]) -> Result<(), BusFault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Transaction::WriteBlock(reg, bytes.to_vec()));
        if Self::take_write_failure(&mut state) {
            return Err(BusFault);
        }
        for (offset, byte) in bytes.iter().enumerate() {
            state.registers[reg as usize + offset] = *byte;
        }
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, BusFault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Transaction::ReadRegister(reg));
        if Self::take_read_failure(&mut state) {
            return Err(BusFault);
        }
        Ok(state.registers[reg as usize])
    }

    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), BusFault> {
        let mut state = self.state.borrow_mut();
        state.log.push(Transaction::ReadBlock(reg, buf.len()));
        if Self::take_read_failure(&mut state) {
            return Err(BusFault);
        }
        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = state.registers[reg as usize + offset];
        }
        Ok(())
    }
}

/// Mock delay that records requested sleeps instead of blocking.
///
/// # Example
///
/// ```rust
/// use rs_pca9685::hal::MockDelay;
/// use rs_pca9685::traits::Delay;
///
/// let mut delay = MockDelay::new();
/// delay.delay_ms(5);
/// delay.delay_ms(10);
/// assert_eq!(delay.sleeps(), &[5, 10]);
/// ```
#[derive(Debug, Default)]
pub struct MockDelay {
    sleeps: Vec<u16>,
}

impl MockDelay {
    /// Creates a delay recorder with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requested sleep durations, in order.
    pub fn sleeps(&self) -> &[u16] {
        &self.sleeps
    }

    /// Total milliseconds requested so far.
    pub fn total_ms(&self) -> u64 {
        self.sleeps.iter().map(|ms| *ms as u64).sum()
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.sleeps.push(ms);
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for time-dependent behavior such
/// as light fades.
///
/// # Example
///
/// ```rust
/// use rs_pca9685::hal::MockClock;
/// use rs_pca9685::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Tests
// ============================================================================
