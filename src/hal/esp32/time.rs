//! ESP32 delay and clock sources.

use crate::traits::{Clock, Delay};
use esp_idf_hal::delay::FreeRtos;

/// FreeRTOS-backed blocking delay.
///
/// Used by the driver for the oscillator settle wait and retry backoff;
/// yields the task instead of busy-waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Delay;

impl Esp32Delay {
    /// Creates a new delay source.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Delay for Esp32Delay {
    #[inline]
    fn delay_ms(&mut self, ms: u16) {
        FreeRtos::delay_ms(ms as u32);
    }
}

/// Millisecond clock over the ESP-IDF microsecond timer.
///
/// Drives light fade interpolation on hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // esp_timer_get_time returns microseconds since boot.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
