//! ESP32 PCA9685 hardware smoke test.
//!
//! Brings up the device on the I2C pins below, allocates the first free
//! channel, and fades a light up and down forever. Useful for verifying
//! wiring and the configured PWM frequency before the real host
//! integration takes over.
//!
//! # Hardware Setup
//!
//! - SDA → GPIO8
//! - SCL → GPIO9
//! - PCA9685 at the default address 0x40, LED (or scope) on channel 0
//!
//! # Build
//!
//! ```bash
//! cargo build --features esp32 --bin esp32_main
//! ```

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use rs_pca9685::config::{DeviceConfig, LightConfig};
use rs_pca9685::hal::esp32::{Esp32Clock, Esp32Delay, Esp32I2c};
use rs_pca9685::traits::Clock;
use rs_pca9685::{LightOutput, Pca9685, PinAllocator};

/// Fade duration for each ramp direction.
const FADE_MS: u32 = 2000;

/// Fade step interval (matches the host integration's transition step).
const TICK_MS: u32 = 150;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();

    println!();
    println!("==============================");
    println!("  rs-pca9685 hardware check");
    println!("==============================");
    println!();

    let device = DeviceConfig::default();
    device.validate()?;

    let peripherals = Peripherals::take()?;
    let i2c_config = I2cConfig::new().baudrate(400.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &i2c_config,
    )?;

    let mut dev = Pca9685::new(Esp32I2c::new(i2c, device.address), Esp32Delay::new());
    dev.configure(device.frequency_hz)
        .map_err(|err| anyhow::anyhow!("device configuration failed: {err}"))?;
    println!(
        "[PCA9685] Configured at {} Hz (address 0x{:02X})",
        device.frequency_hz, device.address
    );

    let mut pins = PinAllocator::new();
    let pin = pins
        .allocate(None)
        .map_err(|err| anyhow::anyhow!("no channel available: {err}"))?;
    println!("[PCA9685] Driving channel {pin}");

    let clock = Esp32Clock::new();
    let mut light = LightOutput::new(&LightConfig::default().with_name("smoke-test").with_pin(pin));

    let mut target: u8 = 255;
    loop {
        light
            .start_fade(&mut dev, target, FADE_MS, clock.now_ms())
            .map_err(|err| anyhow::anyhow!("fade start failed: {err}"))?;

        while light
            .tick(&mut dev, clock.now_ms())
            .map_err(|err| anyhow::anyhow!("fade step failed: {err}"))?
        {
            FreeRtos::delay_ms(TICK_MS);
        }

        println!("[PCA9685] Channel {pin} at brightness {target}");
        target = if target == 0 { 255 } else { 0 };
        FreeRtos::delay_ms(500);
    }
}
