//! Entity-facing channel outputs.
//!
//! The host integration exposes two kinds of entities over a PCA9685
//! channel, modeled as a closed tagged variant instead of open
//! subclassing:
//!
//! - [`LightOutput`]: a dimmable light with 0..=255 brightness and
//!   optional linear fade transitions.
//! - [`NumberOutput`]: a numeric output whose logical value maps through
//!   a configurable [`Normalizer`](crate::normalize::Normalizer).
//!
//! Outputs do not own the driver: every operation borrows it, so any
//! number of outputs can share one `Pca9685` (behind a mutex when
//! threads are involved). Driver errors pass through unchanged; the
//! entity layer marks itself unavailable instead of crashing.
//!
//! # Example
//!
//! ```rust
//! use rs_pca9685::config::LightConfig;
//! use rs_pca9685::driver::Pca9685;
//! use rs_pca9685::hal::{MockBus, MockDelay};
//! use rs_pca9685::outputs::LightOutput;
//!
//! let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
//! dev.configure(200).unwrap();
//!
//! let mut light = LightOutput::new(&LightConfig::default().with_pin(2));
//! light.set_brightness(&mut dev, 128).unwrap();
//! light.turn_on(&mut dev).unwrap();
//! assert_eq!(dev.get_duty(2).unwrap(), 2056);
//! ```

use crate::config::{LightConfig, NumberConfig, ShortString};
use crate::driver::{Error, Pca9685};
use crate::normalize::{NormalizeError, Normalizer};
use crate::traits::{Delay, PwmBus};

/// Brightness ceiling of the light domain.
pub const BRIGHTNESS_MAX: u8 = 255;

/// An in-progress linear fade between two duty counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveFade {
    from: u16,
    to: u16,
    started_ms: u64,
    duration_ms: u32,
}

impl ActiveFade {
    /// Duty at `now_ms`, linearly interpolated and exact at both ends.
    fn duty_at(&self, now_ms: u64) -> u16 {
        if self.duration_ms == 0 || now_ms >= self.started_ms + self.duration_ms as u64 {
            return self.to;
        }
        let elapsed = now_ms.saturating_sub(self.started_ms) as f64;
        let progress = elapsed / self.duration_ms as f64;
        let delta = self.to as f64 - self.from as f64;
        (self.from as f64 + delta * progress) as u16
    }

    fn is_done(&self, now_ms: u64) -> bool {
        now_ms >= self.started_ms + self.duration_ms as u64
    }
}

// ============================================================================
// Light
// ============================================================================

/// A dimmable single-channel light.
///
/// Brightness 0..=255 maps linearly onto the full 0..=4095 duty range
/// (255 lands exactly on 4095). Fades step the duty linearly between the
/// current and target brightness; the caller drives them by calling
/// [`tick`](Self::tick) from its scheduler.
#[derive(Clone, Debug)]
pub struct LightOutput {
    name: ShortString,
    channel: u8,
    brightness: u8,
    is_on: bool,
    normalizer: Normalizer,
    fade: Option<ActiveFade>,
}

impl LightOutput {
    /// Creates a light on the configured channel, initially off at full
    /// brightness.
    pub fn new(config: &LightConfig) -> Self {
        // 0..=255 over the full duty range never fails validation.
        let normalizer = Normalizer::full_range(0.0, BRIGHTNESS_MAX as f64, false)
            .unwrap_or_else(|_| unreachable!());
        Self {
            name: config.name.clone(),
            channel: config.pin,
            brightness: BRIGHTNESS_MAX,
            is_on: false,
            normalizer,
            fade: None,
        }
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Assigned channel.
    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Current brightness setting (kept across off periods).
    #[inline]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Whether the light is logically on.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Whether a fade is in progress.
    #[inline]
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Duty count for a brightness level.
    pub fn duty_for_brightness(&self, brightness: u8) -> u16 {
        self.normalizer.to_duty(brightness as f64)
    }

    /// Turns the light on at its current brightness.
    ///
    /// Cancels any running fade.
    pub fn turn_on<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
    ) -> Result<(), Error<B::Error>> {
        self.fade = None;
        driver.set_duty(self.channel, self.duty_for_brightness(self.brightness))?;
        self.is_on = true;
        Ok(())
    }

    /// Turns the light off. Brightness is retained for the next turn-on.
    pub fn turn_off<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
    ) -> Result<(), Error<B::Error>> {
        self.fade = None;
        driver.set_duty(self.channel, 0)?;
        self.is_on = false;
        Ok(())
    }

    /// Sets the brightness, writing it out when the light is on.
    pub fn set_brightness<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
        brightness: u8,
    ) -> Result<(), Error<B::Error>> {
        self.brightness = brightness;
        if self.is_on {
            self.fade = None;
            driver.set_duty(self.channel, self.duty_for_brightness(brightness))?;
        }
        Ok(())
    }

    /// Starts a linear fade to `target` brightness over `duration_ms`.
    ///
    /// The fade starts from whatever duty the channel currently carries
    /// (read back from the device), so it picks up cleanly from an
    /// interrupted fade. A fade to the current duty, or with zero
    /// duration, completes immediately.
    pub fn start_fade<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
        target: u8,
        duration_ms: u32,
        now_ms: u64,
    ) -> Result<(), Error<B::Error>> {
        let from = driver.get_duty(self.channel)?;
        let to = self.duty_for_brightness(target);
        self.brightness = target;
        if from == to || duration_ms == 0 {
            driver.set_duty(self.channel, to)?;
            self.is_on = to > 0;
            self.fade = None;
            return Ok(());
        }
        self.fade = Some(ActiveFade {
            from,
            to,
            started_ms: now_ms,
            duration_ms,
        });
        self.is_on = true;
        Ok(())
    }

    /// Advances a running fade, writing the interpolated duty.
    ///
    /// Returns `true` while the fade is still in progress. Safe to call
    /// with no fade active.
    pub fn tick<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
        now_ms: u64,
    ) -> Result<bool, Error<B::Error>> {
        let Some(fade) = self.fade else {
            return Ok(false);
        };
        driver.set_duty(self.channel, fade.duty_at(now_ms))?;
        if fade.is_done(now_ms) {
            self.is_on = fade.to > 0;
            self.fade = None;
            return Ok(false);
        }
        Ok(true)
    }
}

// ============================================================================
// Number
// ============================================================================

/// A numeric output over one channel.
///
/// Carries its own [`Normalizer`] built from the entity configuration;
/// setting a value clamps it to the configured domain, maps it through
/// the normalization ramp, and writes the resulting duty.
#[derive(Clone, Debug)]
pub struct NumberOutput {
    name: ShortString,
    channel: u8,
    step: f64,
    value: f64,
    normalizer: Normalizer,
}

impl NumberOutput {
    /// Creates a number output from its configuration.
    ///
    /// # Errors
    ///
    /// [`NormalizeError`] for degenerate normalize bounds or an empty
    /// domain, surfaced at configuration time.
    pub fn new(config: &NumberConfig) -> Result<Self, NormalizeError> {
        let normalizer = config.normalizer()?;
        Ok(Self {
            name: config.name.clone(),
            channel: config.pin,
            step: config.step,
            value: config.minimum,
            normalizer,
        })
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Assigned channel.
    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// UI step size in logical units.
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Last value set (clamped to the domain), the domain minimum before
    /// any set.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the duty output is inverted.
    #[inline]
    pub fn invert(&self) -> bool {
        self.normalizer.invert()
    }

    /// The value normalizer in use.
    #[inline]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Sets a new logical value, writing the normalized duty.
    ///
    /// The value is clamped to the configured domain before mapping, so
    /// the recorded state matches what the output carries.
    pub fn set_value<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
        value: f64,
    ) -> Result<(), Error<B::Error>> {
        let (min, max) = self.normalizer.domain();
        let clamped = value.clamp(min, max);
        driver.set_duty(self.channel, self.normalizer.to_duty(clamped))?;
        self.value = clamped;
        Ok(())
    }

    /// Restores the logical value from the duty the device carries.
    ///
    /// Used after a restart to resynchronize entity state; exact within
    /// one duty count of quantization for values inside the ramp.
    pub fn sync_from_device<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
    ) -> Result<f64, Error<B::Error>> {
        let duty = driver.get_duty(self.channel)?;
        self.value = self.normalizer.from_duty(duty);
        Ok(self.value)
    }
}

// ============================================================================
// Tagged variant
// ============================================================================

/// A configured channel entity of either kind.
///
/// Closed variant over the two entity kinds the integration supports;
/// the configuration layer matches on it instead of dispatching over
/// open-ended subclasses.
#[derive(Clone, Debug)]
pub enum PwmOutput {
    /// Dimmable light.
    Light(LightOutput),
    /// Numeric output.
    Number(NumberOutput),
}

impl PwmOutput {
    /// Entity name.
    pub fn name(&self) -> &str {
        match self {
            PwmOutput::Light(light) => light.name(),
            PwmOutput::Number(number) => number.name(),
        }
    }

    /// Assigned channel.
    pub fn channel(&self) -> u8 {
        match self {
            PwmOutput::Light(light) => light.channel(),
            PwmOutput::Number(number) => number.channel(),
        }
    }

    /// Drives the channel to its inactive level.
    ///
    /// Duty 0 for lights; the domain minimum for numbers (which is duty
    /// 4095 when inverted).
    pub fn shut_off<B: PwmBus, D: Delay>(
        &mut self,
        driver: &mut Pca9685<B, D>,
    ) -> Result<(), Error<B::Error>> {
        match self {
            PwmOutput::Light(light) => light.turn_off(driver),
            PwmOutput::Number(number) => {
                let (min, _) = number.normalizer.domain();
                number.set_value(driver, min)
            }
        }
    }
}

impl From<LightOutput> for PwmOutput {
    fn from(light: LightOutput) -> Self {
        PwmOutput::Light(light)
    }
}

impl From<NumberOutput> for PwmOutput {
    fn from(number: NumberOutput) -> Self {
        PwmOutput::Number(number)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockBus, MockDelay};

    fn running_driver() -> Pca9685<MockBus, MockDelay> {
        let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
        dev.configure(200).unwrap();
        dev.bus().clear_log();
        dev
    }

    // =========================================================================
    // LightOutput Tests
    // =========================================================================

    #[test]
    fn light_turn_on_writes_full_brightness_by_default() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(2));

        light.turn_on(&mut dev).unwrap();
        assert!(light.is_on());
        assert_eq!(dev.get_duty(2).unwrap(), 4095);
    }

    #[test]
    fn light_brightness_maps_full_range() {
        let light = LightOutput::new(&LightConfig::default());
        assert_eq!(light.duty_for_brightness(0), 0);
        assert_eq!(light.duty_for_brightness(255), 4095);
        assert_eq!(light.duty_for_brightness(128), 2056); // round(128/255*4095)
    }

    #[test]
    fn light_turn_off_retains_brightness() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(1));

        light.set_brightness(&mut dev, 40).unwrap();
        light.turn_on(&mut dev).unwrap();
        light.turn_off(&mut dev).unwrap();

        assert!(!light.is_on());
        assert_eq!(dev.get_duty(1).unwrap(), 0);
        assert_eq!(light.brightness(), 40);
    }

    #[test]
    fn light_set_brightness_only_writes_while_on() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(0));

        light.set_brightness(&mut dev, 10).unwrap();
        assert!(dev.bus().transactions().is_empty());

        light.turn_on(&mut dev).unwrap();
        light.set_brightness(&mut dev, 20).unwrap();
        assert_eq!(dev.get_duty(0).unwrap(), light.duty_for_brightness(20));
    }

    // =========================================================================
    // Fade Tests
    // =========================================================================

    #[test]
    fn fade_steps_linearly_and_completes() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));

        light.start_fade(&mut dev, 255, 1000, 0).unwrap();
        assert!(light.is_fading());

        assert!(light.tick(&mut dev, 500).unwrap());
        let midway = dev.get_duty(3).unwrap();
        assert!((2000..=2100).contains(&midway), "midway={midway}");

        assert!(!light.tick(&mut dev, 1000).unwrap());
        assert_eq!(dev.get_duty(3).unwrap(), 4095);
        assert!(light.is_on());
        assert!(!light.is_fading());
    }

    #[test]
    fn fade_to_zero_ends_off() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));
        light.turn_on(&mut dev).unwrap();

        light.start_fade(&mut dev, 0, 400, 100).unwrap();
        assert!(light.tick(&mut dev, 300).unwrap());
        assert!(!light.tick(&mut dev, 500).unwrap());

        assert_eq!(dev.get_duty(3).unwrap(), 0);
        assert!(!light.is_on());
    }

    #[test]
    fn fade_with_no_change_completes_immediately() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));
        light.turn_on(&mut dev).unwrap();

        light.start_fade(&mut dev, 255, 1000, 0).unwrap();
        assert!(!light.is_fading());
    }

    #[test]
    fn zero_duration_fade_jumps_to_target() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));

        light.start_fade(&mut dev, 100, 0, 0).unwrap();
        assert!(!light.is_fading());
        assert_eq!(dev.get_duty(3).unwrap(), light.duty_for_brightness(100));
    }

    #[test]
    fn new_fade_replaces_running_fade() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));

        light.start_fade(&mut dev, 255, 1000, 0).unwrap();
        light.tick(&mut dev, 500).unwrap();

        // Interrupt mid-ramp with a fade back down; it starts from the
        // duty the channel actually carries.
        light.start_fade(&mut dev, 0, 1000, 500).unwrap();
        assert!(light.tick(&mut dev, 1000).unwrap());
        let duty = dev.get_duty(3).unwrap();
        assert!(duty < 2100, "duty={duty}");

        assert!(!light.tick(&mut dev, 1500).unwrap());
        assert_eq!(dev.get_duty(3).unwrap(), 0);
    }

    #[test]
    fn tick_without_fade_is_quiet() {
        let mut dev = running_driver();
        let mut light = LightOutput::new(&LightConfig::default().with_pin(3));
        assert!(!light.tick(&mut dev, 123).unwrap());
        assert!(dev.bus().transactions().is_empty());
    }

    // =========================================================================
    // NumberOutput Tests
    // =========================================================================

    #[test]
    fn number_starts_at_domain_minimum() {
        let number = NumberOutput::new(&NumberConfig::default()).unwrap();
        assert_eq!(number.value(), 0.0);
    }

    #[test]
    fn number_set_value_normalizes() {
        let mut dev = running_driver();
        let config = NumberConfig::default()
            .with_pin(5)
            .with_range(0.0, 100.0)
            .with_normalize(10.0, 60.0);
        let mut number = NumberOutput::new(&config).unwrap();

        number.set_value(&mut dev, 35.0).unwrap();
        assert_eq!(dev.get_duty(5).unwrap(), 2048);
        assert_eq!(number.value(), 35.0);
    }

    #[test]
    fn number_clamps_out_of_domain_values() {
        let mut dev = running_driver();
        let mut number = NumberOutput::new(&NumberConfig::default().with_pin(5)).unwrap();

        number.set_value(&mut dev, 150.0).unwrap();
        assert_eq!(number.value(), 100.0);
        assert_eq!(dev.get_duty(5).unwrap(), 4095);
    }

    #[test]
    fn inverted_number_mirrors_duty() {
        let mut dev = running_driver();
        let config = NumberConfig::default().with_pin(5).with_invert(true);
        let mut number = NumberOutput::new(&config).unwrap();

        number.set_value(&mut dev, 0.0).unwrap();
        assert_eq!(dev.get_duty(5).unwrap(), 4095);
        number.set_value(&mut dev, 100.0).unwrap();
        assert_eq!(dev.get_duty(5).unwrap(), 0);
    }

    #[test]
    fn number_rejects_bad_config() {
        let config = NumberConfig::default().with_normalize(50.0, 50.0);
        assert!(NumberOutput::new(&config).is_err());
    }

    #[test]
    fn number_sync_from_device_round_trips() {
        let mut dev = running_driver();
        let config = NumberConfig::default()
            .with_pin(6)
            .with_normalize(10.0, 60.0);
        let mut number = NumberOutput::new(&config).unwrap();

        number.set_value(&mut dev, 42.0).unwrap();
        let restored = number.sync_from_device(&mut dev).unwrap();
        assert!((restored - 42.0).abs() <= number.normalizer().quantization_step());
    }

    // =========================================================================
    // PwmOutput Tests
    // =========================================================================

    #[test]
    fn tagged_variant_dispatches() {
        let light: PwmOutput = LightOutput::new(&LightConfig::default().with_pin(1)).into();
        let number: PwmOutput =
            NumberOutput::new(&NumberConfig::default().with_pin(2).with_name("flow"))
                .unwrap()
                .into();

        assert_eq!(light.channel(), 1);
        assert_eq!(number.channel(), 2);
        assert_eq!(number.name(), "flow");
    }

    #[test]
    fn shut_off_drives_inactive_level() {
        let mut dev = running_driver();

        let mut light: PwmOutput = LightOutput::new(&LightConfig::default().with_pin(0)).into();
        light.shut_off(&mut dev).unwrap();
        assert_eq!(dev.get_duty(0).unwrap(), 0);

        // Inverted number: inactive (minimum) is full duty
        let config = NumberConfig::default().with_pin(1).with_invert(true);
        let mut number: PwmOutput = NumberOutput::new(&config).unwrap().into();
        number.shut_off(&mut dev).unwrap();
        assert_eq!(dev.get_duty(1).unwrap(), 4095);
    }
}
