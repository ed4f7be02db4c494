//! Integration tests for the PCA9685 driver

use rs_pca9685::{
    hal::{MockBus, MockDelay, Transaction},
    DriverError, DriverState, NumberConfig, NumberOutput, Pca9685, PinAllocator,
};

fn running_driver() -> Pca9685<MockBus, MockDelay> {
    let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
    dev.configure(200).unwrap();
    dev.bus().clear_log();
    dev
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn frequency_200_hz_programs_prescale_30() {
    let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
    dev.configure(200).unwrap();

    let prescale_writes: Vec<_> = dev
        .bus()
        .transactions()
        .into_iter()
        .filter(|t| matches!(t, Transaction::WriteRegister(0xFE, _)))
        .collect();
    assert_eq!(prescale_writes, vec![Transaction::WriteRegister(0xFE, 30)]);
}

#[test]
fn configure_sleeps_before_prescale_and_wakes_after() {
    let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
    dev.configure(200).unwrap();

    let log = dev.bus().transactions();
    let prescale_pos = log
        .iter()
        .position(|t| matches!(t, Transaction::WriteRegister(0xFE, _)))
        .unwrap();
    // MODE1 sleep entry before the prescaler, wake after
    assert!(matches!(
        log[prescale_pos - 1],
        Transaction::WriteRegister(0x00, mode) if mode & 0x10 != 0
    ));
    assert!(matches!(
        log[prescale_pos + 1],
        Transaction::WriteRegister(0x00, mode) if mode & 0x10 == 0
    ));
}

#[test]
fn out_of_range_frequencies_are_invalid_configuration() {
    let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
    for hz in [0u16, 1, 23, 1750, 20_000] {
        assert_eq!(
            dev.configure(hz),
            Err(DriverError::InvalidFrequency(hz)),
            "{hz} Hz"
        );
    }
    assert!(dev.bus().transactions().is_empty());
}

#[test]
fn failed_configuration_leaves_driver_unusable() {
    let bus = MockBus::new();
    bus.fail_next_writes(1);
    let mut dev = Pca9685::new(bus, MockDelay::new());

    assert!(matches!(dev.configure(200), Err(DriverError::Bus(_))));
    assert_eq!(dev.state(), DriverState::Uninitialized);
    // The sequence is never retried: one failed write, nothing after it.
    assert_eq!(dev.bus().write_attempts(), 1);
}

// ============================================================================
// Channel Writes
// ============================================================================

#[test]
fn channel_write_is_a_single_burst() {
    let mut dev = running_driver();
    dev.set_duty(0, 4095).unwrap();

    let log = dev.bus().transactions();
    assert_eq!(log.len(), 1);
    // LED0_ON_L burst: on = 0, off = 4095
    assert_eq!(
        log[0],
        Transaction::WriteBlock(0x06, vec![0x00, 0x00, 0xFF, 0x0F])
    );
}

#[test]
fn duty_zero_sets_the_full_off_flag() {
    let mut dev = running_driver();
    dev.set_duty(2, 0).unwrap();
    assert_eq!(
        dev.bus().transactions()[0],
        Transaction::WriteBlock(0x0E, vec![0x00, 0x00, 0x00, 0x10])
    );
}

#[test]
fn invalid_channel_reaches_no_bus_traffic() {
    let mut dev = running_driver();

    assert_eq!(dev.set_pwm(16, 0, 100), Err(DriverError::InvalidChannel(16)));
    assert_eq!(
        dev.set_pwm(255, 0, 100),
        Err(DriverError::InvalidChannel(255))
    );
    assert!(dev.bus().transactions().is_empty());
}

#[test]
fn out_of_range_duty_is_an_error_not_a_wrap() {
    let mut dev = running_driver();

    // 4097 would silently become 1 under a mod-4096 wrap
    assert_eq!(dev.set_duty(0, 4097), Err(DriverError::InvalidValue(4097)));
    assert!(dev.bus().transactions().is_empty());
}

#[test]
fn set_all_pwm_drives_every_channel_at_once() {
    let mut dev = running_driver();
    dev.set_all_duty(1024).unwrap();

    assert_eq!(
        dev.bus().transactions()[0],
        Transaction::WriteBlock(0xFA, vec![0x00, 0x00, 0x00, 0x04])
    );
}

#[test]
fn writes_before_configuration_are_rejected() {
    let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
    assert_eq!(dev.set_duty(0, 100), Err(DriverError::NotConfigured));
    assert_eq!(dev.set_all_duty(100), Err(DriverError::NotConfigured));
    assert!(dev.bus().transactions().is_empty());
}

// ============================================================================
// Retry Semantics
// ============================================================================

#[test]
fn two_transient_failures_recover() {
    let mut dev = running_driver();
    dev.bus().fail_next_writes(2);

    dev.set_duty(0, 500).unwrap();
    assert_eq!(dev.bus().write_attempts(), 3);
    assert_eq!(dev.get_duty(0).unwrap(), 500);
}

#[test]
fn three_timeouts_surface_bus_error_after_exactly_three_attempts() {
    let mut dev = running_driver();
    dev.bus().fail_next_writes(3);

    assert!(matches!(dev.set_duty(0, 500), Err(DriverError::Bus(_))));
    // Exactly the retry bound, zero attempts beyond it.
    assert_eq!(dev.bus().write_attempts(), 3);
}

#[test]
fn retries_back_off_between_attempts() {
    let mut dev = running_driver();
    dev.bus().fail_next_writes(3);
    let _ = dev.set_duty(0, 500);

    let (_, delay) = dev.into_parts();
    // configure() settle, then a backoff after each of the first two
    // failures; none after the final attempt.
    assert_eq!(delay.sleeps().len(), 3);
}

#[test]
fn failure_budget_resets_per_operation() {
    let mut dev = running_driver();
    dev.bus().fail_next_writes(2);
    dev.set_duty(0, 100).unwrap();

    dev.bus().fail_next_writes(2);
    dev.set_duty(1, 200).unwrap();
    assert_eq!(dev.get_duty(1).unwrap(), 200);
}

// ============================================================================
// Read-Back
// ============================================================================

#[test]
fn written_pairs_read_back_exactly() {
    let mut dev = running_driver();
    for &(channel, on, off) in &[(0u8, 0u16, 0u16), (5, 0, 2048), (15, 4095, 0), (7, 10, 4000)] {
        dev.set_pwm(channel, on, off).unwrap();
        assert_eq!(dev.get_pwm(channel).unwrap(), (on, off));
    }
}

#[test]
fn frequency_reads_back_within_prescaler_quantization() {
    for hz in [50u16, 100, 200, 1000] {
        let mut dev = Pca9685::new(MockBus::new(), MockDelay::new());
        dev.configure(hz).unwrap();
        let back = dev.frequency().unwrap();
        let err = (back as i32 - hz as i32).unsigned_abs();
        assert!(err * 20 <= hz as u32, "hz={hz} back={back}");
    }
}

// ============================================================================
// End-to-End Data Flow
// ============================================================================

#[test]
fn entity_flow_allocate_normalize_write() {
    // A configured entity asks the allocator for a pin, converts its
    // logical value, and writes the duty to its channel.
    let mut dev = running_driver();
    let mut pins = PinAllocator::new();

    let pin = pins.allocate(Some(4)).unwrap();
    let config = NumberConfig::default()
        .with_pin(pin)
        .with_range(0.0, 100.0)
        .with_normalize(10.0, 60.0);
    let mut output = NumberOutput::new(&config).unwrap();

    output.set_value(&mut dev, 60.0).unwrap();
    assert_eq!(dev.get_duty(pin).unwrap(), 4095);

    output.set_value(&mut dev, 5.0).unwrap();
    assert_eq!(dev.get_duty(pin).unwrap(), 0);

    pins.release(pin);
    assert!(pins.is_free(pin));
}
