//! # GPIO Actuation
//!
//! Binary output lines used by the TNC: carrier-detect LEDs, push-to-talk
//! and status indicators. Unassigned pins are represented as `None` and are
//! never touched.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, TncError};

/// Highest GPIO number on the reference board
pub const MAX_GPIO_PIN: u8 = 39;

/// GPIO number
pub type PinNumber = u8;

/// Electrical output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Actively driven high and low
    PushPull,
    /// Driven low, floats when high
    OpenDrain,
    /// Input and output disabled (high impedance)
    Disabled,
}

/// Level at which an indicator is lit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveLevel {
    /// Lit when the line is driven high
    High,
    /// Lit when the line is pulled low
    Low,
}

impl ActiveLevel {
    /// Line level that turns the indicator on
    pub fn on_level(self) -> bool {
        matches!(self, ActiveLevel::High)
    }

    /// Line level that turns the indicator off
    pub fn off_level(self) -> bool {
        !self.on_level()
    }

    /// Output mode: open drain for active-low indicators, push-pull otherwise
    pub fn output_mode(self) -> PinMode {
        match self {
            ActiveLevel::High => PinMode::PushPull,
            ActiveLevel::Low => PinMode::OpenDrain,
        }
    }
}

/// An indicator output with its polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IndicatorPin {
    pub pin: PinNumber,
    pub active: ActiveLevel,
}

/// GPIO driver used by the TNC
#[cfg_attr(test, mockall::automock)]
pub trait Gpio: Send + Sync {
    /// Return a pin to its power-on state
    fn reset(&self, pin: PinNumber) -> Result<()>;

    /// Configure the pin direction / drive
    fn set_mode(&self, pin: PinNumber, mode: PinMode) -> Result<()>;

    /// Drive the pin high (`true`) or low (`false`)
    fn set_level(&self, pin: PinNumber, high: bool) -> Result<()>;
}

/// Bring an indicator to its idle (off) state
///
/// Open drain for active-low indicators, push-pull otherwise. Does nothing
/// for an unassigned pin.
pub fn configure_indicator(gpio: &dyn Gpio, indicator: Option<IndicatorPin>) -> Result<()> {
    let Some(indicator) = indicator else {
        return Ok(());
    };

    gpio.reset(indicator.pin)?;
    gpio.set_mode(indicator.pin, indicator.active.output_mode())?;
    gpio.set_level(indicator.pin, indicator.active.off_level())
}

/// Configure a push-pull output driven low
///
/// Used for PTT (receive state) and status LEDs. Does nothing for an
/// unassigned pin.
pub fn configure_output_low(gpio: &dyn Gpio, pin: Option<PinNumber>) -> Result<()> {
    let Some(pin) = pin else {
        return Ok(());
    };

    gpio.reset(pin)?;
    gpio.set_mode(pin, PinMode::PushPull)?;
    gpio.set_level(pin, false)
}

/// Put a pin into high impedance so it does not load a shared line
pub fn disable_pin(gpio: &dyn Gpio, pin: PinNumber) -> Result<()> {
    gpio.reset(pin)?;
    gpio.set_mode(pin, PinMode::Disabled)
}

/// Host-side GPIO bank
///
/// Tracks the mode and level of every pin it is asked to drive and logs each
/// change. Used when the TNC core runs without real hardware.
#[derive(Debug, Default)]
pub struct SimulatedGpio {
    pins: Mutex<HashMap<PinNumber, (PinMode, bool)>>,
}

impl SimulatedGpio {
    /// Create an empty GPIO bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of a configured pin
    pub fn level(&self, pin: PinNumber) -> Option<bool> {
        self.lock().get(&pin).map(|&(_, level)| level)
    }

    /// Current mode of a configured pin
    pub fn mode(&self, pin: PinNumber) -> Option<PinMode> {
        self.lock().get(&pin).map(|&(mode, _)| mode)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PinNumber, (PinMode, bool)>> {
        // Pin state stays consistent even if a holder panicked
        self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_pin(pin: PinNumber) -> Result<()> {
        if pin > MAX_GPIO_PIN {
            return Err(TncError::Gpio(format!(
                "GPIO {} out of range (0-{})",
                pin, MAX_GPIO_PIN
            )));
        }
        Ok(())
    }
}

impl Gpio for SimulatedGpio {
    fn reset(&self, pin: PinNumber) -> Result<()> {
        Self::check_pin(pin)?;
        self.lock().insert(pin, (PinMode::Disabled, false));
        debug!("gpio {}: reset", pin);
        Ok(())
    }

    fn set_mode(&self, pin: PinNumber, mode: PinMode) -> Result<()> {
        Self::check_pin(pin)?;
        let mut pins = self.lock();
        let entry = pins.entry(pin).or_insert((PinMode::Disabled, false));
        entry.0 = mode;
        debug!("gpio {}: mode {:?}", pin, mode);
        Ok(())
    }

    fn set_level(&self, pin: PinNumber, high: bool) -> Result<()> {
        Self::check_pin(pin)?;
        let mut pins = self.lock();
        let entry = pins.entry(pin).or_insert((PinMode::Disabled, false));
        if entry.0 == PinMode::Disabled {
            return Err(TncError::Gpio(format!("GPIO {} is not an output", pin)));
        }
        entry.1 = high;
        trace!("gpio {}: level {}", pin, high as u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    #[test]
    fn test_active_level_polarity() {
        assert!(ActiveLevel::High.on_level());
        assert!(!ActiveLevel::High.off_level());
        assert!(!ActiveLevel::Low.on_level());
        assert!(ActiveLevel::Low.off_level());
    }

    #[test]
    fn test_active_level_output_mode() {
        assert_eq!(ActiveLevel::High.output_mode(), PinMode::PushPull);
        assert_eq!(ActiveLevel::Low.output_mode(), PinMode::OpenDrain);
    }

    #[test]
    fn test_configure_active_low_indicator_sequence() {
        let mut gpio = MockGpio::new();
        let mut seq = Sequence::new();

        gpio.expect_reset().with(eq(14)).times(1).in_sequence(&mut seq).returning(|_| Ok(()));
        gpio.expect_set_mode()
            .with(eq(14), eq(PinMode::OpenDrain))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        gpio.expect_set_level()
            .with(eq(14), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let indicator = IndicatorPin { pin: 14, active: ActiveLevel::Low };
        configure_indicator(&gpio, Some(indicator)).unwrap();
    }

    #[test]
    fn test_configure_unassigned_pins_is_noop() {
        // No expectations: any call would panic
        let gpio = MockGpio::new();
        configure_indicator(&gpio, None).unwrap();
        configure_output_low(&gpio, None).unwrap();
    }

    #[test]
    fn test_configure_output_low_propagates_errors() {
        let mut gpio = MockGpio::new();
        gpio.expect_reset().returning(|_| Ok(()));
        gpio.expect_set_mode()
            .returning(|pin, _| Err(TncError::Gpio(format!("GPIO {} busy", pin))));

        let result = configure_output_low(&gpio, Some(23));
        assert!(matches!(result, Err(TncError::Gpio(_))));
    }

    #[test]
    fn test_simulated_gpio_tracks_state() {
        let gpio = SimulatedGpio::new();
        configure_output_low(&gpio, Some(23)).unwrap();
        assert_eq!(gpio.mode(23), Some(PinMode::PushPull));
        assert_eq!(gpio.level(23), Some(false));

        gpio.set_level(23, true).unwrap();
        assert_eq!(gpio.level(23), Some(true));
        assert_eq!(gpio.level(22), None);
    }

    #[test]
    fn test_simulated_gpio_rejects_invalid_pin() {
        let gpio = SimulatedGpio::new();
        assert!(gpio.reset(40).is_err());
        assert!(gpio.set_mode(255, PinMode::PushPull).is_err());
    }

    #[test]
    fn test_simulated_gpio_rejects_disabled_output() {
        let gpio = SimulatedGpio::new();
        disable_pin(&gpio, 25).unwrap();
        assert_eq!(gpio.mode(25), Some(PinMode::Disabled));
        assert!(gpio.set_level(25, true).is_err());
    }
}
