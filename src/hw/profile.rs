//! # Hardware Profiles
//!
//! Per-board port tables: which analog channel feeds each port and which
//! GPIO lines carry its indicators and push-to-talk.
//!
//! ## Built-in variants
//!
//! | Variant | Ports | ADC channels | CDT LED | PTT |
//! |---------|-------|--------------|---------|-----|
//! | `generic` | 6 | 0,3,6,7,4,5 | GPIO2 (shared, active high) | 23,22,21,19,18,5 |
//! | `fx25tnc-r2` | 2 | 0,3 | 14,19 (active low) | 23,22 |
//! | `fx25tnc-r3` | 6 | 0,3,6,7,4,5 | 15,2,0,4,0,4 (active high) | 23,22,21,19,18,5 |
//! | `m5atom` | 2 | 5,6 | - | 19,21 |
//! | `m5stickc` | 1 | 0 | - | 0 |
//! | `m5stickc-audio` | 1 | codec | - | - |

use serde::Deserialize;
use std::collections::HashSet;

use super::gpio::{ActiveLevel, IndicatorPin, PinNumber, MAX_GPIO_PIN};
use crate::error::{Result, TncError};
use crate::tnc::port::ChannelAccessOverrides;
use crate::tnc::router::{RoutingPolicy, CHANNEL_TABLE_SIZE};

/// Maximum number of radio ports (one per KISS port nibble in use)
pub const MAX_PORTS: usize = 8;

/// Hardware bindings for one radio port
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortProfile {
    /// Analog channel that carries this port's audio
    pub adc_channel: u8,

    /// Carrier-detect indicator
    #[serde(default)]
    pub cdt_led: Option<IndicatorPin>,

    /// Push-to-talk output
    #[serde(default)]
    pub ptt_pin: Option<PinNumber>,

    /// Secondary status indicator
    #[serde(default)]
    pub status_led: Option<PinNumber>,

    /// Per-port channel-access defaults replacing the global ones
    #[serde(default)]
    pub channel_access: ChannelAccessOverrides,
}

impl PortProfile {
    fn new(adc_channel: u8, cdt_led: Option<IndicatorPin>, ptt_pin: Option<PinNumber>) -> Self {
        Self {
            adc_channel,
            cdt_led,
            ptt_pin,
            status_led: None,
            channel_access: ChannelAccessOverrides::default(),
        }
    }
}

/// Complete hardware description, selected once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProfile {
    /// Profile name for diagnostics
    pub name: String,

    /// Port table, indexed by port number
    pub ports: Vec<PortProfile>,

    /// How samples are mapped to ports
    pub routing: RoutingPolicy,

    /// Pins put into high impedance before port bring-up
    pub disabled_pins: Vec<PinNumber>,
}

/// Built-in board variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareVariant {
    Generic,
    Fx25TncR2,
    Fx25TncR3,
    M5Atom,
    M5StickC,
    M5StickCAudio,
}

const SIX_PORT_ADC: [u8; 6] = [0, 3, 6, 7, 4, 5];
const SIX_PORT_PTT: [PinNumber; 6] = [23, 22, 21, 19, 18, 5];

/// Offset turning a signed 16-bit codec sample into an unsigned magnitude
pub const CODEC_SAMPLE_OFFSET: i32 = 32768;

impl HardwareVariant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "generic" => Some(Self::Generic),
            "fx25tnc-r2" => Some(Self::Fx25TncR2),
            "fx25tnc-r3" => Some(Self::Fx25TncR3),
            "m5atom" => Some(Self::M5Atom),
            "m5stickc" => Some(Self::M5StickC),
            "m5stickc-audio" => Some(Self::M5StickCAudio),
            _ => None,
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &[
            "generic",
            "fx25tnc-r2",
            "fx25tnc-r3",
            "m5atom",
            "m5stickc",
            "m5stickc-audio",
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Fx25TncR2 => "fx25tnc-r2",
            Self::Fx25TncR3 => "fx25tnc-r3",
            Self::M5Atom => "m5atom",
            Self::M5StickC => "m5stickc",
            Self::M5StickCAudio => "m5stickc-audio",
        }
    }

    /// Port table and routing for this board
    pub fn profile(self) -> HardwareProfile {
        let led = |pin, active| Some(IndicatorPin { pin, active });

        let (ports, routing, disabled_pins): (Vec<PortProfile>, RoutingPolicy, Vec<PinNumber>) = match self {
            Self::Generic => (
                SIX_PORT_ADC
                    .iter()
                    .zip(SIX_PORT_PTT)
                    .map(|(&ch, ptt)| PortProfile::new(ch, led(2, ActiveLevel::High), Some(ptt)))
                    .collect(),
                RoutingPolicy::ChannelTag,
                vec![],
            ),
            Self::Fx25TncR2 => (
                [(0, 14, 23, 27), (3, 19, 22, 21)]
                    .into_iter()
                    .map(|(ch, cdt, ptt, sta)| PortProfile {
                        status_led: Some(sta),
                        ..PortProfile::new(ch, led(cdt, ActiveLevel::Low), Some(ptt))
                    })
                    .collect(),
                RoutingPolicy::ChannelTag,
                vec![],
            ),
            Self::Fx25TncR3 => (
                SIX_PORT_ADC
                    .iter()
                    .zip([15, 2, 0, 4, 0, 4])
                    .zip(SIX_PORT_PTT)
                    .map(|((&ch, cdt), ptt)| {
                        PortProfile::new(ch, led(cdt, ActiveLevel::High), Some(ptt))
                    })
                    .collect(),
                RoutingPolicy::ChannelTag,
                vec![],
            ),
            // Internal RGB LED is driven by the RMT peripheral, not a plain GPIO
            Self::M5Atom => (
                vec![
                    PortProfile::new(5, None, Some(19)),
                    PortProfile::new(6, None, Some(21)),
                ],
                RoutingPolicy::ChannelTag,
                vec![],
            ),
            // GPIO25 shares the GPIO36 pad on the M5StickC header
            Self::M5StickC => (
                vec![PortProfile::new(0, None, Some(0))],
                RoutingPolicy::ChannelTag,
                vec![25],
            ),
            Self::M5StickCAudio => (
                vec![PortProfile::new(0, None, None)],
                RoutingPolicy::SinglePort {
                    port: 0,
                    offset: CODEC_SAMPLE_OFFSET,
                },
                vec![25],
            ),
        };

        HardwareProfile {
            name: self.name().to_string(),
            ports,
            routing,
            disabled_pins,
        }
    }
}

impl HardwareProfile {
    /// Look up a built-in profile by variant name
    ///
    /// # Examples
    ///
    /// ```
    /// use fx25_tnc::hw::profile::HardwareProfile;
    ///
    /// let profile = HardwareProfile::builtin("fx25tnc-r3").unwrap();
    /// assert_eq!(profile.ports.len(), 6);
    /// assert!(HardwareProfile::builtin("unknown-board").is_err());
    /// ```
    pub fn builtin(name: &str) -> Result<Self> {
        HardwareVariant::from_name(name)
            .map(HardwareVariant::profile)
            .ok_or_else(|| {
                TncError::Profile(format!(
                    "unknown hardware variant '{}' (expected one of: {})",
                    name,
                    HardwareVariant::all_names().join(", ")
                ))
            })
    }

    /// Check the port table for conflicts
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - There are no ports or more than `MAX_PORTS`
    /// - An analog channel is out of table range or used twice
    /// - A pin number is out of range
    /// - A PTT or status pin is shared with any other line
    /// - An indicator LED pin is also a PTT, status or disabled pin
    /// - A single-port routing policy names a port that does not exist
    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() || self.ports.len() > MAX_PORTS {
            return Err(TncError::Profile(format!(
                "port count must be between 1 and {}, got {}",
                MAX_PORTS,
                self.ports.len()
            )));
        }

        let mut channels = HashSet::new();
        let mut exclusive_pins = HashSet::new();
        let mut led_pins = HashSet::new();

        let check_range = |pin: PinNumber| -> Result<()> {
            if pin > MAX_GPIO_PIN {
                return Err(TncError::Profile(format!(
                    "GPIO {} out of range (0-{})",
                    pin, MAX_GPIO_PIN
                )));
            }
            Ok(())
        };

        for &pin in &self.disabled_pins {
            check_range(pin)?;
            exclusive_pins.insert(pin);
        }

        for (index, port) in self.ports.iter().enumerate() {
            if port.adc_channel as usize >= CHANNEL_TABLE_SIZE {
                return Err(TncError::Profile(format!(
                    "port {}: ADC channel {} out of range (0-{})",
                    index,
                    port.adc_channel,
                    CHANNEL_TABLE_SIZE - 1
                )));
            }

            if !channels.insert(port.adc_channel) {
                return Err(TncError::Profile(format!(
                    "port {}: ADC channel {} already assigned",
                    index, port.adc_channel
                )));
            }

            for pin in [port.ptt_pin, port.status_led].into_iter().flatten() {
                check_range(pin)?;
                if !exclusive_pins.insert(pin) {
                    return Err(TncError::Profile(format!(
                        "port {}: GPIO {} already in use",
                        index, pin
                    )));
                }
            }

            if let Some(led) = port.cdt_led {
                check_range(led.pin)?;
                led_pins.insert(led.pin);
            }
        }

        if let Some(pin) = led_pins.intersection(&exclusive_pins).next() {
            return Err(TncError::Profile(format!(
                "GPIO {} used both as an indicator and as another line",
                pin
            )));
        }

        if let RoutingPolicy::SinglePort { port, .. } = self.routing {
            if port >= self.ports.len() {
                return Err(TncError::Profile(format!(
                    "single-port routing targets port {}, but only {} ports exist",
                    port,
                    self.ports.len()
                )));
            }
        }

        Ok(())
    }
}
