//! # Port Control Block
//!
//! Per-port state: hardware bindings, channel-access parameters, carrier
//! detect, filters and the transmit queue.

use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::dsp::filter::FirFilter;
use crate::error::Result;
use crate::hdlc::encoder::FrameStats;
use crate::hdlc::queue::TxQueue;
use crate::hw::gpio::{Gpio, IndicatorPin, PinNumber};

/// Channel-access parameters for one port
///
/// Units follow KISS: `slot_time` and `tx_delay` in 10 ms steps,
/// `persistence_p` as P where p = (P + 1) / 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChannelAccess {
    #[serde(default = "default_full_duplex")]
    pub full_duplex: bool,

    #[serde(default = "default_slot_time")]
    pub slot_time: u8,

    #[serde(default = "default_tx_delay")]
    pub tx_delay: u8,

    #[serde(default = "default_persistence_p")]
    pub persistence_p: u8,
}

fn default_full_duplex() -> bool { false }
fn default_slot_time() -> u8 { 10 }
fn default_tx_delay() -> u8 { 50 }
fn default_persistence_p() -> u8 { 63 }

impl Default for ChannelAccess {
    fn default() -> Self {
        Self {
            full_duplex: default_full_duplex(),
            slot_time: default_slot_time(),
            tx_delay: default_tx_delay(),
            persistence_p: default_persistence_p(),
        }
    }
}

/// Per-port replacements for the global channel-access defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelAccessOverrides {
    #[serde(default)]
    pub full_duplex: Option<bool>,

    #[serde(default)]
    pub slot_time: Option<u8>,

    #[serde(default)]
    pub tx_delay: Option<u8>,

    #[serde(default)]
    pub persistence_p: Option<u8>,
}

impl ChannelAccessOverrides {
    /// Apply the overrides on top of `base`
    pub fn apply(&self, base: ChannelAccess) -> ChannelAccess {
        ChannelAccess {
            full_duplex: self.full_duplex.unwrap_or(base.full_duplex),
            slot_time: self.slot_time.unwrap_or(base.slot_time),
            tx_delay: self.tx_delay.unwrap_or(base.tx_delay),
            persistence_p: self.persistence_p.unwrap_or(base.persistence_p),
        }
    }
}

/// Carrier-detect state shared between the demodulator and channel access
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarrierDetect {
    /// A transmission is present on the channel
    pub active: bool,

    /// Detector level / confidence
    pub level: i32,
}

/// Hardware bindings for a port, taken from the hardware profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPins {
    pub cdt_led: Option<IndicatorPin>,
    pub ptt_pin: Option<PinNumber>,
    pub status_led: Option<PinNumber>,
}

/// TNC control block for one radio port
///
/// Lives as long as the owning [`TncSystem`](super::system::TncSystem).
pub struct PortControlBlock {
    index: usize,
    adc_channel: u8,
    pins: PortPins,
    gpio: Arc<dyn Gpio>,

    carrier_detect: Mutex<CarrierDetect>,
    ptt_state: Mutex<bool>,
    channel_access: Mutex<ChannelAccess>,

    low_pass: Mutex<FirFilter>,
    band_pass: Mutex<FirFilter>,

    tx_queue: TxQueue,
}

impl std::fmt::Debug for PortControlBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortControlBlock")
            .field("index", &self.index)
            .field("adc_channel", &self.adc_channel)
            .field("pins", &self.pins)
            .finish_non_exhaustive()
    }
}

/// Lock a mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PortControlBlock {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        index: usize,
        adc_channel: u8,
        pins: PortPins,
        gpio: Arc<dyn Gpio>,
        channel_access: ChannelAccess,
        low_pass: FirFilter,
        band_pass: FirFilter,
        tx_queue: TxQueue,
    ) -> Self {
        Self {
            index,
            adc_channel,
            pins,
            gpio,
            carrier_detect: Mutex::new(CarrierDetect::default()),
            ptt_state: Mutex::new(false),
            channel_access: Mutex::new(channel_access),
            low_pass: Mutex::new(low_pass),
            band_pass: Mutex::new(band_pass),
            tx_queue,
        }
    }

    /// Port number (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    /// KISS type byte high nibble for this port
    pub fn kiss_type(&self) -> u8 {
        (self.index as u8) << 4
    }

    /// Analog channel feeding this port
    pub fn adc_channel(&self) -> u8 {
        self.adc_channel
    }

    /// Hardware bindings
    pub fn pins(&self) -> PortPins {
        self.pins
    }

    /// Snapshot of the carrier-detect state
    pub fn carrier_detect(&self) -> CarrierDetect {
        *lock(&self.carrier_detect)
    }

    /// Update carrier detect; the indicator follows on every edge
    ///
    /// # Errors
    ///
    /// Returns error if the indicator line cannot be driven.
    pub fn update_carrier_detect(&self, active: bool, level: i32) -> Result<()> {
        let was_active = {
            let mut cdt = lock(&self.carrier_detect);
            let was_active = cdt.active;
            *cdt = CarrierDetect { active, level };
            was_active
        };

        if was_active == active {
            return Ok(());
        }

        debug!("port {}: carrier detect {}", self.index, if active { "on" } else { "off" });

        match self.pins.cdt_led {
            Some(led) => {
                let level = if active { led.active.on_level() } else { led.active.off_level() };
                self.gpio.set_level(led.pin, level)
            }
            None => Ok(()),
        }
    }

    /// Current push-to-talk state (`true` = transmitting)
    pub fn ptt(&self) -> bool {
        *lock(&self.ptt_state)
    }

    /// Key or unkey the transmitter
    ///
    /// The recorded state only changes once the line has been driven.
    pub fn set_ptt(&self, on: bool) -> Result<()> {
        let mut ptt = lock(&self.ptt_state);

        if let Some(pin) = self.pins.ptt_pin {
            self.gpio.set_level(pin, on)?;
        }

        if *ptt != on {
            info!("port {}: PTT {}", self.index, if on { "on" } else { "off" });
        }
        *ptt = on;
        Ok(())
    }

    /// Drive the status indicator, if the board has one
    pub fn set_status_led(&self, on: bool) -> Result<()> {
        match self.pins.status_led {
            Some(pin) => self.gpio.set_level(pin, on),
            None => Ok(()),
        }
    }

    /// Snapshot of the channel-access parameters
    pub fn channel_access(&self) -> ChannelAccess {
        *lock(&self.channel_access)
    }

    /// Modify channel-access parameters (host overrides)
    pub fn update_channel_access<F>(&self, update: F) -> ChannelAccess
    where
        F: FnOnce(&mut ChannelAccess),
    {
        let mut params = lock(&self.channel_access);
        update(&mut params);
        *params
    }

    /// Exclusive access to the low-pass filter delay line
    pub fn low_pass(&self) -> MutexGuard<'_, FirFilter> {
        lock(&self.low_pass)
    }

    /// Exclusive access to the band-pass filter delay line
    pub fn band_pass(&self) -> MutexGuard<'_, FirFilter> {
        lock(&self.band_pass)
    }

    /// Transmit queue producer
    pub fn tx_queue(&self) -> &TxQueue {
        &self.tx_queue
    }

    /// Encode a frame payload onto this port's transmit queue
    ///
    /// Blocks while the queue is full. See [`TxQueue::send_frame`].
    pub fn send_frame(&self, payload: &[u8]) -> Result<FrameStats> {
        self.tx_queue.send_frame(payload)
    }
}
