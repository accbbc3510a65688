//! # TNC System
//!
//! Owns the port control blocks and the channel lookup table. Built once at
//! startup from a hardware profile and lives for the rest of the process.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::kiss::{self, KissCommand};
use super::port::{ChannelAccess, PortControlBlock, PortPins};
use super::router::{ChannelLookupTable, RoutingPolicy};
use crate::dsp::filter::{design, FilterParams, FirFilter};
use crate::error::{Result, TncError};
use crate::hdlc::protocol::WordWidth;
use crate::hdlc::queue::{transmit_queue, TxReceiver};
use crate::hw::gpio::{configure_indicator, configure_output_low, disable_pin, Gpio};
use crate::hw::profile::HardwareProfile;

/// Default transmit queue depth, in queue items
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Protocol defaults and DSP parameters applied to every port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TncSettings {
    pub channel_access: ChannelAccess,
    pub lpf: FilterParams,
    pub bpf: FilterParams,
    pub queue_capacity: usize,
    pub word_width: WordWidth,
}

impl Default for TncSettings {
    fn default() -> Self {
        Self {
            channel_access: ChannelAccess::default(),
            lpf: FilterParams {
                taps: 31,
                sampling_freq: 13200,
                pass_freq: 0,
                cutoff_freq: 1200,
            },
            bpf: FilterParams {
                taps: 31,
                sampling_freq: 13200,
                pass_freq: 1000,
                cutoff_freq: 2500,
            },
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            word_width: WordWidth::default(),
        }
    }
}

/// The running TNC: every port plus the channel routing table
#[derive(Debug)]
pub struct TncSystem {
    name: String,
    ports: Vec<PortControlBlock>,
    channels: ChannelLookupTable,
    routing: RoutingPolicy,
}

impl TncSystem {
    /// Bring up every port of `profile`
    ///
    /// Pins listed as disabled are put into high impedance first. Then, per
    /// port, the channel is registered, the carrier-detect LED is driven off
    /// (open drain when active low), PTT and status lines are driven low
    /// and the filters and transmit queue are created.
    ///
    /// Returns the system and one transmit queue receiver per port, in port
    /// order.
    ///
    /// # Errors
    ///
    /// Any profile, filter or GPIO failure aborts initialization; no
    /// partially initialized system is returned.
    pub fn init(
        profile: &HardwareProfile,
        settings: &TncSettings,
        gpio: Arc<dyn Gpio>,
    ) -> Result<(Self, Vec<TxReceiver>)> {
        profile.validate()?;

        if settings.queue_capacity == 0 {
            return Err(TncError::Profile("transmit queue capacity must be at least 1".to_string()));
        }

        let lpf = design(&settings.lpf)?;
        let bpf = design(&settings.bpf)?;

        for &pin in &profile.disabled_pins {
            disable_pin(gpio.as_ref(), pin)?;
            info!("GPIO {} disabled", pin);
        }

        let mut channels = ChannelLookupTable::new();
        let mut ports = Vec::with_capacity(profile.ports.len());
        let mut receivers = Vec::with_capacity(profile.ports.len());

        for (index, entry) in profile.ports.iter().enumerate() {
            channels.register(entry.adc_channel, index)?;

            configure_indicator(gpio.as_ref(), entry.cdt_led)?;
            configure_output_low(gpio.as_ref(), entry.ptt_pin)?;
            configure_output_low(gpio.as_ref(), entry.status_led)?;

            let channel_access = entry.channel_access.apply(settings.channel_access);
            let (tx_queue, receiver) =
                transmit_queue(index, settings.queue_capacity, settings.word_width);

            let pins = PortPins {
                cdt_led: entry.cdt_led,
                ptt_pin: entry.ptt_pin,
                status_led: entry.status_led,
            };

            info!(
                "port {}: ADC channel {}, CDT LED {:?}, PTT {:?}, status LED {:?}",
                index, entry.adc_channel, entry.cdt_led, entry.ptt_pin, entry.status_led
            );
            debug!("port {}: {:?}", index, channel_access);

            ports.push(PortControlBlock::new(
                index,
                entry.adc_channel,
                pins,
                gpio.clone(),
                channel_access,
                FirFilter::new(lpf.clone()),
                FirFilter::new(bpf.clone()),
                tx_queue,
            ));
            receivers.push(receiver);
        }

        info!(
            "TNC initialized: profile {}, {} ports, {:?} routing",
            profile.name,
            ports.len(),
            profile.routing
        );

        Ok((
            Self {
                name: profile.name.clone(),
                ports,
                channels,
                routing: profile.routing,
            },
            receivers,
        ))
    }

    /// Hardware profile name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ports(&self) -> &[PortControlBlock] {
        &self.ports
    }

    pub fn port(&self, index: usize) -> Option<&PortControlBlock> {
        self.ports.get(index)
    }

    /// Port fed by analog `channel`
    pub fn port_for_channel(&self, channel: usize) -> Option<&PortControlBlock> {
        self.channels.get(channel).and_then(|index| self.ports.get(index))
    }

    pub fn routing(&self) -> RoutingPolicy {
        self.routing
    }

    pub fn channels(&self) -> &ChannelLookupTable {
        &self.channels
    }

    /// Handle one command from the host
    ///
    /// Data frames are encoded onto the addressed port's transmit queue
    /// (blocking while it is full). Parameter commands update the port's
    /// channel access. TXTAIL, SETHARDWARE and return are accepted and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns error for malformed commands, unknown ports or a closed
    /// transmit queue.
    pub fn handle_kiss(&self, type_byte: u8, data: &[u8]) -> Result<()> {
        let frame = kiss::parse(type_byte, data).map_err(|e| {
            warn!("rejected host command: {}", e);
            e
        })?;

        if frame.command == KissCommand::Return {
            debug!("KISS return ignored");
            return Ok(());
        }

        let port = self.port(frame.port).ok_or_else(|| {
            warn!("KISS command for unknown port {}", frame.port);
            TncError::Hdlc(format!("KISS port {} does not exist", frame.port))
        })?;

        match frame.command {
            KissCommand::Data(payload) => {
                port.send_frame(payload)?;
            }
            command => {
                let mut applied = false;
                let params = port.update_channel_access(|params| applied = command.apply(params));
                if applied {
                    info!("port {}: {:?}", port.index(), params);
                } else {
                    debug!("port {}: {:?} ignored", port.index(), command);
                }
            }
        }

        Ok(())
    }
}
