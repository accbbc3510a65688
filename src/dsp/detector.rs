//! # In-band Energy Carrier Detector
//!
//! A [`Demodulator`] that only decides carrier detect: each sample has its DC
//! removed, goes through the port's band-pass filter, is rectified and
//! smoothed by the port's low-pass filter. The smoothed level switches
//! carrier detect with hysteresis.
//!
//! Stands in for the Bell202 decoder when the core runs on a host.

use serde::Deserialize;
use tracing::warn;

use crate::tnc::port::PortControlBlock;
use crate::tnc::router::Demodulator;

/// DC tracker time constant (2^n samples)
const DC_SHIFT: u32 = 8;

/// Carrier-detect thresholds on the smoothed in-band level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DetectorConfig {
    /// Level at or above which carrier detect turns on
    #[serde(default = "default_on_level")]
    pub on_level: i32,

    /// Level below which carrier detect turns off again
    #[serde(default = "default_off_level")]
    pub off_level: i32,
}

fn default_on_level() -> i32 { 200 }
fn default_off_level() -> i32 { 100 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            on_level: default_on_level(),
            off_level: default_off_level(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Lane {
    dc: Option<i32>,
    active: bool,
}

/// Per-port energy detector
#[derive(Debug)]
pub struct EnergyDetector {
    config: DetectorConfig,
    lanes: Vec<Lane>,
}

impl EnergyDetector {
    /// Create a detector for `ports` ports
    pub fn new(ports: usize, config: DetectorConfig) -> Self {
        Self {
            config,
            lanes: vec![Lane::default(); ports],
        }
    }
}

impl Demodulator for EnergyDetector {
    fn demodulate(&mut self, port: &PortControlBlock, magnitude: i32) {
        let Some(lane) = self.lanes.get_mut(port.index()) else {
            return;
        };

        let dc = lane.dc.get_or_insert(magnitude);
        *dc += (magnitude - *dc) >> DC_SHIFT;
        let ac = magnitude - *dc;

        let band = port.band_pass().process(ac);
        let level = port.low_pass().process(band.abs());

        lane.active = if lane.active {
            level >= self.config.off_level
        } else {
            level >= self.config.on_level
        };

        if let Err(e) = port.update_carrier_detect(lane.active, level) {
            warn!("port {}: carrier detect indicator failed: {}", port.index(), e);
        }
    }
}
