//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dsp::detector::DetectorConfig;
use crate::dsp::filter::FilterParams;
use crate::error::{Result, TncError};
use crate::hdlc::protocol::WordWidth;
use crate::hw::gpio::PinNumber;
use crate::hw::profile::{HardwareProfile, PortProfile};
use crate::tnc::port::ChannelAccess;
use crate::tnc::router::{RoutingPolicy, DEFAULT_BATCH_SAMPLES};
use crate::tnc::system::{TncSettings, DEFAULT_QUEUE_CAPACITY};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Channel-access defaults for every port
    #[serde(default)]
    pub kiss: ChannelAccess,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub transmit: TransmitConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hardware selection: a built-in variant or an explicit port table
#[derive(Debug, Deserialize, Clone)]
pub struct HardwareConfig {
    #[serde(default)]
    pub variant: Option<String>,

    #[serde(default)]
    pub ports: Vec<PortProfile>,

    #[serde(default)]
    pub routing: RoutingPolicy,

    #[serde(default)]
    pub disabled_pins: Vec<PinNumber>,
}

/// Receive filter design
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,

    #[serde(default = "default_lpf_taps")]
    pub lpf_taps: usize,

    #[serde(default = "default_lpf_cutoff")]
    pub lpf_cutoff: u32,

    #[serde(default = "default_bpf_taps")]
    pub bpf_taps: usize,

    #[serde(default = "default_bpf_pass")]
    pub bpf_pass: u32,

    #[serde(default = "default_bpf_cutoff")]
    pub bpf_cutoff: u32,
}

/// Transmit queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransmitConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Transmit word width in bits (8, 16 or 32)
    #[serde(default)]
    pub word_bits: WordWidth,
}

/// Sample router configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    #[serde(default = "default_batch_samples")]
    pub batch_samples: usize,

    /// Raw little-endian 16-bit sample file to replay
    #[serde(default)]
    pub input: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_variant() -> Option<String> { Some("generic".to_string()) }

fn default_sampling_rate() -> u32 { 13200 }
fn default_lpf_taps() -> usize { 31 }
fn default_lpf_cutoff() -> u32 { 1200 }
fn default_bpf_taps() -> usize { 31 }
fn default_bpf_pass() -> u32 { 1000 }
fn default_bpf_cutoff() -> u32 { 2500 }

fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }
fn default_batch_samples() -> usize { DEFAULT_BATCH_SAMPLES }
fn default_log_level() -> String { "info".to_string() }

const MAX_FILTER_TAPS: usize = 255;
const MAX_QUEUE_CAPACITY: usize = 65536;
const MAX_BATCH_SAMPLES: usize = 65536;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            variant: default_variant(),
            ports: vec![],
            routing: RoutingPolicy::default(),
            disabled_pins: vec![],
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            lpf_taps: default_lpf_taps(),
            lpf_cutoff: default_lpf_cutoff(),
            bpf_taps: default_bpf_taps(),
            bpf_pass: default_bpf_pass(),
            bpf_cutoff: default_bpf_cutoff(),
        }
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            word_bits: WordWidth::default(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batch_samples: default_batch_samples(),
            input: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn invalid(msg: &str) -> TncError {
    TncError::Config(toml::de::Error::custom(msg))
}

impl HardwareConfig {
    /// Resolve the hardware profile this configuration selects
    ///
    /// # Errors
    ///
    /// Returns error if both or neither of `variant` and `ports` are given,
    /// if `routing` or `disabled_pins` accompany a variant, or if the
    /// variant is unknown.
    pub fn resolve(&self) -> Result<HardwareProfile> {
        match (&self.variant, self.ports.is_empty()) {
            (Some(_), false) => Err(invalid("hardware: set either variant or ports, not both")),
            (Some(_), true) if self.routing != RoutingPolicy::default() => Err(invalid(
                "hardware: routing applies to an explicit port table, not a variant",
            )),
            (Some(_), true) if !self.disabled_pins.is_empty() => Err(invalid(
                "hardware: disabled_pins applies to an explicit port table, not a variant",
            )),
            (Some(name), true) => HardwareProfile::builtin(name),
            (None, false) => Ok(HardwareProfile {
                name: "custom".to_string(),
                ports: self.ports.clone(),
                routing: self.routing,
                disabled_pins: self.disabled_pins.clone(),
            }),
            (None, true) => Err(invalid("hardware: either variant or ports is required")),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fx25_tnc::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range or the
    /// hardware profile is inconsistent
    pub fn validate(&self) -> Result<()> {
        self.hardware.resolve()?.validate()?;

        // Validate filter configuration
        let filter = &self.filter;
        if filter.sampling_rate == 0 {
            return Err(invalid("sampling_rate must be positive"));
        }

        if filter.lpf_taps == 0 || filter.lpf_taps > MAX_FILTER_TAPS
            || filter.bpf_taps == 0 || filter.bpf_taps > MAX_FILTER_TAPS
        {
            return Err(invalid("filter taps must be between 1 and 255"));
        }

        let sampling_rate = u64::from(filter.sampling_rate);
        if filter.lpf_cutoff == 0 || u64::from(filter.lpf_cutoff) * 2 >= sampling_rate {
            return Err(invalid("lpf_cutoff must be between 1 and sampling_rate / 2"));
        }

        if filter.bpf_pass == 0 || filter.bpf_pass >= filter.bpf_cutoff {
            return Err(invalid("bpf_pass must be positive and below bpf_cutoff"));
        }

        if u64::from(filter.bpf_cutoff) * 2 >= sampling_rate {
            return Err(invalid("bpf_cutoff must be below sampling_rate / 2"));
        }

        // Validate transmit configuration
        if self.transmit.queue_capacity == 0 || self.transmit.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(invalid("queue_capacity must be between 1 and 65536"));
        }

        // Validate router configuration
        if self.router.batch_samples == 0 || self.router.batch_samples > MAX_BATCH_SAMPLES {
            return Err(invalid("batch_samples must be between 1 and 65536"));
        }

        // Validate detector thresholds
        if self.detector.off_level < 0 || self.detector.off_level > self.detector.on_level {
            return Err(invalid("detector off_level must be between 0 and on_level"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid("logging level must be one of trace, debug, info, warn, error"));
        }

        Ok(())
    }

    /// Settings for [`TncSystem::init`](crate::tnc::system::TncSystem::init)
    pub fn tnc_settings(&self) -> TncSettings {
        let filter = &self.filter;
        TncSettings {
            channel_access: self.kiss,
            lpf: FilterParams {
                taps: filter.lpf_taps,
                sampling_freq: filter.sampling_rate,
                pass_freq: 0,
                cutoff_freq: filter.lpf_cutoff,
            },
            bpf: FilterParams {
                taps: filter.bpf_taps,
                sampling_freq: filter.sampling_rate,
                pass_freq: filter.bpf_pass,
                cutoff_freq: filter.bpf_cutoff,
            },
            queue_capacity: self.transmit.queue_capacity,
            word_width: self.transmit.word_bits,
        }
    }
}
