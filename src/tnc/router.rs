//! # Sample Router
//!
//! Drains the analog front end in batches and hands every sample to the
//! demodulator of the port it belongs to.
//!
//! ## Routing policies
//!
//! - [`RoutingPolicy::ChannelTag`]: multi-channel front ends tag each 16-bit
//!   word with its channel in the top four bits. The low twelve bits are the
//!   sample. Channels without a registered port are dropped silently.
//! - [`RoutingPolicy::SinglePort`]: codec front ends deliver signed 16-bit
//!   samples for a single port. Every word goes to one fixed port after an
//!   offset is added.

use serde::Deserialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, trace, warn};

use super::port::PortControlBlock;
use super::system::TncSystem;
use crate::error::{Result, TncError};
use crate::hw::adc::SampleSource;

/// Number of analog channels addressable by a channel tag
pub const CHANNEL_TABLE_SIZE: usize = 8;

/// Position of the channel tag in a multi-channel sample word
pub const CHANNEL_TAG_SHIFT: u32 = 12;

/// Sample bits below the channel tag (12-bit converter)
pub const MAGNITUDE_MASK: u16 = 0x0FFF;

/// Samples read from the front end per batch
pub const DEFAULT_BATCH_SAMPLES: usize = 512;

/// Name of the router thread
const ROUTER_THREAD_NAME: &str = "read-adc";

/// Mapping from sample word to destination port, chosen once per profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RoutingPolicy {
    /// Decode the channel tag and look the port up in the channel table
    #[default]
    ChannelTag,

    /// Send every sample, read as signed 16-bit plus `offset`, to `port`
    SinglePort { port: usize, offset: i32 },
}

impl RoutingPolicy {
    /// Destination port and magnitude for one sample word
    ///
    /// Returns `None` when the sample belongs to no port.
    ///
    /// # Examples
    ///
    /// ```
    /// use fx25_tnc::tnc::router::{ChannelLookupTable, RoutingPolicy};
    ///
    /// let mut table = ChannelLookupTable::new();
    /// table.register(3, 1).unwrap();
    ///
    /// assert_eq!(RoutingPolicy::ChannelTag.route(&table, 0x3ABC), Some((1, 0xABC)));
    /// assert_eq!(RoutingPolicy::ChannelTag.route(&table, 0x2ABC), None);
    /// ```
    pub fn route(&self, table: &ChannelLookupTable, sample: u16) -> Option<(usize, i32)> {
        match *self {
            RoutingPolicy::ChannelTag => {
                let channel = (sample >> CHANNEL_TAG_SHIFT) as usize;
                let magnitude = (sample & MAGNITUDE_MASK) as i32;
                table.get(channel).map(|port| (port, magnitude))
            }
            RoutingPolicy::SinglePort { port, offset } => Some((port, sample as i16 as i32 + offset)),
        }
    }
}

/// Reverse map from analog channel to port index
///
/// Filled during system initialization and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLookupTable {
    slots: [Option<usize>; CHANNEL_TABLE_SIZE],
}

impl ChannelLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `channel` to `port`
    ///
    /// # Errors
    ///
    /// Returns error if the channel is out of range or already bound.
    pub fn register(&mut self, channel: u8, port: usize) -> Result<()> {
        let slot = self.slots.get_mut(channel as usize).ok_or_else(|| {
            TncError::Profile(format!(
                "ADC channel {} out of range (0-{})",
                channel,
                CHANNEL_TABLE_SIZE - 1
            ))
        })?;

        if let Some(existing) = slot {
            return Err(TncError::Profile(format!(
                "ADC channel {} already bound to port {}",
                channel, existing
            )));
        }

        *slot = Some(port);
        Ok(())
    }

    /// Port bound to `channel`, if any
    pub fn get(&self, channel: usize) -> Option<usize> {
        self.slots.get(channel).copied().flatten()
    }

    /// Number of bound channels
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-port receive entry point fed by the router
#[cfg_attr(test, mockall::automock)]
pub trait Demodulator: Send {
    /// Process one sample for `port`
    fn demodulate(&mut self, port: &PortControlBlock, magnitude: i32);
}

/// Router counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub batches: u64,
    pub routed: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

/// The receive loop: front end to demodulators
pub struct SampleRouter {
    system: Arc<TncSystem>,
    demodulator: Box<dyn Demodulator>,
    source: Box<dyn SampleSource>,
    buf: Vec<u16>,
    stats: RouterStats,
}

impl SampleRouter {
    /// Create a router reading `batch_samples` words per batch
    pub fn new(
        system: Arc<TncSystem>,
        demodulator: Box<dyn Demodulator>,
        source: Box<dyn SampleSource>,
        batch_samples: usize,
    ) -> Self {
        Self {
            system,
            demodulator,
            source,
            buf: vec![0; batch_samples.max(1)],
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Route one batch of sample words
    ///
    /// Returns the number of samples delivered to a demodulator.
    pub fn dispatch(&mut self, samples: &[u16]) -> usize {
        let system = &self.system;
        let policy = system.routing();
        let mut routed = 0;

        for &sample in samples {
            let target = policy
                .route(system.channels(), sample)
                .and_then(|(index, magnitude)| system.port(index).map(|port| (port, magnitude)));

            match target {
                Some((port, magnitude)) => {
                    self.demodulator.demodulate(port, magnitude);
                    routed += 1;
                }
                None => self.stats.dropped += 1,
            }
        }

        self.stats.routed += routed as u64;
        routed
    }

    /// Read one batch and route it
    ///
    /// Acquisition errors are logged and counted; the next call simply
    /// reads again.
    pub fn poll(&mut self) -> usize {
        let read = match self.source.read_batch(&mut self.buf) {
            Ok(n) => n.min(self.buf.len()),
            Err(e) => {
                self.stats.read_errors += 1;
                warn!("sample read failed: {}", e);
                return 0;
            }
        };

        self.stats.batches += 1;
        trace!("read {} samples", read);

        let batch = std::mem::take(&mut self.buf);
        let routed = self.dispatch(&batch[..read]);
        self.buf = batch;
        routed
    }

    /// Route batches for the lifetime of the process
    pub fn run(mut self) -> ! {
        info!(
            "Sample router started ({} ports, {:?} routing, {} samples per batch)",
            self.system.ports().len(),
            self.system.routing(),
            self.buf.len()
        );

        loop {
            self.poll();
        }
    }

    /// Start the router on its own thread
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be created.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name(ROUTER_THREAD_NAME.to_string())
            .spawn(move || {
                self.run();
            })?;
        Ok(handle)
    }
}
