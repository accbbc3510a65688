//! # FX.25 TNC Core
//!
//! Multi-port AX.25 terminal node controller core.
//!
//! This library provides the receive-side sample routing and the
//! transmit-side HDLC framing of a TNC with up to eight radio ports sharing
//! one analog front end.
//!
//! ## Structure
//!
//! - [`tnc`]: port control blocks, system bring-up and the sample router
//! - [`hdlc`]: FCS, bit stuffing, word packing and transmit queues
//! - [`hw`]: hardware profiles, GPIO lines and sample sources
//! - [`dsp`]: FIR filters and carrier detection
//! - [`config`]: TOML configuration

pub mod config;
pub mod error;
pub mod hdlc;
pub mod hw;
pub mod dsp;
pub mod tnc;
