//! # HDLC Framing Module
//!
//! AX.25 link-layer framing for the transmit path.
//!
//! This module handles:
//! - CRC-16/X.25 frame check sequence calculation
//! - Bit stuffing and flag insertion
//! - Packing the bitstream into fixed-width transmit words
//! - Bounded per-port transmit queues
//! - Loopback decoding of encoded frames

pub mod protocol;
pub mod fcs;
pub mod encoder;
pub mod decoder;
pub mod queue;
