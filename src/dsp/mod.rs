//! # Signal Processing
//!
//! FIR filter design and per-port filter state, plus the energy-based
//! carrier detector used when no modem is attached.

pub mod filter;
pub mod detector;
