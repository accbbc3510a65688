//! # Hardware Abstraction
//!
//! Board profiles, GPIO actuation and the analog sample front end.

pub mod gpio;
pub mod profile;
pub mod adc;
