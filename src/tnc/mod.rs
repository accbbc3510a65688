//! # TNC Core
//!
//! Port control blocks, the system object that owns them, the sample router
//! feeding the demodulators and host parameter commands.

pub mod port;
pub mod router;
pub mod system;
pub mod kiss;
