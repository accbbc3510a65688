//! # KISS Commands
//!
//! Decoding of the KISS type byte and parameter commands sent by the host.
//! Byte-level KISS framing (FEND / FESC escaping) happens in the host link
//! and is not handled here.
//!
//! ## Type byte
//!
//! ```text
//! bit:  7 6 5 4   3 2 1 0
//!      [ port  ] [command]
//! ```
//!
//! The single byte `0xFF` leaves KISS mode and carries no port.

use crate::error::{Result, TncError};
use crate::tnc::port::ChannelAccess;

/// Data frame to transmit
pub const CMD_DATA: u8 = 0x00;

/// Keyup delay in 10 ms units
pub const CMD_TX_DELAY: u8 = 0x01;

/// Persistence parameter P
pub const CMD_PERSISTENCE: u8 = 0x02;

/// Slot interval in 10 ms units
pub const CMD_SLOT_TIME: u8 = 0x03;

/// Time to hold up the transmitter after the frame (obsolete)
pub const CMD_TX_TAIL: u8 = 0x04;

/// Non-zero selects full duplex
pub const CMD_FULL_DUPLEX: u8 = 0x05;

/// Hardware-specific settings
pub const CMD_SET_HARDWARE: u8 = 0x06;

/// Exit KISS mode (whole type byte)
pub const CMD_RETURN: u8 = 0xFF;

/// One decoded host command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KissCommand<'a> {
    Data(&'a [u8]),
    TxDelay(u8),
    Persistence(u8),
    SlotTime(u8),
    TxTail(u8),
    FullDuplex(bool),
    SetHardware(&'a [u8]),
    Return,
}

/// A command addressed to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KissFrame<'a> {
    /// Port nibble from the type byte (0 for `Return`)
    pub port: usize,
    pub command: KissCommand<'a>,
}

fn parameter(command: u8, data: &[u8]) -> Result<u8> {
    data.first().copied().ok_or_else(|| {
        TncError::Hdlc(format!("KISS command {:#04x} without parameter byte", command))
    })
}

/// Decode a type byte and its data
///
/// # Errors
///
/// Returns error for unknown commands or parameter commands without a value.
///
/// # Examples
///
/// ```
/// use fx25_tnc::tnc::kiss::{parse, KissCommand};
///
/// let frame = parse(0x21, &[30]).unwrap();
/// assert_eq!(frame.port, 2);
/// assert_eq!(frame.command, KissCommand::TxDelay(30));
/// ```
pub fn parse(type_byte: u8, data: &[u8]) -> Result<KissFrame<'_>> {
    if type_byte == CMD_RETURN {
        return Ok(KissFrame { port: 0, command: KissCommand::Return });
    }

    let port = (type_byte >> 4) as usize;
    let code = type_byte & 0x0F;

    let command = match code {
        CMD_DATA => KissCommand::Data(data),
        CMD_TX_DELAY => KissCommand::TxDelay(parameter(code, data)?),
        CMD_PERSISTENCE => KissCommand::Persistence(parameter(code, data)?),
        CMD_SLOT_TIME => KissCommand::SlotTime(parameter(code, data)?),
        CMD_TX_TAIL => KissCommand::TxTail(parameter(code, data)?),
        CMD_FULL_DUPLEX => KissCommand::FullDuplex(parameter(code, data)? != 0),
        CMD_SET_HARDWARE => KissCommand::SetHardware(data),
        _ => {
            return Err(TncError::Hdlc(format!(
                "unknown KISS command {:#04x}",
                type_byte
            )))
        }
    };

    Ok(KissFrame { port, command })
}

impl KissCommand<'_> {
    /// Apply a channel-access parameter command
    ///
    /// Returns `false` for commands that do not touch channel access.
    pub fn apply(&self, params: &mut ChannelAccess) -> bool {
        match *self {
            KissCommand::TxDelay(value) => params.tx_delay = value,
            KissCommand::Persistence(value) => params.persistence_p = value,
            KissCommand::SlotTime(value) => params.slot_time = value,
            KissCommand::FullDuplex(value) => params.full_duplex = value,
            _ => return false,
        }
        true
    }
}
