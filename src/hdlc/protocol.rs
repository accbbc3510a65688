//! # HDLC / AX.25 Framing Constants and Types

use serde::Deserialize;

use crate::error::{Result, TncError};

/// HDLC flag octet (01111110), sent unstuffed at both ends of a frame
pub const AX25_FLAG: u8 = 0x7E;

/// Number of consecutive one bits after which a zero is stuffed
pub const BIT_STUFFING_BITS: u32 = 5;

/// Length of the frame check sequence in bytes
pub const FCS_LEN: usize = 2;

/// Width of the words handed to the transmit queue consumer
///
/// The consumer clocks bits out LSB first; the width only controls how many
/// bits travel together in one queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum WordWidth {
    /// One byte per queue item
    Bits8,
    /// Two bytes per queue item
    Bits16,
    /// Four bytes per queue item
    Bits32,
}

impl WordWidth {
    /// Number of bits in a full word
    pub const fn bits(self) -> u32 {
        match self {
            WordWidth::Bits8 => 8,
            WordWidth::Bits16 => 16,
            WordWidth::Bits32 => 32,
        }
    }

    /// Number of bytes in a full word
    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl Default for WordWidth {
    fn default() -> Self {
        WordWidth::Bits32
    }
}

impl TryFrom<u8> for WordWidth {
    type Error = TncError;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(WordWidth::Bits8),
            16 => Ok(WordWidth::Bits16),
            32 => Ok(WordWidth::Bits32),
            other => Err(TncError::Hdlc(format!(
                "word width must be 8, 16 or 32 bits, got {}",
                other
            ))),
        }
    }
}
