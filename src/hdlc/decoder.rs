//! # HDLC Frame Decoder
//!
//! Recovers a frame payload from an encoded transmit stream. Used to verify
//! transmit output in loopback.

use super::fcs::crc16_x25;
use super::protocol::{AX25_FLAG, FCS_LEN};
use crate::error::{Result, TncError};

/// Decode one HDLC frame from a packed bitstream
///
/// The input is the concatenation of transmit queue items: bits are read
/// LSB first, the first flag opens the frame, stuffed zeros are removed and
/// the next flag closes it. The FCS is verified and stripped.
///
/// # Arguments
///
/// * `stream` - Encoded bytes (start flag, packed words)
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Frame payload without FCS
///
/// # Errors
///
/// Returns error if:
/// - No opening or closing flag is found
/// - Seven or more consecutive ones appear (abort sequence)
/// - The frame is not a whole number of bytes
/// - The frame is shorter than the FCS or the FCS does not match
///
/// # Examples
///
/// ```
/// use fx25_tnc::hdlc::decoder::decode_frame;
///
/// let stream = [0x7E, 0x00, 0x78, 0xF0, 0x7E];
/// assert_eq!(decode_frame(&stream).unwrap(), vec![0x00]);
/// ```
pub fn decode_frame(stream: &[u8]) -> Result<Vec<u8>> {
    let mut bits = stream
        .iter()
        .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1 == 1));

    // Hunt for the opening flag
    let mut shift: u8 = 0;
    let mut opened = false;
    for bit in bits.by_ref() {
        shift = (shift >> 1) | ((bit as u8) << 7);
        if shift == AX25_FLAG {
            opened = true;
            break;
        }
    }

    if !opened {
        return Err(TncError::Hdlc("No opening flag found".to_string()));
    }

    let mut frame_bits: Vec<bool> = Vec::new();
    let mut ones = 0;
    let mut closed = false;

    for bit in bits {
        if bit {
            ones += 1;
            if ones > 6 {
                return Err(TncError::Hdlc("Abort sequence in frame".to_string()));
            }
            frame_bits.push(true);
            continue;
        }

        match ones {
            // Stuffed zero
            5 => {}
            // Closing flag: drop its leading zero and six ones
            6 => {
                frame_bits.truncate(frame_bits.len().saturating_sub(7));
                closed = true;
                break;
            }
            _ => frame_bits.push(false),
        }
        ones = 0;
    }

    if !closed {
        return Err(TncError::Hdlc("No closing flag found".to_string()));
    }

    if frame_bits.len() % 8 != 0 {
        return Err(TncError::Hdlc(format!(
            "Frame is not byte aligned: {} bits",
            frame_bits.len()
        )));
    }

    let frame: Vec<u8> = frame_bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit as u8) << i))
        })
        .collect();

    if frame.len() <= FCS_LEN {
        return Err(TncError::Hdlc(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }

    let (payload, fcs) = frame.split_at(frame.len() - FCS_LEN);
    let received = u16::from_le_bytes([fcs[0], fcs[1]]);
    let calculated = crc16_x25(payload);

    if received != calculated {
        return Err(TncError::Hdlc(format!(
            "FCS mismatch: expected 0x{:04X}, got 0x{:04X}",
            calculated, received
        )));
    }

    Ok(payload.to_vec())
}
