//! # HDLC Frame Encoder
//!
//! Turns an AX.25 frame payload into the bit-stuffed, FCS-protected bitstream
//! consumed by the transmit clock.
//!
//! ## Output layout
//!
//! ```text
//! item 0     : 0x7E                    (start flag, its own 1-byte item)
//! item 1..n  : stuffed(payload ++ FCS lo ++ FCS hi) ++ 0x7E
//!              packed LSB first into words of the configured width
//! last item  : trailing partial word, truncated to whole bytes
//! ```

use bytes::Bytes;
use std::convert::Infallible;

use super::fcs::{crc16_x25, fcs_bytes};
use super::protocol::{WordWidth, AX25_FLAG, BIT_STUFFING_BITS};

/// Start flag queue item
const START_FLAG: &[u8] = &[AX25_FLAG];

/// Counters describing one encoded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Bits emitted after the start flag (stuffed body plus end flag)
    pub bits: usize,

    /// Zero bits inserted by bit stuffing
    pub stuffed_bits: usize,

    /// Items handed to the transmit queue, start flag included
    pub queue_items: usize,
}

/// Accumulates bits LSB first into fixed-width words
struct BitPacker {
    width: WordWidth,
    word: u32,
    bits: u32,
}

impl BitPacker {
    fn new(width: WordWidth) -> Self {
        Self {
            width,
            word: 0,
            bits: 0,
        }
    }

    /// Append one bit, emitting the word once it is full
    fn push<E, F>(&mut self, bit: bool, emit: &mut F) -> Result<bool, E>
    where
        F: FnMut(Bytes) -> Result<(), E>,
    {
        self.word |= (bit as u32) << self.bits;
        self.bits += 1;

        if self.bits < self.width.bits() {
            return Ok(false);
        }

        let bytes = self.word.to_le_bytes();
        emit(Bytes::copy_from_slice(&bytes[..self.width.bytes()]))?;
        self.word = 0;
        self.bits = 0;
        Ok(true)
    }

    /// Emit any remaining bits as the minimal number of whole bytes
    fn finish<E, F>(self, emit: &mut F) -> Result<bool, E>
    where
        F: FnMut(Bytes) -> Result<(), E>,
    {
        if self.bits == 0 {
            return Ok(false);
        }

        let byte_len = self.bits.div_ceil(8) as usize;
        let bytes = self.word.to_le_bytes();
        emit(Bytes::copy_from_slice(&bytes[..byte_len]))?;
        Ok(true)
    }
}

/// Encode one frame payload, handing each queue item to `emit` in order
///
/// The FCS is computed over `payload` and appended low byte first. Bit
/// stuffing covers payload and FCS as one continuous stream; the flags are
/// never stuffed. An empty payload produces nothing, not even flags.
///
/// `emit` is called once for the start flag and once per packed word. If it
/// fails, encoding stops and the error is returned.
///
/// # Arguments
///
/// * `payload` - Frame contents from the address field through the information field
/// * `width` - Word width of the transmit queue items
/// * `emit` - Receives each queue item (little-endian word bytes)
///
/// # Returns
///
/// * `Result<FrameStats, E>` - Counters for the encoded frame
///
/// # Examples
///
/// ```
/// use fx25_tnc::hdlc::encoder::encode_frame;
/// use fx25_tnc::hdlc::protocol::WordWidth;
///
/// let mut items = Vec::new();
/// encode_frame(&[0x00], WordWidth::Bits32, |item| {
///     items.push(item);
///     Ok::<(), std::convert::Infallible>(())
/// })
/// .unwrap();
///
/// assert_eq!(&items[0][..], &[0x7E]);
/// assert_eq!(&items[1][..], &[0x00, 0x78, 0xF0, 0x7E]);
/// ```
pub fn encode_frame<E, F>(payload: &[u8], width: WordWidth, mut emit: F) -> Result<FrameStats, E>
where
    F: FnMut(Bytes) -> Result<(), E>,
{
    let mut stats = FrameStats::default();

    if payload.is_empty() {
        return Ok(stats);
    }

    let fcs = fcs_bytes(crc16_x25(payload));

    emit(Bytes::from_static(START_FLAG))?;
    stats.queue_items += 1;

    let mut packer = BitPacker::new(width);
    let mut ones = 0u32;

    for &byte in payload.iter().chain(fcs.iter()) {
        for bit_index in 0..8 {
            let bit = (byte >> bit_index) & 1 == 1;
            stats.queue_items += packer.push(bit, &mut emit)? as usize;
            stats.bits += 1;

            if !bit {
                ones = 0;
                continue;
            }

            ones += 1;
            if ones == BIT_STUFFING_BITS {
                stats.queue_items += packer.push(false, &mut emit)? as usize;
                stats.bits += 1;
                stats.stuffed_bits += 1;
                ones = 0;
            }
        }
    }

    for bit_index in 0..8 {
        let bit = (AX25_FLAG >> bit_index) & 1 == 1;
        stats.queue_items += packer.push(bit, &mut emit)? as usize;
        stats.bits += 1;
    }

    stats.queue_items += packer.finish(&mut emit)? as usize;

    Ok(stats)
}

/// Encode one frame payload into a list of queue items
///
/// Convenience wrapper around [`encode_frame`] for callers that do not stream
/// into a queue.
///
/// # Examples
///
/// ```
/// use fx25_tnc::hdlc::encoder::encode_frame_to_vec;
/// use fx25_tnc::hdlc::protocol::WordWidth;
///
/// assert!(encode_frame_to_vec(&[], WordWidth::Bits8).is_empty());
/// assert_eq!(encode_frame_to_vec(&[0x00], WordWidth::Bits8).len(), 5);
/// ```
pub fn encode_frame_to_vec(payload: &[u8], width: WordWidth) -> Vec<Bytes> {
    let mut items = Vec::new();
    let result = encode_frame(payload, width, |item| {
        items.push(item);
        Ok::<(), Infallible>(())
    });

    match result {
        Ok(_) => items,
        Err(never) => match never {},
    }
}
