//! # CRC-16/X.25 Frame Check Sequence
//!
//! AX.25 frame check sequence calculation.
//!
//! **Polynomial**: 0x1021, processed reflected as 0x8408
//! **Initial Value**: 0xFFFF (the complement of a zero seed)
//! **Input / Output**: bit-reflected
//! **Final XOR**: 0xFFFF
//!
//! The FCS is transmitted low byte first.

/// Reflected CRC-16/CCITT polynomial
const FCS_POLY: u16 = 0x8408;

/// Register preset, written as the complement of a zero seed
const FCS_SEED: u16 = 0x0000;

/// Precomputed FCS lookup table for fast calculation
const FCS_TABLE: [u16; 256] = generate_fcs_table();

/// Generate the reflected FCS lookup table at compile time
const fn generate_fcs_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ FCS_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-16/X.25 frame check sequence using the lookup table
///
/// # Arguments
///
/// * `data` - Frame payload (addresses through information field)
///
/// # Returns
///
/// * `u16` - FCS value; send `fcs as u8` first, then `(fcs >> 8) as u8`
///
/// # Examples
///
/// ```
/// use fx25_tnc::hdlc::fcs::crc16_x25;
///
/// assert_eq!(crc16_x25(b"123456789"), 0x906E);
/// assert_eq!(crc16_x25(&[]), 0x0000);
/// ```
pub fn crc16_x25(data: &[u8]) -> u16 {
    let mut crc = !FCS_SEED;

    for &byte in data {
        crc = (crc >> 8) ^ FCS_TABLE[((crc ^ byte as u16) & 0x00FF) as usize];
    }

    !crc
}

/// Calculate CRC-16/X.25 bit by bit (slow, for verification)
#[allow(dead_code)]
fn crc16_x25_slow(data: &[u8]) -> u16 {
    let mut crc = !FCS_SEED;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ FCS_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

/// Split an FCS into its on-air byte order (low byte first)
pub fn fcs_bytes(fcs: u16) -> [u8; 2] {
    fcs.to_le_bytes()
}
