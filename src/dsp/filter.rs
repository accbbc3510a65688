//! # FIR Filters
//!
//! Windowed-sinc FIR design and a Q15 fixed-point filter with a per-instance
//! delay line. Coefficients are shared between ports; delay lines are not.

use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{Result, TncError};

/// Fixed-point scale of the coefficients (Q15)
const COEFF_SCALE: f64 = 32768.0;

/// FIR design parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    /// Number of taps
    pub taps: usize,

    /// Sampling frequency in Hz
    pub sampling_freq: u32,

    /// Lower passband edge in Hz; 0 designs a low-pass filter
    pub pass_freq: u32,

    /// Upper cutoff in Hz
    pub cutoff_freq: u32,
}

/// Shared, read-only filter coefficients
pub type Coefficients = Arc<[i16]>;

/// Ideal low-pass impulse response at tap offset `m`
fn sinc_lowpass(cutoff: f64, m: f64) -> f64 {
    if m == 0.0 {
        2.0 * cutoff
    } else {
        (2.0 * PI * cutoff * m).sin() / (PI * m)
    }
}

/// Design Q15 coefficients for a low-pass or band-pass FIR filter
///
/// A Hamming window is applied to the ideal response. With `pass_freq == 0`
/// the result is a low-pass filter at `cutoff_freq`; otherwise it passes
/// `pass_freq..cutoff_freq`.
///
/// # Errors
///
/// Returns error if there are no taps or the band edges are not
/// `0 <= pass_freq < cutoff_freq < sampling_freq / 2`.
///
/// # Examples
///
/// ```
/// use fx25_tnc::dsp::filter::{design, FilterParams};
///
/// let lpf = design(&FilterParams {
///     taps: 31,
///     sampling_freq: 13200,
///     pass_freq: 0,
///     cutoff_freq: 1200,
/// })
/// .unwrap();
/// assert_eq!(lpf.len(), 31);
/// ```
pub fn design(params: &FilterParams) -> Result<Coefficients> {
    if params.taps == 0 {
        return Err(TncError::Filter("filter needs at least one tap".to_string()));
    }

    if params.pass_freq >= params.cutoff_freq
        || u64::from(params.cutoff_freq) * 2 >= u64::from(params.sampling_freq)
    {
        return Err(TncError::Filter(format!(
            "invalid filter band {}-{} Hz at {} Hz sampling",
            params.pass_freq, params.cutoff_freq, params.sampling_freq
        )));
    }

    let fs = params.sampling_freq as f64;
    let high = params.cutoff_freq as f64 / fs;
    let low = params.pass_freq as f64 / fs;
    let center = (params.taps - 1) as f64 / 2.0;

    let coeffs: Vec<i16> = (0..params.taps)
        .map(|n| {
            let m = n as f64 - center;
            let ideal = if params.pass_freq == 0 {
                sinc_lowpass(high, m)
            } else {
                sinc_lowpass(high, m) - sinc_lowpass(low, m)
            };
            let window = if params.taps > 1 {
                0.54 - 0.46 * (2.0 * PI * n as f64 / (params.taps - 1) as f64).cos()
            } else {
                1.0
            };
            (ideal * window * COEFF_SCALE)
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect();

    Ok(coeffs.into())
}

/// FIR filter instance: shared coefficients, private delay line
#[derive(Debug, Clone)]
pub struct FirFilter {
    coeffs: Coefficients,
    delay: Vec<i32>,
    head: usize,
}

impl FirFilter {
    /// Create a filter with a zeroed delay line
    pub fn new(coeffs: Coefficients) -> Self {
        let len = coeffs.len();
        Self {
            coeffs,
            delay: vec![0; len],
            head: 0,
        }
    }

    /// Number of taps
    pub fn taps(&self) -> usize {
        self.coeffs.len()
    }

    /// Shared coefficient table
    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    /// Push one sample and return the filtered output
    pub fn process(&mut self, sample: i32) -> i32 {
        let len = self.delay.len();
        if len == 0 {
            return 0;
        }

        self.delay[self.head] = sample;

        // delay[head] is the newest sample and pairs with coeffs[0]
        let mut acc: i64 = 0;
        for (k, &c) in self.coeffs.iter().enumerate() {
            let idx = (self.head + len - k) % len;
            acc += c as i64 * self.delay[idx] as i64;
        }

        self.head = (self.head + 1) % len;
        (acc >> 15) as i32
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        self.delay.iter_mut().for_each(|x| *x = 0);
        self.head = 0;
    }
}
