//! # Analog Sample Sources
//!
//! The analog front end delivers 16-bit words: on multi-channel boards the
//! top four bits tag the ADC channel and the low twelve bits carry the
//! sample; on codec boards each word is a signed 16-bit sample.

use std::io::Read;
use tracing::info;

use crate::error::{Result, TncError};

/// Batch-oriented sample input
#[cfg_attr(test, mockall::automock)]
pub trait SampleSource: Send {
    /// Block until the next batch is available and copy it into `buf`
    ///
    /// Returns the number of samples written.
    fn read_batch(&mut self, buf: &mut [u16]) -> Result<usize>;
}

/// Sample source reading little-endian 16-bit words from a byte stream
///
/// Used to replay captured front-end data. When the stream ends the source
/// blocks forever, like an idle front end.
pub struct ReaderSampleSource<R> {
    reader: R,
    scratch: Vec<u8>,
    pending: Option<u8>,
}

impl<R: Read + Send> ReaderSampleSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            scratch: Vec::new(),
            pending: None,
        }
    }

    fn wait_forever() -> ! {
        info!("Sample input exhausted, waiting");
        loop {
            std::thread::park();
        }
    }
}

impl<R: Read + Send> SampleSource for ReaderSampleSource<R> {
    fn read_batch(&mut self, buf: &mut [u16]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let start = self.pending.is_some() as usize;
        self.scratch.resize(buf.len() * 2, 0);
        if let Some(byte) = self.pending.take() {
            self.scratch[0] = byte;
        }

        let read = self
            .reader
            .read(&mut self.scratch[start..])
            .map_err(|e| TncError::Acquisition(format!("read failed: {}", e)))?;

        if read == 0 {
            Self::wait_forever();
        }

        let available = start + read;
        let samples = available / 2;
        for (slot, pair) in buf.iter_mut().zip(self.scratch[..samples * 2].chunks_exact(2)) {
            *slot = u16::from_le_bytes([pair[0], pair[1]]);
        }

        if available % 2 == 1 {
            self.pending = Some(self.scratch[available - 1]);
        }

        Ok(samples)
    }
}
