//! # Transmit Queue
//!
//! Bounded per-port FIFO between the frame encoder and the bit-clock
//! consumer. Both sides block; neither side has a timeout.

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use tracing::debug;

use super::encoder::{encode_frame, FrameStats};
use super::protocol::WordWidth;
use crate::error::{Result, TncError};

/// Producer side of a port's transmit queue
#[derive(Debug)]
pub struct TxQueue {
    port: usize,
    width: WordWidth,
    capacity: usize,
    tx: Sender<Bytes>,
}

/// Consumer side of a port's transmit queue
///
/// Handed to the bit-clock / PTT task, which drains words in order.
#[derive(Debug)]
pub struct TxReceiver {
    port: usize,
    rx: Receiver<Bytes>,
}

/// Create a bounded transmit queue for one port
///
/// # Arguments
///
/// * `port` - Port index the queue belongs to (for diagnostics)
/// * `capacity` - Number of queue items before the producer blocks
/// * `width` - Word width used when packing encoded bits
pub fn transmit_queue(port: usize, capacity: usize, width: WordWidth) -> (TxQueue, TxReceiver) {
    let (tx, rx) = channel::bounded(capacity);

    (
        TxQueue {
            port,
            width,
            capacity,
            tx,
        },
        TxReceiver { port, rx },
    )
}

impl TxQueue {
    /// Encode a frame payload and enqueue its words
    ///
    /// Blocks while the queue is full. A zero-length payload enqueues nothing.
    /// Not internally serialized: callers keep at most one frame in flight
    /// per queue, otherwise words of concurrent frames interleave.
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` if the consumer side has been dropped.
    pub fn send_frame(&self, payload: &[u8]) -> Result<FrameStats> {
        let stats = encode_frame(payload, self.width, |item| {
            self.tx
                .send(item)
                .map_err(|_| TncError::QueueClosed(self.port))
        })?;

        if stats.queue_items > 0 {
            debug!(
                "port {}: queued frame of {} bytes ({} bits, {} stuffed, {} items)",
                self.port,
                payload.len(),
                stats.bits,
                stats.stuffed_bits,
                stats.queue_items
            );
        }

        Ok(stats)
    }

    /// Word width used for this queue
    pub fn width(&self) -> WordWidth {
        self.width
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items waiting for the consumer
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the consumer has drained everything
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl TxReceiver {
    /// Block until the next word is available
    ///
    /// Returns `None` once the producer side is gone and the queue is drained.
    pub fn recv(&self) -> Option<Bytes> {
        self.rx.recv().ok()
    }

    /// Take the next word if one is queued
    pub fn try_recv(&self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued without blocking
    pub fn drain(&self) -> Vec<Bytes> {
        self.rx.try_iter().collect()
    }

    /// Port index the queue belongs to
    pub fn port(&self) -> usize {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_send_frame_enqueues_words() {
        let (queue, receiver) = transmit_queue(0, 16, WordWidth::Bits32);
        let stats = queue.send_frame(&[0x00]).unwrap();

        assert_eq!(stats.queue_items, 2);
        assert_eq!(queue.len(), 2);

        let items = receiver.drain();
        assert_eq!(&items[0][..], &[0x7E]);
        assert_eq!(&items[1][..], &[0x00, 0x78, 0xF0, 0x7E]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_payload_enqueues_nothing() {
        let (queue, receiver) = transmit_queue(1, 4, WordWidth::Bits8);
        let stats = queue.send_frame(&[]).unwrap();

        assert_eq!(stats.queue_items, 0);
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_closed_consumer_reports_port() {
        let (queue, receiver) = transmit_queue(3, 4, WordWidth::Bits8);
        drop(receiver);

        match queue.send_frame(b"test") {
            Err(TncError::QueueClosed(port)) => assert_eq!(port, 3),
            other => panic!("Expected QueueClosed, got: {:?}", other),
        }
    }

    #[test]
    fn test_full_queue_blocks_until_drained() {
        // Capacity 1 forces the producer to wait for every word
        let (queue, receiver) = transmit_queue(0, 1, WordWidth::Bits8);
        let payload = vec![0x55u8; 64];
        let expected = crate::hdlc::encoder::encode_frame_to_vec(&payload, WordWidth::Bits8);

        let consumer = thread::spawn(move || {
            let mut received = Vec::new();
            while let Some(item) = receiver.recv() {
                received.push(item);
            }
            received
        });

        let stats = queue.send_frame(&payload).unwrap();
        drop(queue);

        let received = consumer.join().unwrap();
        assert_eq!(received.len(), stats.queue_items);
        assert_eq!(received, expected);
    }

    #[test]
    fn test_queue_accessors() {
        let (queue, receiver) = transmit_queue(5, 32, WordWidth::Bits16);
        assert_eq!(queue.capacity(), 32);
        assert_eq!(queue.width(), WordWidth::Bits16);
        assert_eq!(receiver.port(), 5);
    }
}
