//! Lock-free SPSC byte rings between the background I/O task and the real-time side.
//!
//! - Input: I/O task (producer) -> real-time reader or decoder (consumer)
//! - Output: real-time encoder (producer) -> I/O task (consumer)
//!
//! Occupied/vacant lengths are tracked by `ringbuf`, so a full ring and an
//! empty ring are always distinguishable.

use crate::error::{Error, Result};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Producer side of a byte ring.
pub struct ByteProducer {
    producer: HeapProd<u8>,
}

impl ByteProducer {
    /// Accepts as many leading bytes as fit and drops the rest.
    ///
    /// Returns the number of bytes accepted.
    #[inline]
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.producer.push_slice(bytes)
    }

    /// Writes all of `bytes` or nothing.
    #[inline]
    pub fn try_write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.producer.vacant_len();
        if bytes.len() > available {
            return Err(Error::OutputBufferFull {
                needed: bytes.len(),
                available,
            });
        }
        self.producer.push_slice(bytes);
        Ok(())
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.producer
            .try_push(byte)
            .map_err(|_| Error::OutputBufferFull {
                needed: 1,
                available: 0,
            })
    }

    #[inline]
    pub fn vacant_len(&self) -> usize {
        self.producer.vacant_len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }
}

/// Consumer side of a byte ring.
pub struct ByteConsumer {
    consumer: HeapCons<u8>,
}

impl ByteConsumer {
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        self.consumer.try_pop()
    }

    /// Copies up to `buf.len()` bytes out of the ring. Returns the count copied.
    #[inline]
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.consumer.pop_slice(buf)
    }

    /// Unread bytes as two contiguous runs (the second is non-empty only on wrap).
    #[inline]
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        self.consumer.as_slices()
    }

    /// Marks `count` bytes as consumed without copying them.
    #[inline]
    pub fn advance(&mut self, count: usize) -> usize {
        self.consumer.skip(count)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.consumer.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        self.consumer.clear()
    }
}

/// Creates a byte ring holding up to `capacity` unread bytes.
pub fn byte_ring(capacity: usize) -> Result<(ByteProducer, ByteConsumer)> {
    if capacity == 0 {
        return Err(Error::InvalidCapacity(capacity));
    }
    let rb = HeapRb::<u8>::new(capacity);
    let (producer, consumer) = rb.split();
    Ok((ByteProducer { producer }, ByteConsumer { consumer }))
}
