//! Bounded queue of decoded channel messages.
//!
//! One writer (the decoder, on the I/O task) and one reader (the real-time
//! consumer). On overflow the newest message is dropped and counted; the
//! count is shared so the reader can observe loss.

use crate::message::ChannelMessage;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const DEFAULT_CAPACITY: usize = 128;

/// Writer side, owned by the decoder.
pub struct MessageProducer {
    producer: HeapProd<ChannelMessage>,
    dropped: Arc<AtomicU64>,
}

impl MessageProducer {
    /// Returns `false` (and counts the loss) if the queue is full.
    #[inline]
    pub fn push(&mut self, message: ChannelMessage) -> bool {
        if self.producer.try_push(message).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Reader side, owned by the real-time consumer.
pub struct MessageReceiver {
    consumer: HeapCons<ChannelMessage>,
    dropped: Arc<AtomicU64>,
}

impl MessageReceiver {
    /// Oldest completed message, if any.
    #[inline]
    pub fn pop(&mut self) -> Option<ChannelMessage> {
        self.consumer.try_pop()
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    /// Total messages lost to overflow since the queue was created.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Copies pending messages into `buf` without allocating. Returns the count.
    #[inline]
    pub fn pop_into(&mut self, buf: &mut [ChannelMessage]) -> usize {
        self.consumer.pop_slice(buf)
    }

    /// Allocates; not for the real-time thread.
    pub fn drain_all(&mut self) -> Vec<ChannelMessage> {
        let mut messages = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            messages.push(message);
        }
        messages
    }
}

pub fn message_queue() -> (MessageProducer, MessageReceiver) {
    message_queue_with_capacity(DEFAULT_CAPACITY)
}

/// A `capacity` of zero is raised to one.
pub fn message_queue_with_capacity(capacity: usize) -> (MessageProducer, MessageReceiver) {
    let rb = HeapRb::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        MessageProducer {
            producer,
            dropped: Arc::clone(&dropped),
        },
        MessageReceiver { consumer, dropped },
    )
}
