//! Interrupt-Context Handoff
//!
//! ## Overview
//!
//! The radio stack calls back from a higher-priority context than the main
//! loop. Those callbacks may only hand data over; they never block and never
//! touch pipeline state. Two lock-free primitives cover both directions:
//!
//! ```text
//!   radio callback (ISR)                       main loop
//!   ────────────────────                       ─────────
//!   RadioEventSender ──── spsc queue ────────→ RadioEventReceiver
//!                                              (NodeContext::service_radio_events)
//!
//!   PayloadSnapshot::read ←── seqlock ──────── PayloadSnapshot::publish
//! ```
//!
//! ## Event Channel
//!
//! A `heapless::spsc::Queue` split into one producer and one consumer. When
//! the loop falls behind and the queue fills, new events are dropped and
//! counted rather than overwriting unread ones.
//!
//! ## Payload Snapshot
//!
//! The last encoded status packet, readable from any context. The single
//! writer bumps a version counter to odd before writing and back to even
//! after; a reader retries while the version is odd or changed underneath
//! it. Reads give up after a bounded number of attempts instead of spinning.
//!
//! ## Usage Example
//!
//! ```rust
//! use adbeacon_core::handoff::{RadioEvent, RadioEventChannel};
//!
//! let mut channel: RadioEventChannel<8> = RadioEventChannel::new();
//! let (mut tx, mut rx) = channel.split();
//!
//! // In the radio callback
//! tx.send(RadioEvent::AdvertisingSent);
//!
//! // In the main loop
//! assert_eq!(rx.recv(), Some(RadioEvent::AdvertisingSent));
//! ```

use core::sync::atomic::{fence, AtomicU32, AtomicU8, Ordering};

use heapless::spsc::{Consumer, Producer, Queue};

use crate::codec::PACKET_LEN;
use crate::errors::RadioError;

/// Reader attempts before [`PayloadSnapshot::read`] gives up
pub const SNAPSHOT_READ_RETRIES: usize = 8;

/// Notification raised by the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    /// One advertising event went out
    AdvertisingSent,
    /// The advertising set stopped (e.g. torn down for reconfiguration)
    AdvertisingStopped,
    /// The stack reported a failure asynchronously
    Fault(RadioError),
}

/// Bounded single-producer/single-consumer event queue
///
/// Holds at most `N - 1` events.
pub struct RadioEventChannel<const N: usize> {
    queue: Queue<RadioEvent, N>,
    dropped: AtomicU32,
}

impl<const N: usize> RadioEventChannel<N> {
    /// Create an empty channel; usable in a `static`
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Split into the callback-side sender and the loop-side receiver
    pub fn split(&mut self) -> (RadioEventSender<'_, N>, RadioEventReceiver<'_, N>) {
        let dropped = &self.dropped;
        let (producer, consumer) = self.queue.split();
        (
            RadioEventSender { producer, dropped },
            RadioEventReceiver { consumer, dropped },
        )
    }
}

impl<const N: usize> Default for RadioEventChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half, owned by the radio callback
pub struct RadioEventSender<'a, const N: usize> {
    producer: Producer<'a, RadioEvent, N>,
    dropped: &'a AtomicU32,
}

impl<'a, const N: usize> RadioEventSender<'a, N> {
    /// Enqueue an event; returns `false` and counts a drop when full
    pub fn send(&mut self, event: RadioEvent) -> bool {
        match self.producer.enqueue(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer half, owned by the main loop
pub struct RadioEventReceiver<'a, const N: usize> {
    consumer: Consumer<'a, RadioEvent, N>,
    dropped: &'a AtomicU32,
}

impl<'a, const N: usize> RadioEventReceiver<'a, N> {
    /// Take the oldest pending event
    pub fn recv(&mut self) -> Option<RadioEvent> {
        self.consumer.dequeue()
    }

    /// Events waiting
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events lost to a full queue since boot
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Last published status payload, shared with callback context
pub struct PayloadSnapshot {
    bytes: [AtomicU8; PACKET_LEN],
    version: AtomicU32,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_BYTE: AtomicU8 = AtomicU8::new(0);

impl PayloadSnapshot {
    /// Empty snapshot; usable in a `static`
    pub const fn new() -> Self {
        Self {
            bytes: [EMPTY_BYTE; PACKET_LEN],
            version: AtomicU32::new(0),
        }
    }

    /// Replace the payload
    ///
    /// Must only be called from one context (the main loop).
    pub fn publish(&self, payload: &[u8; PACKET_LEN]) {
        let v = self.version.load(Ordering::Relaxed);
        self.version.store(v.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        for (slot, byte) in self.bytes.iter().zip(payload.iter()) {
            slot.store(*byte, Ordering::Relaxed);
        }

        self.version.store(v.wrapping_add(2), Ordering::Release);
    }

    /// Consistent copy of the payload
    ///
    /// `None` if nothing was published yet, or if every attempt raced a
    /// writer.
    pub fn read(&self) -> Option<[u8; PACKET_LEN]> {
        for _ in 0..SNAPSHOT_READ_RETRIES {
            let before = self.version.load(Ordering::Acquire);
            if before == 0 {
                return None;
            }
            if before % 2 == 1 {
                core::hint::spin_loop();
                continue;
            }

            let mut out = [0u8; PACKET_LEN];
            for (dst, slot) in out.iter_mut().zip(self.bytes.iter()) {
                *dst = slot.load(Ordering::Relaxed);
            }

            fence(Ordering::Acquire);
            if self.version.load(Ordering::Relaxed) == before {
                return Some(out);
            }
        }
        None
    }

    /// Number of completed publishes
    pub fn publishes(&self) -> u32 {
        self.version.load(Ordering::Acquire) / 2
    }
}

impl Default for PayloadSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
