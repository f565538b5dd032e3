//! Single-slot, overwrite-on-publish hand-off between a producer thread and
//! the tracking loop.
//!
//! The producer never blocks: publishing replaces whatever the consumer has
//! not taken yet, so the consumer only ever sees the newest value. The slot
//! closes once every [`SlotPublisher`] is dropped.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use marker_track_core::{BgrFrame, FrameError};

use crate::source::{FrameSource, NextFrame};

struct State<T> {
    value: Option<T>,
    publishers: usize,
    overwritten: u64,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of a bounded wait on a [`FrameSlot`].
#[derive(Debug, PartialEq, Eq)]
pub enum SlotRecv<T> {
    Value(T),
    /// Nothing arrived before the timeout.
    Empty,
    /// No publisher is left and the slot is drained.
    Closed,
}

/// Create a connected publisher / slot pair.
pub fn frame_slot<T>() -> (SlotPublisher<T>, FrameSlot<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            value: None,
            publishers: 1,
            overwritten: 0,
        }),
        ready: Condvar::new(),
    });
    (
        SlotPublisher {
            shared: Arc::clone(&shared),
        },
        FrameSlot { shared },
    )
}

/// Producer end. Cloning adds a publisher; the slot stays open while any
/// clone is alive.
pub struct SlotPublisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SlotPublisher<T> {
    /// Store `value`, replacing an undrained one. Returns `true` when a value
    /// was replaced.
    pub fn publish(&self, value: T) -> bool {
        let replaced = {
            let mut state = self.shared.lock();
            let replaced = state.value.replace(value).is_some();
            if replaced {
                state.overwritten += 1;
            }
            replaced
        };
        self.shared.ready.notify_one();
        replaced
    }
}

impl<T> Clone for SlotPublisher<T> {
    fn clone(&self) -> Self {
        self.shared.lock().publishers += 1;
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for SlotPublisher<T> {
    fn drop(&mut self) {
        let last = {
            let mut state = self.shared.lock();
            state.publishers -= 1;
            state.publishers == 0
        };
        if last {
            self.shared.ready.notify_all();
        }
    }
}

/// Consumer end.
pub struct FrameSlot<T> {
    shared: Arc<Shared<T>>,
}

impl<T> FrameSlot<T> {
    /// Block until a value is available. `None` once the slot is closed and
    /// drained.
    pub fn take(&self) -> Option<T> {
        let mut state = self.shared.lock();
        loop {
            if let Some(v) = state.value.take() {
                return Some(v);
            }
            if state.publishers == 0 {
                return None;
            }
            state = self
                .shared
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wait at most `timeout` for a value.
    pub fn take_timeout(&self, timeout: Duration) -> SlotRecv<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if let Some(v) = state.value.take() {
                return SlotRecv::Value(v);
            }
            if state.publishers == 0 {
                return SlotRecv::Closed;
            }
            let now = Instant::now();
            if now >= deadline {
                return SlotRecv::Empty;
            }
            state = self
                .shared
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking take.
    pub fn try_take(&self) -> SlotRecv<T> {
        self.take_timeout(Duration::ZERO)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().publishers == 0
    }

    /// Number of values replaced before the consumer took them.
    pub fn overwritten(&self) -> u64 {
        self.shared.lock().overwritten
    }
}

/// [`FrameSource`] over a slot of raw wire blobs.
pub struct SlotFrameSource {
    slot: FrameSlot<Vec<u8>>,
    width: usize,
    height: usize,
    poll: Duration,
}

impl SlotFrameSource {
    /// `poll` bounds how long one `next_frame` call waits before reporting
    /// [`NextFrame::NotAvailable`].
    pub fn new(slot: FrameSlot<Vec<u8>>, width: usize, height: usize, poll: Duration) -> Self {
        Self {
            slot,
            width,
            height,
            poll,
        }
    }
}

impl FrameSource for SlotFrameSource {
    fn next_frame(&mut self) -> Result<NextFrame, FrameError> {
        match self.slot.take_timeout(self.poll) {
            SlotRecv::Value(blob) => {
                BgrFrame::from_f32_le_bytes(self.width, self.height, &blob).map(NextFrame::Frame)
            }
            SlotRecv::Empty => Ok(NextFrame::NotAvailable),
            SlotRecv::Closed => Ok(NextFrame::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn publish_overwrites_undrained_value() {
        let (tx, rx) = frame_slot();
        assert!(!tx.publish(1));
        assert!(tx.publish(2));
        assert!(tx.publish(3));
        assert_eq!(rx.try_take(), SlotRecv::Value(3));
        assert_eq!(rx.try_take(), SlotRecv::Empty);
        assert_eq!(rx.overwritten(), 2);
    }

    #[test]
    fn closes_when_last_publisher_drops() {
        let (tx, rx) = frame_slot();
        let tx2 = tx.clone();
        tx.publish("a");
        drop(tx);
        assert!(!rx.is_closed());
        drop(tx2);
        assert!(rx.is_closed());
        // a pending value is still delivered before the close
        assert_eq!(rx.take(), Some("a"));
        assert_eq!(rx.take(), None);
        assert_eq!(rx.try_take(), SlotRecv::Closed);
    }

    #[test]
    fn take_blocks_until_published() {
        let (tx, rx) = frame_slot();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.publish(42u32);
        });
        assert_eq!(rx.take(), Some(42));
        producer.join().unwrap();
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn timeout_reports_empty() {
        let (_tx, rx) = frame_slot::<u8>();
        assert_eq!(rx.take_timeout(Duration::from_millis(5)), SlotRecv::Empty);
    }

    #[test]
    fn frame_source_decodes_and_rejects_malformed_blobs() {
        let (tx, rx) = frame_slot();
        let mut source = SlotFrameSource::new(rx, 2, 1, Duration::from_millis(1));
        assert_eq!(source.next_frame(), Ok(NextFrame::NotAvailable));

        tx.publish(BgrFrame::new(2, 1).to_f32_le_bytes());
        assert_eq!(source.next_frame(), Ok(NextFrame::Frame(BgrFrame::new(2, 1))));

        tx.publish(vec![0; 7]);
        assert_eq!(
            source.next_frame(),
            Err(FrameError::MalformedFrame {
                expected: 24,
                got: 7
            })
        );

        drop(tx);
        assert_eq!(source.next_frame(), Ok(NextFrame::Closed));
    }
}
