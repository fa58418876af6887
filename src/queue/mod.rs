//! Fan-out buffer queue: one producing thread, many independent readers.
//!
//! A [`Producer`] sits between the media-parser thread and the per-session
//! serving threads. The parser appends access units; each session walks the
//! same queue through its own [`Consumer`] cursor, at its own pace:
//!
//! ```text
//! demuxer/parser ──put──► Producer queue ──get──► session thread 1
//!                              │        ──get──► session thread 2
//!                              │        ──get──► ...
//! ```
//!
//! A payload is released exactly once: when the last currently-registered
//! consumer advances past its element (head-only, FIFO order), or en masse
//! when the queue is reset, abandoned, or stopped.
//!
//! ## Lifecycle
//!
//! ```text
//! Producer::new            -> empty queue, zero consumers
//! register_consumer        -> new cursor (refused once stopped)
//! put                      -> element appended, blocked readers woken
//! reset_queue              -> contents discarded, cursors resynchronize
//! stop                     -> no new data/consumers; blocks until the
//!                             last consumer departs, then flushes
//! Consumer drop            -> owed view settled, count decremented
//! ```
//!
//! All mutation is serialized by a single `parking_lot::Mutex`; two
//! condvars cover the only blocking points (new data for `get`, last
//! consumer departed for `stop`).

pub(crate) mod element;

mod consumer;
mod producer;

pub use consumer::Consumer;
pub use producer::{Producer, StreamHandle};

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use element::ElementQueue;

/// Hook invoked exactly once per payload, at the moment its element leaves
/// the queue. Runs under the producer lock; must not call back into the
/// queue.
pub(crate) type ReleaseFn<T> = Box<dyn FnMut(Arc<T>) + Send>;

/// Everything a producer and its consumers share.
pub(crate) struct Shared<T> {
    pub(crate) state: Mutex<State<T>>,
    /// Signalled (broadcast) on every `put` and on stop.
    pub(crate) new_data: Condvar,
    /// Signalled when a stopped producer loses its last consumer.
    pub(crate) drained: Condvar,
}

/// Mutex-guarded queue state.
pub(crate) struct State<T> {
    pub(crate) queue: ElementQueue<T>,
    pub(crate) consumer_count: usize,
    pub(crate) stopped: bool,
    release: ReleaseFn<T>,
}

impl<T> Shared<T> {
    pub(crate) fn new(release: ReleaseFn<T>) -> Self {
        Self {
            state: Mutex::new(State {
                queue: ElementQueue::new(),
                consumer_count: 0,
                stopped: false,
                release,
            }),
            new_data: Condvar::new(),
            drained: Condvar::new(),
        }
    }
}

impl<T> State<T> {
    /// Settle one owed view on `seq`: bump its seen count and release the
    /// element if that was the view that retires it (see
    /// `ElementQueue::note_seen`).
    pub(crate) fn resolve_view(&mut self, seq: u64) {
        if let Some(payload) = self.queue.note_seen(seq, self.consumer_count) {
            (self.release)(payload);
        }
    }

    /// Release every queued element, keeping the queue identity. Returns
    /// how many were released.
    pub(crate) fn flush(&mut self) -> usize {
        let payloads = self.queue.drain_all();
        let released = payloads.len();
        for payload in payloads {
            (self.release)(payload);
        }
        released
    }

    /// Release every queued element and start a new queue instance.
    /// Returns how many were released.
    pub(crate) fn reset(&mut self) -> usize {
        let payloads = self.queue.reset();
        let released = payloads.len();
        for payload in payloads {
            (self.release)(payload);
        }
        released
    }
}
