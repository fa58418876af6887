use std::sync::Arc;

use super::Shared;

/// One independent reader cursor over a [`Producer`](super::Producer)'s
/// queue.
///
/// Each connected session owns one. Cursors advance at their own pace and
/// never interfere with each other; the only shared cost is the producer
/// lock. Dropping the consumer settles its outstanding view obligation and
/// unregisters it — a consumer owes the queue exactly one "seen" increment
/// for the element it currently holds, paid either by advancing or by
/// departing.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    /// Queue instance last iterated; a mismatch with the live queue means
    /// the producer reset and this cursor must resynchronize to the head.
    last_generation: Option<u64>,
    /// Element last returned to the caller, by sequence number.
    current_seq: Option<u64>,
}

impl<T> Consumer<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self {
            shared,
            last_generation: None,
            current_seq: None,
        }
    }

    /// Blocking read of the next element beyond the one currently held.
    ///
    /// On the first call, or after a producer-side reset, the target is
    /// the current queue head instead. When the queue is exhausted the
    /// call blocks until the producer puts more data or stops; `None`
    /// means end of stream (producer stopped and this cursor has passed
    /// the last element).
    ///
    /// The returned view is shared and read-only; the payload's release is
    /// the queue's business, not the caller's.
    pub fn get(&mut self) -> Option<Arc<T>> {
        let mut state = self.shared.state.lock();
        loop {
            // A new queue instance invalidates the cursor; any obligation
            // on the old instance died with its elements.
            if self.last_generation != Some(state.queue.generation()) {
                if self.last_generation.is_some() {
                    tracing::debug!(
                        generation = state.queue.generation(),
                        "reset detected, cursor resynchronized to head"
                    );
                    self.current_seq = None;
                }
                self.last_generation = Some(state.queue.generation());
            }

            let target = match self.current_seq {
                None => state.queue.head_seq(),
                Some(seq) => seq + 1,
            };

            if state.queue.contains(target) {
                // Settle the owed view on the previous element before
                // publishing the new one; this is the increment that may
                // retire the old head.
                if let Some(prev) = self.current_seq {
                    state.resolve_view(prev);
                }
                self.current_seq = Some(target);
                return state.queue.payload_at(target);
            }

            if state.stopped {
                return None;
            }

            self.shared.new_data.wait(&mut state);
        }
    }

    /// How far behind the producer's tail this cursor currently is.
    ///
    /// Producing threads use this to pace themselves, e.g. stop parsing
    /// once a session's backlog crosses a threshold. Grows with every
    /// `put`, shrinks back as the consumer advances.
    pub fn unseen_count(&self) -> usize {
        let state = self.shared.state.lock();
        if self.last_generation == Some(state.queue.generation()) {
            state.queue.backlog_after(self.current_seq)
        } else {
            state.queue.len()
        }
    }
}

impl<T> Drop for Consumer<T> {
    /// Disconnect: settle the owed view, unregister, and perform whatever
    /// cleanup the departure triggers — waking a blocked
    /// [`Producer::stop`](super::Producer::stop) when this was the last
    /// consumer of a stopped queue, or flushing a live queue nobody reads
    /// anymore.
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();

        if self.last_generation == Some(state.queue.generation())
            && let Some(seq) = self.current_seq
        {
            state.resolve_view(seq);
        }

        state.consumer_count -= 1;
        let remaining = state.consumer_count;
        tracing::debug!(consumers = remaining, "consumer unregistered");

        if remaining == 0 {
            let released = state.flush();
            if state.stopped {
                if released > 0 {
                    tracing::debug!(released, "last consumer departed, queue drained");
                }
                drop(state);
                self.shared.drained.notify_all();
            } else if released > 0 {
                tracing::debug!(released, "queue abandoned, contents released");
            }
        }
    }
}
