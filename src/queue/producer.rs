use std::sync::Arc;

use crate::error::{QueueError, Result};

use super::consumer::Consumer;
use super::{ReleaseFn, Shared};

/// The writing end of a fan-out queue.
///
/// Owned by the single producing thread (demuxer or media parser). Not
/// `Clone` — one writer per queue by construction. Session threads get
/// their own [`Consumer`] cursors, either directly via
/// [`subscribe`](Self::subscribe) or through a cloneable
/// [`StreamHandle`].
///
/// ```
/// use stream_fanout::Producer;
///
/// let producer: Producer<Vec<u8>> = Producer::new();
/// let mut consumer = producer.subscribe().unwrap();
///
/// producer.put(vec![1, 2, 3]);
/// assert_eq!(*consumer.get().unwrap(), vec![1, 2, 3]);
/// ```
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Create a producer whose payloads are simply dropped on release.
    pub fn new() -> Self {
        Self::with_release_hook(|_| {})
    }

    /// Create a producer with a release hook.
    ///
    /// The hook runs exactly once per payload, under the queue lock, at
    /// the moment the payload's element leaves the queue (last required
    /// view, reset, abandon, or stop). It must not call back into the
    /// queue.
    pub fn with_release_hook(hook: impl FnMut(Arc<T>) + Send + 'static) -> Self {
        Self {
            shared: Arc::new(Shared::new(Box::new(hook) as ReleaseFn<T>)),
        }
    }

    /// Append a payload at the queue tail and wake every blocked reader.
    ///
    /// Broadcast, not single wake: several consumers may each be waiting
    /// for any new tail element.
    pub fn put(&self, payload: T) {
        let mut state = self.shared.state.lock();
        assert!(!state.stopped, "put on a stopped producer");

        let seq = state.queue.push(Arc::new(payload));
        tracing::trace!(seq, queued = state.queue.len(), "payload queued");
        drop(state);

        self.shared.new_data.notify_all();
    }

    /// Register a new reader cursor on this queue.
    ///
    /// The cursor starts unbound; its first [`Consumer::get`] returns the
    /// element at the queue head *at that moment* — payloads already
    /// retired before registration are gone and are not replayed.
    ///
    /// Fails with [`QueueError::Stopped`] once the producer has stopped.
    pub fn subscribe(&self) -> Result<Consumer<T>> {
        subscribe(&self.shared)
    }

    /// A cloneable handle session threads can subscribe through while the
    /// producing thread keeps sole ownership of `self`.
    pub fn handle(&self) -> StreamHandle<T> {
        StreamHandle {
            shared: self.shared.clone(),
        }
    }

    /// Discard the queue contents outright and start a new queue instance.
    ///
    /// Every queued element is released immediately, regardless of how
    /// many consumers have seen it — a deliberate discontinuity, used when
    /// the data source seeks and in-flight payloads turn stale. Consumers
    /// detect the new instance on their next access and resynchronize to
    /// its head; no ordering guarantee spans the discontinuity.
    pub fn reset_queue(&self) {
        let mut state = self.shared.state.lock();
        let released = state.reset();
        tracing::debug!(
            released,
            generation = state.queue.generation(),
            "queue reset"
        );
    }

    /// Stop the queue and block until the last consumer departs.
    ///
    /// Consumes the handle: no further `put` or `reset_queue` is possible,
    /// and subscription attempts through surviving [`StreamHandle`]s fail.
    /// Every reader blocked in [`Consumer::get`] is woken and observes end
    /// of stream. Once the consumer count reaches zero, any residual
    /// elements are released and the call returns.
    pub fn stop(self) {
        self.mark_stopped();

        let mut state = self.shared.state.lock();
        while state.consumer_count > 0 {
            self.shared.drained.wait(&mut state);
        }
        let released = state.flush();
        tracing::debug!(released, "producer stopped and drained");
    }

    /// Number of elements currently queued (diagnostic).
    pub fn queue_len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Number of registered consumers (diagnostic).
    pub fn consumer_count(&self) -> usize {
        self.shared.state.lock().consumer_count
    }

    fn mark_stopped(&self) {
        let mut state = self.shared.state.lock();
        if !state.stopped {
            state.stopped = true;
            tracing::debug!(
                consumers = state.consumer_count,
                queued = state.queue.len(),
                "producer stopping"
            );
            drop(state);
            self.shared.new_data.notify_all();
        }
    }
}

impl<T> Default for Producer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Producer<T> {
    /// Dropping the handle without [`stop`](Self::stop) still ends the
    /// stream: blocked readers are woken to observe end of stream, and the
    /// residual flush falls to the last departing consumer (or happens
    /// here if none remain).
    fn drop(&mut self) {
        self.mark_stopped();

        let mut state = self.shared.state.lock();
        if state.consumer_count == 0 {
            let released = state.flush();
            if released > 0 {
                tracing::debug!(released, "producer dropped, residual elements released");
            }
        }
    }
}

/// Cloneable subscription handle for a [`Producer`]'s queue.
///
/// Lets session-serving threads register cursors while the producing
/// thread keeps exclusive ownership of the [`Producer`] itself (and with
/// it the sole right to `put`, `reset_queue`, and `stop`).
pub struct StreamHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> StreamHandle<T> {
    /// Register a new reader cursor; see [`Producer::subscribe`].
    pub fn subscribe(&self) -> Result<Consumer<T>> {
        subscribe(&self.shared)
    }
}

impl<T> Clone for StreamHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

fn subscribe<T>(shared: &Arc<Shared<T>>) -> Result<Consumer<T>> {
    let mut state = shared.state.lock();
    if state.stopped {
        return Err(QueueError::Stopped);
    }
    state.consumer_count += 1;
    tracing::debug!(consumers = state.consumer_count, "consumer registered");
    Ok(Consumer::new(shared.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Hook that records released payloads in put order.
    fn recording_hook<T>(log: Arc<Mutex<Vec<Arc<T>>>>) -> impl FnMut(Arc<T>) + Send + 'static
    where
        T: Send + Sync + 'static,
    {
        move |payload| log.lock().push(payload)
    }

    #[test]
    fn subscribe_after_stop_refused() {
        let producer: Producer<u8> = Producer::new();
        let handle = producer.handle();
        producer.stop();

        assert!(matches!(handle.subscribe(), Err(QueueError::Stopped)));
    }

    #[test]
    fn subscribe_after_drop_refused() {
        let producer: Producer<u8> = Producer::new();
        let handle = producer.handle();
        drop(producer);

        assert!(matches!(handle.subscribe(), Err(QueueError::Stopped)));
    }

    #[test]
    fn stop_releases_residual_elements() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let producer = Producer::with_release_hook(recording_hook(released.clone()));

        producer.put("a");
        producer.put("b");
        producer.put("c");
        producer.stop();

        let released = released.lock();
        assert_eq!(released.len(), 3);
        assert_eq!(*released[0], "a");
        assert_eq!(*released[2], "c");
    }

    #[test]
    fn reset_releases_all_regardless_of_views() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let producer = Producer::with_release_hook(recording_hook(released.clone()));

        producer.put("a");
        producer.put("b");
        assert_eq!(producer.queue_len(), 2);

        producer.reset_queue();
        assert_eq!(producer.queue_len(), 0);
        assert_eq!(released.lock().len(), 2);
    }

    #[test]
    fn counts_track_registration() {
        let producer: Producer<u8> = Producer::new();
        assert_eq!(producer.consumer_count(), 0);

        let a = producer.subscribe().unwrap();
        let b = producer.handle().subscribe().unwrap();
        assert_eq!(producer.consumer_count(), 2);

        drop(a);
        drop(b);
        assert_eq!(producer.consumer_count(), 0);
    }

    #[test]
    fn producer_usable_after_abandonment() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let producer = Producer::with_release_hook(recording_hook(released.clone()));

        let consumer = producer.subscribe().unwrap();
        producer.put("stale");
        drop(consumer);

        // Last consumer gone, queue flushed, but the producer lives on.
        assert_eq!(released.lock().len(), 1);
        producer.put("fresh");

        let mut late = producer.subscribe().unwrap();
        assert_eq!(*late.get().unwrap(), "fresh");
    }
}
