//! Error types for the fan-out queue.

/// Errors that can cross the queue's boundary.
///
/// Most conditions a caller can hit are deliberately *not* errors:
///
/// - **Exhaustion** (queue empty, producer still live) blocks inside
///   [`Consumer::get`](crate::Consumer::get) until data arrives.
/// - **End of stream** (producer stopped, cursor past the last element)
///   is the `None` return of [`Consumer::get`](crate::Consumer::get).
/// - **Contract violations** (putting after stop, stopping twice, freeing
///   a consumer twice) are unrepresentable: `stop` and drop consume their
///   handles.
///
/// What remains is the one runtime refusal below.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// [`Producer::subscribe`](crate::Producer::subscribe) or
    /// [`StreamHandle::subscribe`](crate::StreamHandle::subscribe) was
    /// called after the producer stopped. A stopped queue accepts no new
    /// readers; the caller should treat the stream as ended.
    #[error("producer stopped, no new consumers accepted")]
    Stopped,
}

/// Convenience alias for `Result<T, QueueError>`.
pub type Result<T> = std::result::Result<T, QueueError>;
