//! Queue storage: elements, sequence numbering, head-only retirement.

use std::collections::VecDeque;
use std::sync::Arc;

/// One queued payload plus its view bookkeeping. Never leaves the queue.
#[derive(Debug)]
pub(crate) struct Element<T> {
    /// Shared read view of the payload; consumers clone this, the queue
    /// holds the reference that release accounting is tied to.
    payload: Arc<T>,
    /// Number of currently-registered consumers that have advanced past
    /// this element.
    seen: usize,
}

/// FIFO of [`Element`]s with stable cursor addressing.
///
/// Elements are addressed by an absolute, monotonically increasing
/// sequence number instead of their position, so consumer cursors stay
/// valid while predecessors are popped from the head. The `generation`
/// counter is the queue-instance identity: [`reset`](Self::reset) bumps
/// it, and a consumer whose remembered generation no longer matches knows
/// its cursor is stale and must resynchronize to the head.
#[derive(Debug)]
pub(crate) struct ElementQueue<T> {
    generation: u64,
    /// Sequence number of the element at the front, valid when non-empty.
    head_seq: u64,
    /// Sequence number the next pushed element will receive.
    next_seq: u64,
    elements: VecDeque<Element<T>>,
}

impl<T> ElementQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            head_seq: 0,
            next_seq: 0,
            elements: VecDeque::new(),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn head_seq(&self) -> u64 {
        self.head_seq
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether `seq` currently addresses a live element.
    pub(crate) fn contains(&self, seq: u64) -> bool {
        seq >= self.head_seq && seq < self.next_seq
    }

    /// Append a payload at the tail with `seen = 0`; returns its sequence.
    pub(crate) fn push(&mut self, payload: Arc<T>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.elements.push_back(Element { payload, seen: 0 });
        seq
    }

    /// Shared view of the payload at `seq`, if still queued.
    pub(crate) fn payload_at(&self, seq: u64) -> Option<Arc<T>> {
        if !self.contains(seq) {
            return None;
        }
        let idx = (seq - self.head_seq) as usize;
        Some(self.elements[idx].payload.clone())
    }

    /// Record that one more consumer has advanced past `seq`.
    ///
    /// If that increment satisfies the release threshold *and* the element
    /// sits at the head, the element is popped and its payload returned
    /// for release. Retirement is strictly head-only and never cascades: a
    /// fully-seen element behind the head stays queued until its
    /// predecessors go, and a head left fully-seen by a shrinking consumer
    /// count waits for the next view actually resolved on it.
    pub(crate) fn note_seen(&mut self, seq: u64, consumer_count: usize) -> Option<Arc<T>> {
        if !self.contains(seq) {
            return None;
        }
        let idx = (seq - self.head_seq) as usize;
        self.elements[idx].seen += 1;

        if seq == self.head_seq && self.elements[idx].seen >= consumer_count {
            let element = self.elements.pop_front();
            self.head_seq += 1;
            return element.map(|e| e.payload);
        }
        None
    }

    /// Remove every element, keeping the same queue identity.
    ///
    /// Used when the queue is abandoned (last consumer gone, producer
    /// live) or flushed at stop. Returns the payloads for release in FIFO
    /// order.
    pub(crate) fn drain_all(&mut self) -> Vec<Arc<T>> {
        self.head_seq = self.next_seq;
        self.elements.drain(..).map(|e| e.payload).collect()
    }

    /// Discard all contents and start a new queue instance.
    ///
    /// Bumps the generation so stale cursors detect the discontinuity.
    /// Returns the discarded payloads for release in FIFO order.
    pub(crate) fn reset(&mut self) -> Vec<Arc<T>> {
        self.generation += 1;
        self.drain_all()
    }

    /// How many elements lie strictly beyond `cursor` (all of them when
    /// the cursor is unset).
    pub(crate) fn backlog_after(&self, cursor: Option<u64>) -> usize {
        match cursor {
            Some(seq) if seq >= self.head_seq => (self.next_seq - seq - 1) as usize,
            // Cursor at or before a popped head: everything queued is ahead.
            _ => self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(n: u64) -> ElementQueue<u64> {
        let mut q = ElementQueue::new();
        for i in 0..n {
            q.push(Arc::new(i));
        }
        q
    }

    #[test]
    fn push_assigns_increasing_seqs() {
        let mut q = ElementQueue::new();
        assert_eq!(q.push(Arc::new(10u32)), 0);
        assert_eq!(q.push(Arc::new(11)), 1);
        assert_eq!(q.head_seq(), 0);
        assert_eq!(q.next_seq(), 2);
    }

    #[test]
    fn note_seen_pops_head_at_threshold() {
        let mut q = queue_with(2);
        assert!(q.note_seen(0, 2).is_none(), "one of two views, stays");
        let released = q.note_seen(0, 2).expect("second view releases");
        assert_eq!(*released, 0);
        assert_eq!(q.head_seq(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn fully_seen_behind_head_stays_queued() {
        let mut q = queue_with(2);
        // Element 1 reaches the threshold while element 0 still heads.
        assert!(q.note_seen(1, 1).is_none());
        assert_eq!(q.len(), 2);
        // Popping the head does not cascade into element 1.
        assert!(q.note_seen(0, 1).is_some());
        assert_eq!(q.len(), 1);
        assert!(q.contains(1));
    }

    #[test]
    fn shrunk_threshold_released_on_next_view() {
        let mut q = queue_with(1);
        assert!(q.note_seen(0, 2).is_none());
        // Consumer count dropped to 1 meanwhile; the next resolved view
        // takes seen past the (now lower) threshold.
        let released = q.note_seen(0, 1).expect("seen >= count releases");
        assert_eq!(*released, 0);
    }

    #[test]
    fn reset_bumps_generation_and_drains() {
        let mut q = queue_with(3);
        let before = q.generation();
        let dropped = q.reset();
        assert_eq!(dropped.len(), 3);
        assert_eq!(q.generation(), before + 1);
        assert!(q.is_empty());
        // Sequence numbering continues across the discontinuity.
        assert_eq!(q.push(Arc::new(9)), 3);
    }

    #[test]
    fn drain_keeps_generation() {
        let mut q = queue_with(2);
        let before = q.generation();
        assert_eq!(q.drain_all().len(), 2);
        assert_eq!(q.generation(), before);
        assert_eq!(q.head_seq(), q.next_seq());
    }

    #[test]
    fn backlog_counts_elements_beyond_cursor() {
        let q = queue_with(3);
        assert_eq!(q.backlog_after(None), 3);
        assert_eq!(q.backlog_after(Some(0)), 2);
        assert_eq!(q.backlog_after(Some(2)), 0);
    }
}
