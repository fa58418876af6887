//! Media payload type queued by the parser layer.

use std::time::Duration;

/// One encoded access unit, as handed over by a demuxer or media parser.
///
/// The queue itself is generic and never looks inside its payloads; this
/// type is the instantiation the media pipeline uses. It pairs the encoded
/// bytes with the two pieces of metadata the RTP layer needs downstream:
///
/// - **pts** — presentation timestamp, media-clock agnostic.
/// - **marker** — set on the last unit of a frame (RTP marker bit,
///   RFC 3550 §5.1).
///
/// The byte buffer is owned and immutable once queued; consumers receive
/// shared read views and never copy or mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    /// Encoded bitstream bytes for this access unit.
    pub data: Box<[u8]>,
    /// Presentation timestamp relative to stream start.
    pub pts: Duration,
    /// Whether this unit completes a frame (RTP marker bit).
    pub marker: bool,
}

impl AccessUnit {
    /// Create an access unit from encoded bytes.
    pub fn new(data: impl Into<Box<[u8]>>, pts: Duration, marker: bool) -> Self {
        Self {
            data: data.into(),
            pts,
            marker,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload carries no bytes (legal, e.g. filler units).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_takes_ownership_of_bytes() {
        let au = AccessUnit::new(vec![0u8, 1, 2], Duration::from_millis(40), true);
        assert_eq!(au.len(), 3);
        assert!(au.marker);
        assert_eq!(au.pts, Duration::from_millis(40));
    }

    #[test]
    fn empty_payload_is_allowed() {
        let au = AccessUnit::new(Vec::new(), Duration::ZERO, false);
        assert!(au.is_empty());
    }
}
