use std::fmt;

use serde::Serialize;

use crate::media::Stream;

/// Per-stream end times of a segment replay and whether each was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentBounds {
    pub reference_end: f64,
    pub attempt_end: f64,
    reference_reached: bool,
    attempt_reached: bool,
}

impl SegmentBounds {
    pub fn new(reference_end: f64, attempt_end: f64) -> Self {
        Self {
            reference_end,
            attempt_end,
            reference_reached: false,
            attempt_reached: false,
        }
    }

    pub fn end(&self, stream: Stream) -> f64 {
        match stream {
            Stream::Reference => self.reference_end,
            Stream::Attempt => self.attempt_end,
        }
    }

    pub fn reached(&self, stream: Stream) -> bool {
        match stream {
            Stream::Reference => self.reference_reached,
            Stream::Attempt => self.attempt_reached,
        }
    }

    pub fn mark_reached(&mut self, stream: Stream) {
        match stream {
            Stream::Reference => self.reference_reached = true,
            Stream::Attempt => self.attempt_reached = true,
        }
    }

    pub fn both_reached(&self) -> bool {
        self.reference_reached && self.attempt_reached
    }
}

/// How the two streams relate during playback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackMode {
    /// Streams play independently.
    #[default]
    Free,
    /// The attempt stream is re-anchored at segment boundaries crossed by
    /// the reference stream.
    LinearSynced,
    /// Both streams replay one segment and stop at their own end bound.
    SegmentBounded(SegmentBounds),
}

impl PlaybackMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            PlaybackMode::Free => ModeKind::Free,
            PlaybackMode::LinearSynced => ModeKind::LinearSynced,
            PlaybackMode::SegmentBounded(_) => ModeKind::SegmentBounded,
        }
    }
}

/// Payload-free view of [`PlaybackMode`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Free,
    LinearSynced,
    SegmentBounded,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Free => f.write_str("free"),
            ModeKind::LinearSynced => f.write_str("linear-synced"),
            ModeKind::SegmentBounded => f.write_str("segment-bounded"),
        }
    }
}

/// Mutable state of one comparison session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSession {
    mode: PlaybackMode,
    last_matched_segment: Option<usize>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn last_matched_segment(&self) -> Option<usize> {
        self.last_matched_segment
    }

    pub(crate) fn set_last_matched_segment(&mut self, segment: usize) {
        self.last_matched_segment = Some(segment);
    }

    /// Forgets the matched segment so synced playback re-anchors next tick.
    pub(crate) fn clear_anchor(&mut self) {
        self.last_matched_segment = None;
    }

    pub(crate) fn enter(&mut self, mode: PlaybackMode, reason: &'static str) {
        if self.mode.kind() != mode.kind() {
            tracing::info!(from = %self.mode.kind(), to = %mode.kind(), reason, "playback mode changed");
        }
        self.mode = mode;
    }

    /// Stores updated bounds without logging a transition.
    pub(crate) fn update_bounds(&mut self, bounds: SegmentBounds) {
        if let PlaybackMode::SegmentBounded(_) = self.mode {
            self.mode = PlaybackMode::SegmentBounded(bounds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_track_each_stream_independently() {
        let mut bounds = SegmentBounds::new(4.0, 4.5);
        assert_eq!(bounds.end(Stream::Attempt), 4.5);

        bounds.mark_reached(Stream::Attempt);
        assert!(bounds.reached(Stream::Attempt));
        assert!(!bounds.both_reached());

        bounds.mark_reached(Stream::Reference);
        assert!(bounds.both_reached());
    }

    #[test]
    fn session_starts_free_and_unanchored() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.mode(), PlaybackMode::Free);
        assert_eq!(session.last_matched_segment(), None);

        session.enter(PlaybackMode::LinearSynced, "test");
        session.set_last_matched_segment(3);
        session.update_bounds(SegmentBounds::new(1.0, 1.0));
        assert_eq!(session.mode(), PlaybackMode::LinearSynced);

        session.clear_anchor();
        assert_eq!(session.last_matched_segment(), None);
    }
}
