//! Dual-stream playback: the media controller, the per-frame scheduler and
//! the timeline that turns seek requests into mode changes.

use std::sync::Arc;

use crate::{alignment::AlignmentIndex, results::{KeypointSequence, ResultsDocument}};

pub mod controller;
pub mod scheduler;
pub mod session;
pub mod timeline;

pub use controller::{DualMediaController, StreamStatus};
pub use scheduler::{Command, SyncScheduler, TickReport};
pub use session::{ModeKind, PlaybackMode, PlaybackSession, SegmentBounds};
pub use timeline::{ReplayEnd, SeekRequest, TimelineController};

/// Immutable inputs of a comparison, shared by every component.
#[derive(Debug, Clone)]
pub struct ComparisonData {
    pub index: Arc<AlignmentIndex>,
    pub reference: Arc<KeypointSequence>,
    pub attempt: Arc<KeypointSequence>,
}

impl ComparisonData {
    pub fn from_document(document: &ResultsDocument) -> Self {
        Self {
            index: Arc::new(AlignmentIndex::build(document)),
            reference: Arc::new(document.reference_sequence()),
            attempt: Arc::new(document.attempt_sequence()),
        }
    }
}
