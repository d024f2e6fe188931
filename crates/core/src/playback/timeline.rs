use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::SyncScheduler;
use crate::{alignment::AlignmentIndex, media::MediaHandle, results::Moment};

/// Per-stream end times of a segment replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayEnd {
    pub reference_end: f64,
    pub attempt_end: f64,
}

/// A jump on the comparison timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekRequest {
    /// Move both streams to the same reference-relative time.
    Time(f64),
    /// Move each stream to its side of a segment; with `end`, replay it.
    SegmentReplay {
        reference_start: f64,
        attempt_start: f64,
        end: Option<ReplayEnd>,
    },
}

/// Turns seek requests into stream seeks and mode transitions.
#[derive(Debug, Clone)]
pub struct TimelineController {
    index: Arc<AlignmentIndex>,
}

impl TimelineController {
    pub fn new(index: Arc<AlignmentIndex>) -> Self {
        Self { index }
    }

    pub fn seek<M: MediaHandle>(&self, scheduler: &mut SyncScheduler<M>, request: SeekRequest) {
        match request {
            SeekRequest::Time(seconds) => {
                tracing::debug!(seconds, "timeline seek");
                scheduler.jump_to(seconds);
            }
            SeekRequest::SegmentReplay {
                reference_start,
                end,
                ..
            } if !self.index.is_available() => {
                tracing::warn!(
                    reference_start,
                    "no alignment path; segment replay falls back to a plain seek"
                );
                scheduler.jump_to(reference_start);
                if end.is_some() {
                    scheduler.play_free();
                }
            }
            SeekRequest::SegmentReplay {
                reference_start,
                attempt_start,
                end,
            } => {
                tracing::debug!(reference_start, attempt_start, play = end.is_some(), "segment seek");
                scheduler.replay_bounded(reference_start, attempt_start, end);
            }
        }
    }

    /// Request for the segment at `segment`, replaying it when `play` is set.
    pub fn segment_replay(&self, segment: usize, play: bool) -> Option<SeekRequest> {
        let segment = self.index.segment(segment)?;
        Some(SeekRequest::SegmentReplay {
            reference_start: segment.start_time_ref,
            attempt_start: segment.start_time_user,
            end: play.then_some(ReplayEnd {
                reference_end: segment.end_time_ref,
                attempt_end: segment.end_time_user,
            }),
        })
    }

    /// Time seek to a feedback moment, if it carries a frame.
    pub fn moment_seek(moment: &Moment, ref_fps: f64) -> Option<SeekRequest> {
        let frame = moment.ref_frame?;
        (ref_fps > 0.0).then(|| SeekRequest::Time(frame as f64 / ref_fps))
    }
}
