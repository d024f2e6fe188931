//! Read-only lookups over the alignment path and the scored segments.
//!
//! Built once when a results document is loaded and shared by every
//! component of the session afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::results::{PathPair, ResultsDocument, SegmentRecord};

/// Maps a stream time to a frame index, clamped to `[0, frame_count - 1]`.
///
/// Negative or NaN times resolve to the first frame and anything at or past
/// the end of the sequence resolves to the last one. Returns 0 for an empty
/// sequence; callers check emptiness before fetching the frame.
pub fn frame_index_for(time: f64, fps: f64, frame_count: usize) -> usize {
    if frame_count == 0 {
        return 0;
    }
    let last = frame_count - 1;
    let raw = (time * fps).floor();
    if raw.is_nan() || raw <= 0.0 {
        0
    } else {
        // `as` saturates on overflow, including +inf.
        (raw as usize).min(last)
    }
}

/// A validated, scored range of the reference timeline and its counterpart
/// on the attempt timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start_time_ref: f64,
    pub end_time_ref: f64,
    pub start_time_user: f64,
    pub end_time_user: f64,
    pub score: f64,
    pub problem_joints: Vec<String>,
}

impl Segment {
    fn from_record(record: &SegmentRecord) -> Result<Self, &'static str> {
        let (
            Some(start_time_ref),
            Some(end_time_ref),
            Some(start_time_user),
            Some(end_time_user),
            Some(score),
        ) = (
            record.start_time,
            record.end_time,
            record.user_start_time,
            record.user_end_time,
            record.score,
        )
        else {
            return Err("missing required field");
        };

        let times = [start_time_ref, end_time_ref, start_time_user, end_time_user];
        if times.iter().any(|t| !t.is_finite()) {
            return Err("non-finite time");
        }
        if end_time_ref <= start_time_ref {
            return Err("reference end does not follow start");
        }
        if end_time_user < start_time_user {
            return Err("attempt end precedes start");
        }

        Ok(Self {
            start_time_ref,
            end_time_ref,
            start_time_user,
            end_time_user,
            score,
            problem_joints: record
                .problem_joints
                .iter()
                .map(|joint| joint.name().to_string())
                .collect(),
        })
    }

    pub fn contains_ref(&self, seconds: f64) -> bool {
        seconds >= self.start_time_ref && seconds < self.end_time_ref
    }
}

/// A segment dropped while building the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedSegment {
    /// Position in the document's `segment_scores` list.
    pub position: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
pub struct AlignmentIndex {
    path: Vec<PathPair>,
    /// Reference frame index -> last path position naming it.
    inverse: BTreeMap<usize, usize>,
    segments: Vec<Segment>,
    excluded: Vec<ExcludedSegment>,
    ref_fps: f64,
    user_fps: f64,
    ref_frame_count: usize,
}

impl AlignmentIndex {
    pub fn build(document: &ResultsDocument) -> Self {
        let path = document.dtw_path.clone();
        if path.is_empty() {
            tracing::warn!("results carry no alignment path; synced playback is unavailable");
        } else if !is_monotonic(&path) {
            tracing::warn!(len = path.len(), "alignment path is not monotonic");
        }

        let (segments, excluded) = collect_segments(&document.segment_scores);
        for skipped in &excluded {
            tracing::warn!(
                segment = skipped.position,
                reason = skipped.reason,
                "excluding malformed segment"
            );
        }

        let ref_frame_count = document.ref_keypoints.len();
        let (inverse, dropped) = build_inverse(&path, ref_frame_count);
        if dropped > 0 {
            tracing::warn!(
                dropped,
                ref_frames = ref_frame_count,
                "ignoring alignment pairs past the last reference frame"
            );
        }

        Self {
            inverse,
            path,
            segments,
            excluded,
            ref_fps: document.ref_fps,
            user_fps: document.user_fps,
            ref_frame_count,
        }
    }

    /// Whether an alignment path is present. Without one, only free playback
    /// is possible.
    pub fn is_available(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn excluded_segments(&self) -> &[ExcludedSegment] {
        &self.excluded
    }

    /// Segment covering the reference time `t_ref`, with its index.
    ///
    /// Ranges are start-inclusive and end-exclusive, except that the last
    /// segment also covers its own end instant.
    pub fn segment_for(&self, t_ref: f64) -> Option<(usize, &Segment)> {
        if !t_ref.is_finite() {
            return None;
        }
        let after = self.segments.partition_point(|s| s.start_time_ref <= t_ref);
        let index = after.checked_sub(1)?;
        let segment = &self.segments[index];
        let is_last = index + 1 == self.segments.len();
        if segment.contains_ref(t_ref) || (is_last && t_ref <= segment.end_time_ref) {
            Some((index, segment))
        } else {
            None
        }
    }

    /// Attempt frame matched to the reference frame `ref_index`.
    pub fn user_frame_for(&self, ref_index: usize) -> Option<usize> {
        let (_, &position) = self
            .inverse
            .range(..=ref_index)
            .next_back()
            .or_else(|| self.inverse.iter().next())?;
        self.path.get(position).map(|&(_, user)| user)
    }

    /// Time on the attempt stream matched to the reference frame `ref_index`.
    pub fn user_time_for(&self, ref_index: usize) -> Option<f64> {
        self.user_frame_for(ref_index)
            .map(|frame| frame as f64 / self.user_fps)
    }

    /// Path-aligned attempt time for a reference stream time.
    pub fn aligned_user_time(&self, ref_time: f64) -> Option<f64> {
        let frame_count = if self.ref_frame_count > 0 {
            self.ref_frame_count
        } else {
            self.inverse.keys().next_back()?.saturating_add(1)
        };
        self.user_time_for(frame_index_for(ref_time, self.ref_fps, frame_count))
    }

    /// Matched pair at a path position, clamped to the path.
    pub fn pair_at(&self, position: usize) -> Option<PathPair> {
        let last = self.path.len().checked_sub(1)?;
        Some(self.path[position.min(last)])
    }
}

fn is_monotonic(path: &[PathPair]) -> bool {
    path.windows(2)
        .all(|pair| pair[1].0 >= pair[0].0 && pair[1].1 >= pair[0].1)
}

/// Later path entries win for a repeated reference index. Lookups between
/// entries inherit the closest earlier one. With reference keypoints present,
/// pairs naming a frame past the last one are dropped and counted.
fn build_inverse(path: &[PathPair], ref_frame_count: usize) -> (BTreeMap<usize, usize>, usize) {
    let mut inverse = BTreeMap::new();
    let mut dropped = 0;
    for (position, &(reference, _)) in path.iter().enumerate() {
        if ref_frame_count > 0 && reference >= ref_frame_count {
            dropped += 1;
            continue;
        }
        inverse.insert(reference, position);
    }
    (inverse, dropped)
}

fn collect_segments(records: &[SegmentRecord]) -> (Vec<Segment>, Vec<ExcludedSegment>) {
    let mut excluded = Vec::new();
    let mut candidates = Vec::new();

    for (position, record) in records.iter().enumerate() {
        match Segment::from_record(record) {
            Ok(segment) => candidates.push((position, segment)),
            Err(reason) => excluded.push(ExcludedSegment { position, reason }),
        }
    }

    candidates.sort_by(|a, b| a.1.start_time_ref.total_cmp(&b.1.start_time_ref));

    let mut segments: Vec<Segment> = Vec::with_capacity(candidates.len());
    for (position, segment) in candidates {
        let overlaps = segments
            .last()
            .map(|previous| segment.start_time_ref < previous.end_time_ref)
            .unwrap_or(false);
        if overlaps {
            excluded.push(ExcludedSegment {
                position,
                reason: "overlaps previous segment",
            });
        } else {
            segments.push(segment);
        }
    }

    excluded.sort_by_key(|skipped| skipped.position);
    (segments, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Joint, KeypointFrame};

    fn record(start: f64, end: f64, user_start: f64, user_end: f64) -> SegmentRecord {
        SegmentRecord {
            start_time: Some(start),
            end_time: Some(end),
            user_start_time: Some(user_start),
            user_end_time: Some(user_end),
            score: Some(75.0),
            problem_joints: Vec::new(),
        }
    }

    fn document(path: Vec<PathPair>, segments: Vec<SegmentRecord>) -> ResultsDocument {
        let frame = KeypointFrame::new(vec![Joint::new(0.0, 0.0)]);
        ResultsDocument {
            overall_score: 80.0,
            ref_fps: 30.0,
            user_fps: 30.0,
            ref_keypoints: vec![frame.clone(); 4],
            user_keypoints: vec![frame; 3],
            dtw_path: path,
            segment_scores: segments,
            worst_moments: Vec::new(),
            extended_moments: Vec::new(),
        }
    }

    #[test]
    fn frame_index_is_clamped() {
        assert_eq!(frame_index_for(0.0, 30.0, 10), 0);
        assert_eq!(frame_index_for(-1.0, 30.0, 10), 0);
        assert_eq!(frame_index_for(f64::NAN, 30.0, 10), 0);
        assert_eq!(frame_index_for(0.2, 30.0, 10), 6);
        assert_eq!(frame_index_for(10.0 / 30.0, 30.0, 10), 9);
        assert_eq!(frame_index_for(1_000.0, 30.0, 10), 9);
        assert_eq!(frame_index_for(f64::INFINITY, 30.0, 10), 9);
    }

    #[test]
    fn frame_index_floors_just_below_a_boundary() {
        assert_eq!(frame_index_for(2.9999995 / 30.0, 30.0, 10), 2);
        assert_eq!(frame_index_for(3.0 / 30.0, 30.0, 10), 3);
    }

    #[test]
    fn frame_index_stays_in_range_across_times() {
        let frame_count = 7;
        let fps = 24.0;
        for step in 0..2_000 {
            let time = step as f64 * 0.001;
            let index = frame_index_for(time, fps, frame_count);
            assert!(index < frame_count);
            if time >= frame_count as f64 / fps {
                assert_eq!(index, frame_count - 1);
            }
        }
    }

    #[test]
    fn resolves_user_frame_through_path() {
        let index = AlignmentIndex::build(&document(
            vec![(0, 0), (1, 1), (2, 1), (3, 2)],
            Vec::new(),
        ));

        assert_eq!(index.user_frame_for(2), Some(1));
        assert_eq!(index.aligned_user_time(2.0 / 30.0), Some(1.0 / 30.0));
        assert_eq!(index.aligned_user_time(0.0667), Some(1.0 / 30.0));
        assert_eq!(index.user_frame_for(3), Some(2));
        assert_eq!(index.user_frame_for(99), Some(2));
    }

    #[test]
    fn repeated_reference_index_uses_latest_entry() {
        let index = AlignmentIndex::build(&document(vec![(0, 0), (0, 1), (0, 2), (1, 3)], Vec::new()));
        assert_eq!(index.user_frame_for(0), Some(2));
    }

    #[test]
    fn gaps_in_path_inherit_previous_entry() {
        let index = AlignmentIndex::build(&document(vec![(1, 0), (3, 2)], Vec::new()));
        assert_eq!(index.user_frame_for(0), Some(0));
        assert_eq!(index.user_frame_for(2), Some(0));
        assert_eq!(index.user_frame_for(3), Some(2));
    }

    #[test]
    fn pairs_past_the_reference_frames_are_ignored() {
        let index = AlignmentIndex::build(&document(
            vec![(0, 0), (1, 1), (4_000_000_000, 5), (2, 2)],
            Vec::new(),
        ));
        assert_eq!(index.path_len(), 4);
        assert_eq!(index.user_frame_for(2), Some(2));
        assert_eq!(index.user_frame_for(3), Some(2));
        assert_eq!(index.aligned_user_time(10.0), Some(2.0 / 30.0));

        let mut bare = document(vec![(0, 0), (usize::MAX, 7)], Vec::new());
        bare.ref_keypoints.clear();
        let index = AlignmentIndex::build(&bare);
        assert_eq!(index.user_frame_for(usize::MAX), Some(7));
        assert_eq!(index.user_frame_for(10), Some(0));
    }

    #[test]
    fn pair_at_clamps_to_path() {
        let index = AlignmentIndex::build(&document(vec![(0, 0), (1, 2)], Vec::new()));
        assert_eq!(index.pair_at(0), Some((0, 0)));
        assert_eq!(index.pair_at(8), Some((1, 2)));
    }

    #[test]
    fn empty_path_reports_unavailable() {
        let index = AlignmentIndex::build(&document(Vec::new(), vec![record(0.0, 1.0, 0.0, 1.0)]));

        assert!(!index.is_available());
        assert_eq!(index.user_frame_for(0), None);
        assert_eq!(index.user_time_for(0), None);
        assert_eq!(index.aligned_user_time(0.5), None);
        assert_eq!(index.pair_at(0), None);
    }

    #[test]
    fn segment_lookup_handles_bounds_and_gaps() {
        let index = AlignmentIndex::build(&document(
            vec![(0, 0)],
            vec![
                record(0.0, 2.0, 0.0, 2.2),
                record(2.0, 4.0, 2.2, 4.5),
                record(5.0, 6.0, 5.0, 6.1),
            ],
        ));

        assert_eq!(index.segment_for(-0.1), None);
        assert_eq!(index.segment_for(0.0).map(|(i, _)| i), Some(0));
        assert_eq!(index.segment_for(2.0).map(|(i, _)| i), Some(1));
        assert_eq!(index.segment_for(4.5), None);
        assert_eq!(index.segment_for(6.0).map(|(i, _)| i), Some(2));
        assert_eq!(index.segment_for(6.01), None);
    }

    #[test]
    fn segment_index_is_monotonic_in_time() {
        let index = AlignmentIndex::build(&document(
            vec![(0, 0), (1, 1), (2, 1), (3, 2)],
            vec![
                record(0.0, 1.0, 0.0, 1.1),
                record(1.0, 2.5, 1.1, 2.4),
                record(2.5, 3.0, 2.4, 3.3),
            ],
        ));

        let mut previous = None;
        for step in 0..=300 {
            let t = step as f64 * 0.01;
            if let Some((current, _)) = index.segment_for(t) {
                if let Some(earlier) = previous {
                    assert!(current >= earlier, "segment went backwards at {t}");
                }
                previous = Some(current);
            }
        }
        assert_eq!(previous, Some(2));
    }

    #[test]
    fn malformed_segments_are_excluded_individually() {
        let mut missing = record(3.0, 4.0, 3.0, 4.0);
        missing.user_end_time = None;

        let index = AlignmentIndex::build(&document(
            vec![(0, 0)],
            vec![
                record(1.0, 2.0, 1.0, 2.0),
                record(2.0, 2.0, 2.0, 2.5),
                missing,
                record(0.0, 1.0, 0.0, 1.0),
                record(1.5, 2.5, 1.5, 2.5),
            ],
        ));

        let kept: Vec<f64> = index.segments().iter().map(|s| s.start_time_ref).collect();
        assert_eq!(kept, vec![0.0, 1.0]);
        let dropped: Vec<usize> = index.excluded_segments().iter().map(|s| s.position).collect();
        assert_eq!(dropped, vec![1, 2, 4]);
        assert_eq!(index.segment_for(1.5).map(|(i, _)| i), Some(1));
    }
}
