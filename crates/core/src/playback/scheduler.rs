use serde::Serialize;

use super::{
    controller::DualMediaController,
    session::{ModeKind, PlaybackMode, PlaybackSession, SegmentBounds},
    timeline::ReplayEnd,
    ComparisonData,
};
use crate::{
    config::{AppConfig, SyncPolicy},
    media::{MediaHandle, Stream},
    render::{landmark_index, ColorScheme, DrawSurface, SkeletonRenderer},
};

/// Playback commands issued by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Play both streams with segment-boundary re-anchoring.
    StartSynced,
    /// Play both streams without any coupling.
    PlayFree,
    Pause,
    PlayStream(Stream),
    PauseStream(Stream),
    /// Move one stream on its own.
    ScrubStream(Stream, f64),
}

/// What one tick observed and did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub mode: ModeKind,
    pub reference_time: f64,
    pub attempt_time: f64,
    pub reference_frame: Option<usize>,
    pub attempt_frame: Option<usize>,
    /// Segment covering the reference position.
    pub segment: Option<usize>,
    /// Attempt time matched to the reference frame by the alignment path.
    pub aligned_attempt_time: Option<f64>,
    /// Attempt position forced by drift correction this tick.
    pub corrected_to: Option<f64>,
}

/// Runs once per display refresh: applies the current mode's coupling
/// between the two streams, then draws both overlays.
#[derive(Debug)]
pub struct SyncScheduler<M> {
    controller: DualMediaController<M>,
    session: PlaybackSession,
    data: ComparisonData,
    renderer: SkeletonRenderer,
    policy: SyncPolicy,
    reference_colors: ColorScheme,
    attempt_colors: ColorScheme,
}

impl<M: MediaHandle> SyncScheduler<M> {
    pub fn new(controller: DualMediaController<M>, data: ComparisonData, config: &AppConfig) -> Self {
        Self {
            controller,
            session: PlaybackSession::new(),
            data,
            renderer: SkeletonRenderer::new(&config.render),
            policy: config.sync,
            reference_colors: config.render.reference,
            attempt_colors: config.render.attempt,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn mode(&self) -> PlaybackMode {
        self.session.mode()
    }

    pub fn data(&self) -> &ComparisonData {
        &self.data
    }

    pub fn controller(&self) -> &DualMediaController<M> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DualMediaController<M> {
        &mut self.controller
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::StartSynced => self.start_synced(),
            Command::PlayFree => self.play_free(),
            Command::Pause => self.pause(),
            Command::PlayStream(stream) => self.play_stream(stream),
            Command::PauseStream(stream) => self.pause_stream(stream),
            Command::ScrubStream(stream, seconds) => self.scrub_stream(stream, seconds),
        }
    }

    /// Starts coupled playback, or free playback when no alignment exists.
    pub fn start_synced(&mut self) {
        if !self.data.index.is_available() {
            tracing::warn!("no alignment path; starting free playback instead");
            self.play_free();
            return;
        }
        self.session.clear_anchor();
        self.session.enter(PlaybackMode::LinearSynced, "synced playback started");
        self.controller.play();
    }

    pub fn play_free(&mut self) {
        self.session.enter(PlaybackMode::Free, "free playback started");
        self.controller.play();
    }

    pub fn pause(&mut self) {
        self.controller.pause();
        self.session.enter(PlaybackMode::Free, "paused");
    }

    pub fn play_stream(&mut self, stream: Stream) {
        self.session.enter(PlaybackMode::Free, "single stream played");
        self.controller.play_stream(stream);
    }

    pub fn pause_stream(&mut self, stream: Stream) {
        self.session.enter(PlaybackMode::Free, "single stream paused");
        self.controller.pause_stream(stream);
    }

    pub fn scrub_stream(&mut self, stream: Stream, seconds: f64) {
        self.session.clear_anchor();
        self.session.enter(PlaybackMode::Free, "single stream scrubbed");
        self.controller.seek_stream(stream, seconds);
    }

    /// Seeks both streams to the same time and decouples them.
    pub(crate) fn jump_to(&mut self, seconds: f64) {
        self.controller.seek_both(seconds);
        self.session.clear_anchor();
        self.session.enter(PlaybackMode::Free, "seek");
    }

    /// Seeks each stream to its own start. With `end`, both streams play
    /// until they reach their own end bound.
    pub(crate) fn replay_bounded(
        &mut self,
        reference_start: f64,
        attempt_start: f64,
        end: Option<ReplayEnd>,
    ) {
        self.controller.seek_ref(reference_start);
        self.controller.seek_att(attempt_start);
        self.session.clear_anchor();
        match end {
            Some(end) => {
                let bounds = SegmentBounds::new(end.reference_end, end.attempt_end);
                self.session
                    .enter(PlaybackMode::SegmentBounded(bounds), "segment replay");
                self.controller.play();
            }
            None => self.session.enter(PlaybackMode::Free, "segment seek"),
        }
    }

    pub fn tick<S>(&mut self, reference_surface: &mut S, attempt_surface: &mut S) -> TickReport
    where
        S: DrawSurface + ?Sized,
    {
        for stream in self.controller.pump_signals() {
            self.on_stream_ended(stream);
        }

        let corrected_to = match self.session.mode() {
            PlaybackMode::Free => None,
            PlaybackMode::LinearSynced => self.correct_drift(),
            PlaybackMode::SegmentBounded(bounds) => {
                self.enforce_bounds(bounds);
                None
            }
        };

        let reference_time = self.controller.current_time(Stream::Reference);
        let attempt_time = self.controller.current_time(Stream::Attempt);
        let reference_frame = self.data.reference.frame_index_at(reference_time);
        let attempt_frame = self.data.attempt.frame_index_at(attempt_time);

        let active = self.data.index.segment_for(reference_time);
        let highlighted: Vec<usize> = active
            .map(|(_, segment)| {
                segment
                    .problem_joints
                    .iter()
                    .filter_map(|name| landmark_index(name))
                    .collect()
            })
            .unwrap_or_default();

        self.renderer.draw(
            reference_surface,
            reference_frame.and_then(|i| self.data.reference.frame(i)),
            &self.reference_colors,
        );
        self.renderer.draw_highlighted(
            attempt_surface,
            attempt_frame.and_then(|i| self.data.attempt.frame(i)),
            &self.attempt_colors,
            &highlighted,
        );

        TickReport {
            mode: self.session.mode().kind(),
            reference_time,
            attempt_time,
            reference_frame,
            attempt_frame,
            segment: active.map(|(index, _)| index),
            aligned_attempt_time: self.data.index.aligned_user_time(reference_time),
            corrected_to,
        }
    }

    fn on_stream_ended(&mut self, stream: Stream) {
        if self.session.mode() != PlaybackMode::Free {
            self.controller.pause();
            tracing::debug!(%stream, "stream ended during coupled playback");
            self.session.enter(PlaybackMode::Free, "stream ended");
        }
    }

    /// Re-anchors the attempt stream when the reference enters a new segment
    /// and the attempt has drifted from that segment's start.
    fn correct_drift(&mut self) -> Option<f64> {
        let reference_time = self.controller.current_time(Stream::Reference);
        let (segment, target) = self
            .data
            .index
            .segment_for(reference_time)
            .map(|(index, segment)| (index, segment.start_time_user))?;

        let previous = self.session.last_matched_segment();
        if previous == Some(segment) {
            return None;
        }
        self.session.set_last_matched_segment(segment);

        let drift = (self.controller.current_time(Stream::Attempt) - target).abs();
        let first = previous.is_none() && self.policy.anchor_on_first_resolution;
        if drift > self.policy.drift_threshold_secs || first {
            tracing::debug!(segment, drift, target, first, "re-anchoring attempt stream");
            self.controller.seek_att(target);
            Some(target)
        } else {
            None
        }
    }

    fn enforce_bounds(&mut self, mut bounds: SegmentBounds) {
        for stream in Stream::BOTH {
            if bounds.reached(stream) {
                continue;
            }
            if !self.controller.handle(stream).is_ready() {
                // An unloaded handle never advances towards its bound.
                bounds.mark_reached(stream);
                tracing::debug!(%stream, "handle not ready; treating segment bound as reached");
            } else if self.controller.current_time(stream) >= bounds.end(stream) {
                self.controller.pause_stream(stream);
                bounds.mark_reached(stream);
                tracing::debug!(%stream, end = bounds.end(stream), "stream reached segment bound");
            }
        }

        if bounds.both_reached() {
            self.controller.pause();
            self.session.enter(PlaybackMode::Free, "segment replay finished");
        } else {
            self.session.update_bounds(bounds);
        }
    }

    pub fn into_controller(self) -> DualMediaController<M> {
        self.controller
    }
}
