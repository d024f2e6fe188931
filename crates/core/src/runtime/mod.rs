//! The session loop: one task owns the scheduler, applies user commands
//! between ticks and publishes a report per display refresh.

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PlaybackConfig,
    error::{PoseSyncError, Result},
    media::MediaHandle,
    playback::{Command, ModeKind, SeekRequest, SyncScheduler, TickReport, TimelineController},
    render::DrawSurface,
};

/// Anything the viewer can ask of a running session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    Playback(Command),
    Seek(SeekRequest),
    /// Seek to segment `segment`, replaying it when `play` is set.
    ReplaySegment { segment: usize, play: bool },
}

impl From<Command> for SessionCommand {
    fn from(command: Command) -> Self {
        SessionCommand::Playback(command)
    }
}

impl From<SeekRequest> for SessionCommand {
    fn from(request: SeekRequest) -> Self {
        SessionCommand::Seek(request)
    }
}

/// Final state of a session after teardown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSummary {
    pub ticks: u64,
    pub final_mode: ModeKind,
}

pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    cancel: CancellationToken,
    reports: watch::Receiver<TickReport>,
    task: JoinHandle<SessionSummary>,
}

impl SessionHandle {
    /// Queues a command for the next loop iteration. Returns `false` once the
    /// session has stopped.
    pub fn send(&self, command: impl Into<SessionCommand>) -> bool {
        self.commands.send(command.into()).is_ok()
    }

    /// Receiver for the most recent tick report.
    pub fn reports(&self) -> watch::Receiver<TickReport> {
        self.reports.clone()
    }

    pub fn latest(&self) -> TickReport {
        self.reports.borrow().clone()
    }

    /// Stops the loop and waits for it. The scheduler, its media handles and
    /// their sources are dropped before this returns.
    pub async fn reset(self) -> Result<SessionSummary> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|err| PoseSyncError::msg(format!("session task failed: {err}")))
    }
}

/// Moves the scheduler onto a tokio task that ticks at `config.refresh_hz`.
pub fn spawn_session<M, S>(
    scheduler: SyncScheduler<M>,
    timeline: TimelineController,
    surfaces: (S, S),
    config: &PlaybackConfig,
) -> SessionHandle
where
    M: MediaHandle + Send + 'static,
    S: DrawSurface + Send + 'static,
{
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (report_tx, reports) = watch::channel(TickReport::default());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(session_loop(
        scheduler,
        timeline,
        surfaces,
        config.frame_interval(),
        command_rx,
        report_tx,
        cancel.clone(),
    ));

    SessionHandle {
        commands,
        cancel,
        reports,
        task,
    }
}

async fn session_loop<M, S>(
    mut scheduler: SyncScheduler<M>,
    timeline: TimelineController,
    (mut reference_surface, mut attempt_surface): (S, S),
    frame_interval: std::time::Duration,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    reports: watch::Sender<TickReport>,
    cancel: CancellationToken,
) -> SessionSummary
where
    M: MediaHandle,
    S: DrawSurface,
{
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = 0u64;

    tracing::info!(interval_ms = frame_interval.as_millis() as u64, "session started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => dispatch(&mut scheduler, &timeline, command),
                None => break,
            },
            _ = ticker.tick() => {
                let report = scheduler.tick(&mut reference_surface, &mut attempt_surface);
                ticks += 1;
                reports.send_replace(report);
            }
        }
    }

    let final_mode = scheduler.mode().kind();
    scheduler.controller_mut().pause();
    drop(scheduler);
    tracing::info!(ticks, %final_mode, "session reset");

    SessionSummary { ticks, final_mode }
}

fn dispatch<M: MediaHandle>(
    scheduler: &mut SyncScheduler<M>,
    timeline: &TimelineController,
    command: SessionCommand,
) {
    match command {
        SessionCommand::Playback(command) => scheduler.apply(command),
        SessionCommand::Seek(request) => timeline.seek(scheduler, request),
        SessionCommand::ReplaySegment { segment, play } => {
            match timeline.segment_replay(segment, play) {
                Some(request) => timeline.seek(scheduler, request),
                None => tracing::warn!(segment, "no such segment; replay ignored"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        media::{HostClock, SimulatedMedia, SourceRegistry},
        playback::{ComparisonData, DualMediaController},
        render::{Color, FrameBuffer},
        results::ResultsDocument,
    };

    const DOCUMENT: &str = r#"{
        "overall_score": 72.5,
        "ref_fps": 10,
        "user_fps": 10,
        "ref_keypoints": [],
        "user_keypoints": [],
        "dtw_path": [[0, 0], [10, 12], [20, 22], [30, 30]],
        "segment_scores": [
            {"start_time": 0.0, "end_time": 1.0, "user_start_time": 0.0, "user_end_time": 1.2, "score": 80},
            {"start_time": 1.0, "end_time": 2.0, "user_start_time": 1.2, "user_end_time": 2.4, "score": 40}
        ]
    }"#;

    fn start(registry: &SourceRegistry) -> SessionHandle {
        let document = ResultsDocument::from_json_str(DOCUMENT).unwrap();
        let data = ComparisonData::from_document(&document);
        let clock = HostClock::realtime();
        let reference = SimulatedMedia::new(registry.acquire("reference", vec![1u8; 64].into()), 3.0, clock.clone());
        let attempt = SimulatedMedia::new(registry.acquire("attempt", vec![2u8; 64].into()), 3.0, clock);

        let config = AppConfig::default();
        let timeline = TimelineController::new(data.index.clone());
        let scheduler = SyncScheduler::new(DualMediaController::new(reference, attempt), data, &config);
        let surfaces = (FrameBuffer::new(16, 16, Color(0)), FrameBuffer::new(16, 16, Color(0)));
        spawn_session(scheduler, timeline, surfaces, &config.playback)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_and_publishes_reports() {
        let registry = SourceRegistry::new();
        let session = start(&registry);

        assert!(session.send(Command::StartSynced));
        tokio::time::sleep(Duration::from_millis(500)).await;

        let report = session.latest();
        assert_eq!(report.mode, ModeKind::LinearSynced);
        assert_eq!(report.segment, Some(0));
        assert!(report.reference_time > 0.3);

        let summary = session.reset().await.unwrap();
        assert!(summary.ticks >= 25);
        assert_eq!(summary.final_mode, ModeKind::LinearSynced);
    }

    #[tokio::test(start_paused = true)]
    async fn segment_replay_runs_through_the_loop() {
        let registry = SourceRegistry::new();
        let session = start(&registry);

        session.send(SessionCommand::ReplaySegment { segment: 1, play: true });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.latest().mode, ModeKind::SegmentBounded);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let report = session.latest();
        assert_eq!(report.mode, ModeKind::Free);
        assert!(report.attempt_time >= 2.4);

        session.send(SessionCommand::ReplaySegment { segment: 9, play: true });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.latest().mode, ModeKind::Free);
        session.reset().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_releases_media_sources() {
        let registry = SourceRegistry::new();
        let session = start(&registry);
        assert_eq!(registry.live_sources(), 2);

        session.send(Command::PlayFree);
        session.send(SeekRequest::Time(1.5));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let reports = session.reports();

        let summary = session.reset().await.unwrap();
        assert_eq!(summary.final_mode, ModeKind::Free);
        assert_eq!(registry.live_sources(), 0);
        assert_eq!(registry.live_bytes(), 0);
        assert!(reports.has_changed().is_err());
    }
}
