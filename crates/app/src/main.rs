use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use image::{imageops, ImageFormat, RgbImage};
use pose_sync_core::{
    feedback::DEFAULT_PROBLEM_THRESHOLD, heat_color, problem_moments, spawn_session, worst_moments,
    AppConfig, Color, Command, ComparisonData, DrawSurface, DualMediaController, FrameBuffer, HostClock,
    PoseSyncError, ResultsDocument, ScoreBand, SessionCommand, SimulatedMedia, SkeletonRenderer,
    SourceRegistry, SyncScheduler, TimelineController,
};
use tracing_subscriber::EnvFilter;

const BACKGROUND: Color = Color::rgb(0x11, 0x18, 0x27);

fn main() -> pose_sync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Inspect { results } => run_inspect(&results),
        Commands::Simulate {
            results,
            seconds,
            mode,
            replay_segment,
            attempt_rate,
        } => run_simulate(&results, &config, seconds, mode, replay_segment, attempt_rate),
        Commands::Render {
            results,
            out,
            time,
            path_position,
            width,
            height,
        } => run_render(&results, &out, &config, time, path_position, width, height),
    }
}

fn run_inspect(results: &PathBuf) -> pose_sync_core::Result<()> {
    let document = ResultsDocument::load(results)?;
    let data = ComparisonData::from_document(&document);
    let index = &data.index;

    println!(
        "overall score {:.1} ({})",
        document.overall_score,
        ScoreBand::from_score(document.overall_score)
    );
    println!(
        "reference: {} frames @ {} fps, attempt: {} frames @ {} fps",
        data.reference.frame_count(),
        data.reference.fps(),
        data.attempt.frame_count(),
        data.attempt.fps()
    );
    if index.is_available() {
        println!("alignment path: {} pairs", index.path_len());
    } else {
        println!("alignment path: unavailable, synced playback disabled");
    }

    for (position, segment) in index.segments().iter().enumerate() {
        let joints = if segment.problem_joints.is_empty() {
            "-".to_string()
        } else {
            segment.problem_joints.join(", ")
        };
        println!(
            "  #{position:<3} ref {:>6.2}-{:<6.2} att {:>6.2}-{:<6.2} score {:>5.1} {} {joints}",
            segment.start_time_ref,
            segment.end_time_ref,
            segment.start_time_user,
            segment.end_time_user,
            segment.score,
            heat_color(segment.score),
        );
    }
    for excluded in index.excluded_segments() {
        println!("  excluded segment {}: {}", excluded.position, excluded.reason);
    }

    for moment in worst_moments(&document) {
        println!(
            "worst: {} score {:.1} at {:.2}s",
            moment.joint, moment.score, moment.seek_time
        );
    }
    for moment in problem_moments(&document, DEFAULT_PROBLEM_THRESHOLD) {
        println!(
            "problem: {} score {:.1} at {:.2}s",
            moment.joint, moment.score, moment.seek_time
        );
    }
    Ok(())
}

fn run_simulate(
    results: &PathBuf,
    config: &AppConfig,
    seconds: f64,
    mode: SimulateMode,
    replay_segment: Option<usize>,
    attempt_rate: f64,
) -> pose_sync_core::Result<()> {
    let document = ResultsDocument::load(results)?;
    let data = ComparisonData::from_document(&document);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let registry = SourceRegistry::new();
        let clock = HostClock::realtime();
        let reference = SimulatedMedia::new(
            registry.acquire("reference", placeholder_blob(data.reference.frame_count())),
            data.reference.duration_secs(),
            clock.clone(),
        );
        let attempt = SimulatedMedia::new(
            registry.acquire("attempt", placeholder_blob(data.attempt.frame_count())),
            data.attempt.duration_secs(),
            clock,
        )
        .with_rate(attempt_rate);
        tracing::info!(
            sources = registry.live_sources(),
            bytes = registry.live_bytes(),
            "media sources acquired"
        );

        let timeline = TimelineController::new(data.index.clone());
        let scheduler = SyncScheduler::new(DualMediaController::new(reference, attempt), data, config);
        let surfaces = (FrameBuffer::new(320, 240, BACKGROUND), FrameBuffer::new(320, 240, BACKGROUND));
        let session = spawn_session(scheduler, timeline, surfaces, &config.playback);

        let opening = match (replay_segment, mode) {
            (Some(segment), _) => SessionCommand::ReplaySegment { segment, play: true },
            (None, SimulateMode::Synced) => Command::StartSynced.into(),
            (None, SimulateMode::Free) => Command::PlayFree.into(),
        };
        session.send(opening);

        let mut progress = tokio::time::interval(Duration::from_secs(1));
        let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = progress.tick() => {
                    let report = session.latest();
                    tracing::info!(
                        mode = %report.mode,
                        reference = report.reference_time,
                        attempt = report.attempt_time,
                        segment = ?report.segment,
                        "progress"
                    );
                }
            }
        }

        let summary = session.reset().await?;
        println!(
            "{} ticks, final mode {}, {} sources still live",
            summary.ticks,
            summary.final_mode,
            registry.live_sources()
        );
        Ok::<(), PoseSyncError>(())
    })
}

fn run_render(
    results: &PathBuf,
    out: &PathBuf,
    config: &AppConfig,
    time: Option<f64>,
    path_position: Option<usize>,
    width: u32,
    height: u32,
) -> pose_sync_core::Result<()> {
    let document = ResultsDocument::load(results)?;
    let data = ComparisonData::from_document(&document);

    let (reference_frame, attempt_frame) = match path_position {
        Some(position) => data
            .index
            .pair_at(position)
            .map(|(r, u)| (Some(r), Some(u)))
            .ok_or_else(|| PoseSyncError::msg("document has no alignment path"))?,
        None => {
            let seconds = time.unwrap_or(0.0);
            let reference_frame = data.reference.frame_index_at(seconds);
            let attempt_frame = match reference_frame {
                Some(frame) if data.index.is_available() => data.index.user_frame_for(frame),
                _ => data.attempt.frame_index_at(seconds),
            };
            (reference_frame, attempt_frame)
        }
    };
    tracing::info!(?reference_frame, ?attempt_frame, "rendering frame pair");

    let highlighted: Vec<usize> = reference_frame
        .map(|frame| frame as f64 / data.reference.fps())
        .and_then(|seconds| data.index.segment_for(seconds))
        .map(|(_, segment)| {
            segment
                .problem_joints
                .iter()
                .filter_map(|name| pose_sync_core::render::landmark_index(name))
                .collect()
        })
        .unwrap_or_default();

    let renderer = SkeletonRenderer::new(&config.render);
    let mut reference_surface = FrameBuffer::new(width, height, BACKGROUND);
    let mut attempt_surface = FrameBuffer::new(width, height, BACKGROUND);
    renderer.draw(
        &mut reference_surface,
        reference_frame.and_then(|i| data.reference.frame(i)),
        &config.render.reference,
    );
    renderer.draw_highlighted(
        &mut attempt_surface,
        attempt_frame.and_then(|i| data.attempt.frame(i)),
        &config.render.attempt,
        &highlighted,
    );

    let mut canvas = RgbImage::new(width * 2, height);
    imageops::replace(&mut canvas, &to_image(&reference_surface)?, 0, 0);
    imageops::replace(&mut canvas, &to_image(&attempt_surface)?, i64::from(width), 0);
    canvas
        .save_with_format(out, ImageFormat::Png)
        .map_err(|err| PoseSyncError::msg(format!("failed to write {}: {err}", out.display())))?;

    tracing::info!(?out, "wrote side-by-side render");
    Ok(())
}

fn to_image(surface: &FrameBuffer) -> pose_sync_core::Result<RgbImage> {
    let (width, height) = DrawSurface::size(surface);
    RgbImage::from_raw(width, height, surface.to_rgb8())
        .ok_or_else(|| PoseSyncError::msg("framebuffer size mismatch"))
}

/// Stand-in video bytes, sized like a small encoded clip.
fn placeholder_blob(frames: usize) -> Arc<[u8]> {
    vec![0u8; frames.max(1) * 1024].into()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Side-by-side pose comparison player", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SimulateMode {
    Synced,
    Free,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarise a results document: score, alignment and segments.
    Inspect {
        results: PathBuf,
    },
    /// Play both streams against simulated media for a while.
    Simulate {
        results: PathBuf,
        /// Wall-clock seconds to run before resetting the session.
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        #[arg(long, value_enum, default_value_t = SimulateMode::Synced)]
        mode: SimulateMode,
        /// Replay this segment instead of starting from the top.
        #[arg(long)]
        replay_segment: Option<usize>,
        /// Playback rate of the attempt stream, to provoke drift.
        #[arg(long, default_value_t = 1.0)]
        attempt_rate: f64,
    },
    /// Draw the reference and attempt skeletons side by side into a PNG.
    Render {
        results: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// Reference time in seconds.
        #[arg(long, conflicts_with = "path_position")]
        time: Option<f64>,
        /// Position along the alignment path.
        #[arg(long)]
        path_position: Option<usize>,
        #[arg(long, default_value_t = 480)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
    },
}
