//! Core library for the pose comparison viewer.
//!
//! A results document from the offline scorer holds two keypoint sequences
//! and the path that aligns them. The modules here index that alignment,
//! play a reference and an attempt video against each other in one of three
//! coupling modes and draw both skeletons every display refresh.

pub mod alignment;
pub mod config;
pub mod error;
pub mod feedback;
pub mod media;
pub mod playback;
pub mod render;
pub mod results;
pub mod runtime;

pub use alignment::{frame_index_for, AlignmentIndex, ExcludedSegment, Segment};
pub use config::{AppConfig, PlaybackConfig, RenderConfig, SyncPolicy};
pub use error::{PoseSyncError, Result};
pub use feedback::{heat_color, problem_moments, worst_moments, ProblemMoment, ScoreBand};
pub use media::{HostClock, MediaHandle, MediaSignal, MediaSource, SimulatedMedia, SourceRegistry, Stream};
pub use playback::{
    Command, ComparisonData, DualMediaController, ModeKind, PlaybackMode, SeekRequest,
    SyncScheduler, TickReport, TimelineController,
};
pub use render::{Color, ColorScheme, CoordinateMode, DrawSurface, FrameBuffer, SkeletonRenderer};
pub use results::{KeypointFrame, KeypointSequence, Moment, ResultsDocument};
pub use runtime::{spawn_session, SessionCommand, SessionHandle, SessionSummary};
