//! Playable media handles and the temporary sources that back them.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod simulated;
pub mod source;

pub use simulated::{HostClock, SimulatedMedia};
pub use source::{MediaSource, SourceRegistry};

/// Which of the two compared videos a command or signal refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Reference,
    Attempt,
}

impl Stream {
    pub const BOTH: [Stream; 2] = [Stream::Reference, Stream::Attempt];
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Reference => f.write_str("reference"),
            Stream::Attempt => f.write_str("attempt"),
        }
    }
}

/// Notifications a media handle raises from its own playback machinery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaSignal {
    Loaded { duration: f64 },
    Playing,
    Paused,
    Seeked(f64),
    Ended,
}

/// An independently clocked, playable video.
///
/// Commands are fire-and-forget: their effect is observed through
/// [`MediaHandle::current_time`] and the drained signals, never awaited.
pub trait MediaHandle {
    /// Whether metadata has loaded and commands take effect.
    fn is_ready(&self) -> bool;
    /// Live playback position in seconds.
    fn current_time(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    /// Signals raised since the previous call, oldest first.
    fn drain_signals(&mut self) -> Vec<MediaSignal>;
}

impl<T: MediaHandle + ?Sized> MediaHandle for Box<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn duration(&self) -> Option<f64> {
        (**self).duration()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn play(&mut self) {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn seek(&mut self, seconds: f64) {
        (**self).seek(seconds)
    }

    fn drain_signals(&mut self) -> Vec<MediaSignal> {
        (**self).drain_signals()
    }
}
