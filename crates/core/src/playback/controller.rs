use serde::Serialize;

use crate::media::{MediaHandle, MediaSignal, Stream};

/// What the controller knows about one handle, updated from its signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreamStatus {
    pub ready: bool,
    pub duration: Option<f64>,
    pub playing: bool,
    pub ended: bool,
    pub last_seek: Option<f64>,
}

impl StreamStatus {
    fn apply(&mut self, signal: MediaSignal) {
        match signal {
            MediaSignal::Loaded { duration } => {
                self.ready = true;
                self.duration = Some(duration);
            }
            MediaSignal::Playing => {
                self.playing = true;
                self.ended = false;
            }
            MediaSignal::Paused => self.playing = false,
            MediaSignal::Seeked(seconds) => {
                self.last_seek = Some(seconds);
                self.ended = false;
            }
            MediaSignal::Ended => {
                self.playing = false;
                self.ended = true;
            }
        }
    }
}

/// Owns the reference and attempt handles. Every command is a no-op on a
/// handle that has not finished loading.
#[derive(Debug)]
pub struct DualMediaController<M> {
    reference: M,
    attempt: M,
    reference_status: StreamStatus,
    attempt_status: StreamStatus,
}

impl<M: MediaHandle> DualMediaController<M> {
    pub fn new(reference: M, attempt: M) -> Self {
        Self {
            reference,
            attempt,
            reference_status: StreamStatus::default(),
            attempt_status: StreamStatus::default(),
        }
    }

    pub fn handle(&self, stream: Stream) -> &M {
        match stream {
            Stream::Reference => &self.reference,
            Stream::Attempt => &self.attempt,
        }
    }

    pub fn handle_mut(&mut self, stream: Stream) -> &mut M {
        match stream {
            Stream::Reference => &mut self.reference,
            Stream::Attempt => &mut self.attempt,
        }
    }

    pub fn status(&self, stream: Stream) -> &StreamStatus {
        match stream {
            Stream::Reference => &self.reference_status,
            Stream::Attempt => &self.attempt_status,
        }
    }

    fn status_mut(&mut self, stream: Stream) -> &mut StreamStatus {
        match stream {
            Stream::Reference => &mut self.reference_status,
            Stream::Attempt => &mut self.attempt_status,
        }
    }

    /// Live position of `stream`; 0 until the handle is ready.
    pub fn current_time(&self, stream: Stream) -> f64 {
        let handle = self.handle(stream);
        if handle.is_ready() {
            handle.current_time()
        } else {
            0.0
        }
    }

    pub fn play(&mut self) {
        for stream in Stream::BOTH {
            self.play_stream(stream);
        }
    }

    pub fn pause(&mut self) {
        for stream in Stream::BOTH {
            self.pause_stream(stream);
        }
    }

    pub fn seek_both(&mut self, seconds: f64) {
        for stream in Stream::BOTH {
            self.seek_stream(stream, seconds);
        }
    }

    pub fn seek_ref(&mut self, seconds: f64) {
        self.seek_stream(Stream::Reference, seconds);
    }

    pub fn seek_att(&mut self, seconds: f64) {
        self.seek_stream(Stream::Attempt, seconds);
    }

    pub fn play_stream(&mut self, stream: Stream) {
        if let Some(handle) = self.ready_handle(stream, "play") {
            handle.play();
        }
    }

    pub fn pause_stream(&mut self, stream: Stream) {
        if let Some(handle) = self.ready_handle(stream, "pause") {
            handle.pause();
        }
    }

    pub fn seek_stream(&mut self, stream: Stream, seconds: f64) {
        if !seconds.is_finite() {
            tracing::debug!(%stream, seconds, "ignoring seek to non-finite time");
            return;
        }
        if let Some(handle) = self.ready_handle(stream, "seek") {
            handle.seek(seconds.max(0.0));
        }
    }

    /// Folds pending handle signals into the tracked status and returns the
    /// streams that reached their end since the previous call.
    pub fn pump_signals(&mut self) -> Vec<Stream> {
        let mut ended = Vec::new();
        for stream in Stream::BOTH {
            let signals = self.handle_mut(stream).drain_signals();
            for signal in signals {
                self.status_mut(stream).apply(signal);
                if signal == MediaSignal::Ended {
                    tracing::debug!(%stream, "stream reached its end");
                    ended.push(stream);
                }
            }
        }
        ended
    }

    pub fn into_handles(self) -> (M, M) {
        (self.reference, self.attempt)
    }

    fn ready_handle(&mut self, stream: Stream, command: &'static str) -> Option<&mut M> {
        let handle = self.handle_mut(stream);
        if handle.is_ready() {
            Some(handle)
        } else {
            tracing::debug!(%stream, command, "handle not ready; dropping command");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{HostClock, SimulatedMedia, SourceRegistry};

    fn controller(
        registry: &SourceRegistry,
        clock: &HostClock,
    ) -> DualMediaController<SimulatedMedia> {
        let reference = SimulatedMedia::new(registry.acquire("ref", vec![0u8; 4].into()), 10.0, clock.clone());
        let attempt = SimulatedMedia::new(registry.acquire("att", vec![0u8; 4].into()), 8.0, clock.clone());
        DualMediaController::new(reference, attempt)
    }

    #[test]
    fn tracks_status_from_signals() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut media = controller(&registry, &clock);

        media.play();
        assert!(media.pump_signals().is_empty());
        assert!(media.status(Stream::Reference).playing);
        assert_eq!(media.status(Stream::Attempt).duration, Some(8.0));

        clock.advance(9.0);
        assert_eq!(media.pump_signals(), vec![Stream::Attempt]);
        assert!(media.status(Stream::Attempt).ended);
        assert!(!media.status(Stream::Attempt).playing);
        assert!(media.status(Stream::Reference).playing);
    }

    #[test]
    fn seek_both_is_idempotent() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut once = controller(&registry, &clock);
        let mut twice = controller(&registry, &clock);

        once.seek_both(3.5);
        once.pump_signals();
        twice.seek_both(3.5);
        twice.seek_both(3.5);
        twice.pump_signals();

        for stream in Stream::BOTH {
            assert_eq!(once.current_time(stream), twice.current_time(stream));
            assert_eq!(once.status(stream), twice.status(stream));
        }
        assert_eq!(twice.current_time(Stream::Reference), 3.5);
    }

    #[test]
    fn commands_on_unready_handles_are_dropped() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let reference = SimulatedMedia::pending(registry.acquire("ref", vec![0u8; 4].into()), 10.0, clock.clone());
        let attempt = SimulatedMedia::new(registry.acquire("att", vec![0u8; 4].into()), 10.0, clock.clone());
        let mut media = DualMediaController::new(reference, attempt);

        media.seek_both(2.0);
        media.play();
        clock.advance(1.0);
        media.pump_signals();

        assert_eq!(media.current_time(Stream::Reference), 0.0);
        assert!(!media.status(Stream::Reference).ready);
        assert_eq!(media.current_time(Stream::Attempt), 3.0);

        media.seek_stream(Stream::Attempt, f64::NAN);
        assert_eq!(media.current_time(Stream::Attempt), 3.0);
    }
}
