use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::time::Instant;

use super::{MediaHandle, MediaSignal, MediaSource};

/// Time base a simulated player advances against.
#[derive(Debug, Clone)]
pub enum HostClock {
    /// Tokio's clock, so paused-time tests stay deterministic.
    Realtime(Instant),
    /// Seconds stored as `f64` bits, advanced explicitly.
    Manual(Arc<AtomicU64>),
}

impl HostClock {
    pub fn realtime() -> Self {
        HostClock::Realtime(Instant::now())
    }

    pub fn manual() -> Self {
        HostClock::Manual(Arc::new(AtomicU64::new(0f64.to_bits())))
    }

    /// Seconds since the clock was created.
    pub fn now(&self) -> f64 {
        match self {
            HostClock::Realtime(origin) => origin.elapsed().as_secs_f64(),
            HostClock::Manual(seconds) => f64::from_bits(seconds.load(Ordering::Acquire)),
        }
    }

    /// Moves a manual clock forward. Real time cannot be pushed.
    pub fn advance(&self, seconds: f64) {
        if let HostClock::Manual(current) = self {
            let next = f64::from_bits(current.load(Ordering::Acquire)) + seconds.max(0.0);
            current.store(next.to_bits(), Ordering::Release);
        }
    }
}

/// A media handle that plays back a fixed duration against a host clock,
/// optionally at a rate other than 1.0 to mimic decoder drift.
#[derive(Debug)]
pub struct SimulatedMedia {
    source: Option<MediaSource>,
    clock: HostClock,
    duration: f64,
    rate: f64,
    ready: bool,
    playing: bool,
    /// Position at `anchor`.
    position: f64,
    anchor: f64,
    signals: Vec<MediaSignal>,
}

impl SimulatedMedia {
    /// A handle whose metadata is already loaded.
    pub fn new(source: MediaSource, duration: f64, clock: HostClock) -> Self {
        let mut media = Self::pending(source, duration, clock);
        media.mark_ready();
        media
    }

    /// A handle that ignores commands until [`SimulatedMedia::mark_ready`].
    pub fn pending(source: MediaSource, duration: f64, clock: HostClock) -> Self {
        let anchor = clock.now();
        Self {
            source: Some(source),
            clock,
            duration: duration.max(0.0),
            rate: 1.0,
            ready: false,
            playing: false,
            position: 0.0,
            anchor,
            signals: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate.max(0.0);
        self
    }

    pub fn mark_ready(&mut self) {
        if !self.ready {
            self.ready = true;
            self.signals.push(MediaSignal::Loaded {
                duration: self.duration,
            });
        }
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    /// Swaps the backing source; the previous one is released immediately.
    pub fn replace_source(&mut self, source: MediaSource, duration: f64) {
        self.source = Some(source);
        self.duration = duration.max(0.0);
        self.playing = false;
        self.position = 0.0;
        self.anchor = self.clock.now();
        self.ready = false;
        self.mark_ready();
    }

    fn capture(&mut self) {
        self.position = self.current_time();
        self.anchor = self.clock.now();
    }
}

impl MediaHandle for SimulatedMedia {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_time(&self) -> f64 {
        if self.playing {
            let elapsed = (self.clock.now() - self.anchor).max(0.0);
            (self.position + elapsed * self.rate).min(self.duration)
        } else {
            self.position
        }
    }

    fn duration(&self) -> Option<f64> {
        self.ready.then_some(self.duration)
    }

    fn is_playing(&self) -> bool {
        self.playing && self.current_time() < self.duration
    }

    fn play(&mut self) {
        if !self.ready || self.playing {
            return;
        }
        if self.position >= self.duration {
            self.position = 0.0;
        }
        self.anchor = self.clock.now();
        self.playing = true;
        self.signals.push(MediaSignal::Playing);
    }

    fn pause(&mut self) {
        if !self.ready || !self.playing {
            return;
        }
        self.capture();
        self.playing = false;
        self.signals.push(MediaSignal::Paused);
    }

    fn seek(&mut self, seconds: f64) {
        if !self.ready {
            return;
        }
        self.capture();
        self.position = seconds.clamp(0.0, self.duration);
        self.signals.push(MediaSignal::Seeked(self.position));
    }

    fn drain_signals(&mut self) -> Vec<MediaSignal> {
        if self.playing && self.current_time() >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.signals.push(MediaSignal::Paused);
            self.signals.push(MediaSignal::Ended);
        }
        std::mem::take(&mut self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SourceRegistry;

    fn media(registry: &SourceRegistry, clock: &HostClock, duration: f64) -> SimulatedMedia {
        SimulatedMedia::new(registry.acquire("clip", vec![1u8; 4].into()), duration, clock.clone())
    }

    #[test]
    fn advances_with_the_host_clock() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut player = media(&registry, &clock, 5.0).with_rate(1.5);

        assert_eq!(player.drain_signals(), vec![MediaSignal::Loaded { duration: 5.0 }]);
        player.play();
        clock.advance(2.0);
        assert!((player.current_time() - 3.0).abs() < 1e-9);

        player.pause();
        clock.advance(2.0);
        assert!((player.current_time() - 3.0).abs() < 1e-9);
        assert_eq!(player.drain_signals(), vec![MediaSignal::Playing, MediaSignal::Paused]);
    }

    #[test]
    fn signals_end_of_stream_once() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut player = media(&registry, &clock, 1.0);
        player.drain_signals();

        player.play();
        clock.advance(3.0);
        assert_eq!(player.current_time(), 1.0);
        assert!(!player.is_playing());

        let signals = player.drain_signals();
        assert!(signals.contains(&MediaSignal::Ended));
        assert!(player.drain_signals().is_empty());

        player.play();
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn pending_handle_ignores_commands() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut player =
            SimulatedMedia::pending(registry.acquire("clip", vec![0u8; 2].into()), 4.0, clock.clone());

        player.seek(2.0);
        player.play();
        clock.advance(1.0);
        assert!(!player.is_ready());
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.duration(), None);
        assert!(player.drain_signals().is_empty());

        player.mark_ready();
        player.seek(2.0);
        assert_eq!(player.current_time(), 2.0);
    }

    #[test]
    fn replacing_source_releases_previous_one() {
        let registry = SourceRegistry::new();
        let clock = HostClock::manual();
        let mut player = media(&registry, &clock, 2.0);

        player.replace_source(registry.acquire("retake", vec![0u8; 8].into()), 3.0);
        assert_eq!(registry.live_sources(), 1);
        assert_eq!(player.source().map(|s| s.label()), Some("retake"));
        assert_eq!(player.duration(), Some(3.0));

        drop(player);
        assert_eq!(registry.live_sources(), 0);
    }
}
