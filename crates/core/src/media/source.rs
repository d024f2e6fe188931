use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

/// Tracks the temporary playable sources created from in-memory video data.
///
/// Every [`MediaSource`] is registered here while it lives and removed when
/// it is dropped, so outstanding sources can be counted after a session ends.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, usize>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `data` to a new playable source.
    pub fn acquire(&self, label: impl Into<String>, data: Arc<[u8]>) -> MediaSource {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let label = label.into();
        self.lock().insert(id, data.len());
        tracing::debug!(id, %label, bytes = data.len(), "acquired media source");
        MediaSource {
            id,
            label,
            data,
            registry: self.inner.clone(),
        }
    }

    /// Number of sources acquired and not yet released.
    pub fn live_sources(&self) -> usize {
        self.lock().len()
    }

    /// Total bytes held by live sources.
    pub fn live_bytes(&self) -> usize {
        self.lock().values().sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, usize>> {
        self.inner.lock()
    }
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, usize>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("live_sources", &self.live_sources())
            .finish()
    }
}

/// A playable source bound to video bytes. Released when dropped.
pub struct MediaSource {
    id: u64,
    label: String,
    data: Arc<[u8]>,
    registry: Arc<RegistryInner>,
}

impl MediaSource {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MediaSource {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
        tracing::debug!(id = self.id, label = %self.label, "released media source");
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSource")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(len: usize) -> Arc<[u8]> {
        vec![0u8; len].into()
    }

    #[test]
    fn dropping_a_source_releases_it() {
        let registry = SourceRegistry::new();
        let reference = registry.acquire("reference.mp4", blob(16));
        let attempt = registry.acquire("attempt.mp4", blob(8));

        assert_eq!(registry.live_sources(), 2);
        assert_eq!(registry.live_bytes(), 24);
        assert_ne!(reference.id(), attempt.id());

        drop(reference);
        assert_eq!(registry.live_sources(), 1);
        drop(attempt);
        assert_eq!(registry.live_sources(), 0);
    }

    #[test]
    fn replacing_a_source_does_not_accumulate() {
        let registry = SourceRegistry::new();
        let mut current = registry.acquire("take-0", blob(4));
        for take in 1..10 {
            current = registry.acquire(format!("take-{take}"), blob(4));
        }

        assert_eq!(current.label(), "take-9");
        assert_eq!(registry.live_sources(), 1);
    }
}
