//! Stage transforms and the cache-or-compute wrapper around them.

use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use noteharvest_shared::{HarvestError, Meta, Note, Result, StageKind};
use noteharvest_storage::CacheStore;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Anything that identifies the note it belongs to.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Meta {
    fn key(&self) -> &str {
        &self.id
    }
}

impl<S: StageKind> Keyed for Note<S> {
    fn key(&self) -> &str {
        self.id()
    }
}

/// One step of the pipeline: derives the next representation of a note.
#[async_trait]
pub trait Transform: Send + Sync {
    type Input: Keyed + Send + Sync;
    type Output: StageKind;

    async fn apply(&self, input: &Self::Input) -> Result<Note<Self::Output>>;
}

// ---------------------------------------------------------------------------
// Memoized
// ---------------------------------------------------------------------------

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl Add for CacheStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
        }
    }
}

/// Wraps a [`Transform`] so each `(stage, id)` is computed at most once per
/// cache lifetime.
///
/// A stored record is returned as-is unless the store is in force-recompute
/// mode. Unreadable records fall through to recomputation. Transform failures
/// are wrapped with the stage and note id and are never cached.
pub struct Memoized<T> {
    transform: T,
    cache: CacheStore,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Transform> Memoized<T> {
    pub fn new(transform: T, cache: CacheStore) -> Self {
        Self {
            transform,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn run(&self, input: &T::Input) -> Result<Note<T::Output>> {
        let stage = <T::Output as StageKind>::STAGE;
        let id = input.key();

        if self.cache.has(stage, id).await {
            match self.cache.get::<T::Output>(id).await {
                Ok(note) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(note);
                }
                Err(e) if e.is_cache_miss() => {
                    warn!(%stage, id, error = %e, "discarding unreadable cache record");
                }
                Err(e) => return Err(e),
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%stage, id, "computing");

        let note = self
            .transform
            .apply(input)
            .await
            .map_err(|e| HarvestError::stage(stage, id, e))?;
        self.cache.put(&note).await?;

        Ok(note)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;

    use noteharvest_shared::{Raw, RawNote, Stage};
    use noteharvest_storage::NotesLayout;

    use super::*;

    /// A transform that counts how many times it runs.
    struct CountingTransform {
        calls: AtomicU64,
        fail: AtomicBool,
    }

    impl CountingTransform {
        fn new() -> Self {
            Self {
                calls: AtomicU64::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Transform for CountingTransform {
        type Input = Meta;
        type Output = Raw;

        async fn apply(&self, input: &Meta) -> Result<RawNote> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                return Err(HarvestError::Extraction("nothing here".into()));
            }
            Ok(Note::new(
                input.clone(),
                "Title",
                format!("content #{n}"),
                format!("<html>#{n}</html>"),
            ))
        }
    }

    async fn store(force: bool) -> (CacheStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("nh-stage-test-{}", uuid::Uuid::now_v7()));
        let layout = NotesLayout::new(&dir);
        layout.prepare(false).await.unwrap();
        (CacheStore::new(layout, force), dir)
    }

    fn meta() -> Meta {
        Meta::from_url("https://example.com/notes/my-slug/1234567890/").unwrap()
    }

    #[tokio::test]
    async fn second_run_is_a_cache_hit() {
        let (cache, dir) = store(false).await;
        let stage = Memoized::new(CountingTransform::new(), cache);

        let first = stage.run(&meta()).await.unwrap();
        let second = stage.run(&meta()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stage.transform.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stage.stats(), CacheStats { hits: 1, misses: 1 });

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn force_recompute_always_runs_and_overwrites() {
        let (cache, dir) = store(true).await;
        let stage = Memoized::new(CountingTransform::new(), cache.clone());

        stage.run(&meta()).await.unwrap();
        let second = stage.run(&meta()).await.unwrap();

        assert_eq!(stage.transform.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.content, "content #2");

        let record = cache.layout().record_path(Stage::Raw, "1234567890");
        let stored: RawNote =
            serde_json::from_str(&std::fs::read_to_string(record).unwrap()).unwrap();
        assert_eq!(stored.content, "content #2");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_record_is_recomputed() {
        let (cache, dir) = store(false).await;
        let stage = Memoized::new(CountingTransform::new(), cache.clone());

        stage.run(&meta()).await.unwrap();
        let record = cache.layout().record_path(Stage::Raw, "1234567890");
        std::fs::write(&record, "{\"url\": ").unwrap();

        let note = stage.run(&meta()).await.unwrap();
        assert_eq!(note.content, "content #2");
        assert_eq!(stage.stats(), CacheStats { hits: 0, misses: 2 });

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn truncated_multibyte_record_is_recomputed() {
        let (cache, dir) = store(false).await;
        let stage = Memoized::new(CountingTransform::new(), cache.clone());

        stage.run(&meta()).await.unwrap();
        let record = cache.layout().record_path(Stage::Raw, "1234567890");
        std::fs::write(&record, b"{\"title\": \"caf\xc3").unwrap();

        let note = stage.run(&meta()).await.unwrap();
        assert_eq!(note.content, "content #2");
        assert_eq!(stage.stats(), CacheStats { hits: 0, misses: 2 });

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failures_are_wrapped_and_not_cached() {
        let (cache, dir) = store(false).await;
        let stage = Memoized::new(CountingTransform::new(), cache.clone());
        stage.transform.fail.store(true, Ordering::SeqCst);

        let err = stage.run(&meta()).await.unwrap_err();
        assert_eq!(err.to_string(), "raw stage failed for note 1234567890");
        assert!(!cache.has(Stage::Raw, "1234567890").await);

        stage.transform.fail.store(false, Ordering::SeqCst);
        stage.run(&meta()).await.unwrap();
        assert_eq!(stage.transform.calls.load(Ordering::SeqCst), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
