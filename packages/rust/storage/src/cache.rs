//! Per-stage, per-note cache store.

use noteharvest_shared::{HarvestError, Note, Result, Stage, StageKind};
use tracing::debug;

use crate::fs;
use crate::layout::NotesLayout;

/// Key-value store for stage outputs, keyed by `(stage, note id)`.
///
/// With `force_recompute` set, [`has`](Self::has) always reports `false` so
/// every stage re-derives its output, while [`put`](Self::put) still writes
/// (and overwrites) the results.
#[derive(Debug, Clone)]
pub struct CacheStore {
    layout: NotesLayout,
    force_recompute: bool,
}

impl CacheStore {
    pub fn new(layout: NotesLayout, force_recompute: bool) -> Self {
        Self {
            layout,
            force_recompute,
        }
    }

    pub fn layout(&self) -> &NotesLayout {
        &self.layout
    }

    /// Whether a structured record exists for `(stage, id)`.
    pub async fn has(&self, stage: Stage, id: &str) -> bool {
        if self.force_recompute {
            return false;
        }
        fs::exists(&self.layout.record_path(stage, id)).await
    }

    /// Read the structured record for `(S, id)`.
    ///
    /// Fails with [`HarvestError::NotFound`] if absent,
    /// [`HarvestError::CacheRead`] if the record does not parse and
    /// [`HarvestError::MisplacedRecord`] if it describes another note.
    pub async fn get<S: StageKind>(&self, id: &str) -> Result<Note<S>> {
        let path = self.layout.record_path(S::STAGE, id);
        if !fs::exists(&path).await {
            return Err(HarvestError::NotFound {
                stage: S::STAGE,
                id: id.to_string(),
            });
        }

        let note: Note<S> = fs::read_json(&path).await?;
        if note.id() != id {
            return Err(HarvestError::MisplacedRecord {
                path,
                expected: id.to_string(),
                found: note.id().to_string(),
            });
        }
        debug!(stage = %S::STAGE, id, "cache hit");
        Ok(note)
    }

    /// Persist both artifacts of a note: the viewable article and the record.
    ///
    /// The record is written last so that it only exists once the article is
    /// in place.
    pub async fn put<S: StageKind>(&self, note: &Note<S>) -> Result<()> {
        let stage = note.stage();
        let id = note.id();

        fs::write_atomic(&self.layout.artifact_path(stage, id), &note.article).await?;
        fs::write_json(&self.layout.record_path(stage, id), note).await?;

        debug!(%stage, id, "cached stage output");
        Ok(())
    }

    /// Number of structured records stored for a stage.
    pub async fn count(&self, stage: Stage) -> Result<usize> {
        let dir = self.layout.stage_dir(stage);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(HarvestError::io(&dir, e)),
        };

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HarvestError::io(&dir, e))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".json") && !name.starts_with('.') {
                count += 1;
            }
        }
        Ok(count)
    }
}
