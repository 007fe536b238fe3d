//! Directory layout of the notes workspace and its bootstrap/reset.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use noteharvest_shared::{HarvestError, ListingRecord, Result, Stage};
use tracing::{debug, info, instrument};

use crate::fs;

/// Name of the directory created under the working root.
const NOTES_DIR: &str = "notes";

/// Name of the listing cache file inside `notes/`.
const DATABASE_FILE: &str = "database.json";

/// Resolved paths of a notes workspace.
#[derive(Debug, Clone)]
pub struct NotesLayout {
    root: PathBuf,
}

/// What [`NotesLayout::prepare`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOutcome {
    /// Whether all previously persisted state was wiped.
    pub reset: bool,
}

impl NotesLayout {
    /// Layout rooted at `<work_dir>/notes`.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            root: work_dir.as_ref().join(NOTES_DIR),
        }
    }

    /// The `notes/` directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `notes/database.json`.
    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// `notes/<stage>/`.
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.as_str())
    }

    /// `notes/<stage>/<id>.json`.
    pub fn record_path(&self, stage: Stage, id: &str) -> PathBuf {
        self.stage_dir(stage).join(format!("{id}.json"))
    }

    /// `notes/<stage>/<id>.<ext>`.
    pub fn artifact_path(&self, stage: Stage, id: &str) -> PathBuf {
        self.stage_dir(stage)
            .join(format!("{id}.{}", stage.extension()))
    }

    /// Make sure the workspace exists.
    ///
    /// The whole `notes/` tree is deleted first when `force_reset` is set or
    /// when the listing database is missing (a half-initialised workspace).
    /// After a reset the database holds an empty record.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn prepare(&self, force_reset: bool) -> Result<PrepareOutcome> {
        let reset = force_reset || !fs::exists(&self.database_path()).await;

        if reset {
            match tokio::fs::remove_dir_all(&self.root).await {
                Ok(()) => info!("cleared previous notes"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(HarvestError::setup(&self.root, e)),
            }
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| HarvestError::setup(&self.root, e))?;
        for stage in Stage::ALL {
            let dir = self.stage_dir(stage);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| HarvestError::setup(&dir, e))?;
        }

        if reset {
            fs::write_json(&self.database_path(), &ListingRecord::default())
                .await
                .map_err(into_setup)?;
        }

        debug!(reset, "notes workspace ready");
        Ok(PrepareOutcome { reset })
    }
}

fn into_setup(err: HarvestError) -> HarvestError {
    match err {
        HarvestError::Io { path, source } => HarvestError::Setup { path, source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nh-layout-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn paths_follow_stage_conventions() {
        let layout = NotesLayout::new("/work");
        assert_eq!(
            layout.artifact_path(Stage::Markdown, "7"),
            PathBuf::from("/work/notes/markdown/7.md")
        );
        assert_eq!(
            layout.record_path(Stage::Rendered, "7"),
            PathBuf::from("/work/notes/rendered/7.json")
        );
        assert_eq!(layout.database_path(), PathBuf::from("/work/notes/database.json"));
    }

    #[tokio::test]
    async fn prepare_creates_fresh_workspace() {
        let tmp = temp_dir();
        let layout = NotesLayout::new(&tmp);

        let outcome = layout.prepare(false).await.unwrap();
        assert!(outcome.reset, "missing database forces a reset");

        for stage in Stage::ALL {
            assert!(layout.stage_dir(stage).is_dir());
        }
        let db = std::fs::read_to_string(layout.database_path()).unwrap();
        assert_eq!(db, "{}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn prepare_keeps_existing_workspace() {
        let tmp = temp_dir();
        let layout = NotesLayout::new(&tmp);
        layout.prepare(false).await.unwrap();

        let keep = layout.artifact_path(Stage::Raw, "1");
        std::fs::write(&keep, "<html/>").unwrap();

        let outcome = layout.prepare(false).await.unwrap();
        assert!(!outcome.reset);
        assert!(keep.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn forced_prepare_wipes_everything() {
        let tmp = temp_dir();
        let layout = NotesLayout::new(&tmp);
        layout.prepare(false).await.unwrap();

        let stale = layout.record_path(Stage::Readable, "1");
        std::fs::write(&stale, "{}").unwrap();

        let outcome = layout.prepare(true).await.unwrap();
        assert!(outcome.reset);
        assert!(!stale.exists());
        assert!(layout.stage_dir(Stage::Readable).is_dir());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
