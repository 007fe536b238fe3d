//! Listing cache: the discovered note urls in `notes/database.json`.

use noteharvest_shared::{HarvestError, ListingRecord, Result};
use tracing::{debug, warn};

use crate::fs;
use crate::layout::NotesLayout;

/// Reads and writes the single listing record.
///
/// Only an explicit reset invalidates it; there is no staleness check.
#[derive(Debug, Clone)]
pub struct ListingCache {
    layout: NotesLayout,
}

impl ListingCache {
    pub fn new(layout: NotesLayout) -> Self {
        Self { layout }
    }

    /// Load the record. A missing or unreadable file is an empty record.
    pub async fn load(&self) -> Result<ListingRecord> {
        let path = self.layout.database_path();
        match fs::read_json::<ListingRecord>(&path).await {
            Ok(record) => Ok(record),
            Err(HarvestError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(ListingRecord::default())
            }
            Err(err @ HarvestError::CacheRead { .. }) => {
                warn!(error = %err, "listing cache unreadable, treating as empty");
                Ok(ListingRecord::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the record with a freshly discovered listing.
    pub async fn store(&self, urls: &[String]) -> Result<ListingRecord> {
        let record = ListingRecord::discovered(urls.to_vec());
        fs::write_json(&self.layout.database_path(), &record).await?;
        debug!(count = urls.len(), "listing cached");
        Ok(record)
    }
}
