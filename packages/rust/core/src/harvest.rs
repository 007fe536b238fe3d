//! End-to-end harvest: workspace → listing → every note through the pipeline.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use noteharvest_crawler::{ContentExtractor, SessionProvider, SourceFetcher};
use noteharvest_discovery::ListingOptions;
use noteharvest_shared::{HarvestConfig, Meta, Result, Stage};
use noteharvest_storage::{CacheStore, ListingCache, NotesLayout};

use crate::pipeline::DocumentPipeline;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Outcome of a completed harvest.
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    /// Notes that went through the full pipeline.
    pub documents: usize,
    /// Stage outputs read back from the cache.
    pub cache_hits: u64,
    /// Stage outputs computed (and written) in this run.
    pub cache_misses: u64,
    /// Whether the listing came from `database.json` rather than discovery.
    pub listing_cached: bool,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting harvest status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a note enters the pipeline.
    fn note_started(&self, id: &str, current: usize, total: usize);
    /// Called when the harvest completes.
    fn done(&self, summary: &HarvestSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn note_started(&self, _id: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &HarvestSummary) {}
}

// ---------------------------------------------------------------------------
// Harvest
// ---------------------------------------------------------------------------

/// Run a full harvest.
///
/// 1. Prepare `notes/` (reset on `--clean` or a missing listing cache)
/// 2. Load the cached listing, or log in and discover it
/// 3. Derive one [`Meta`] per listed url
/// 4. Run every note through the [`DocumentPipeline`], one at a time
///
/// The session is shut down afterwards whether or not the run succeeded.
#[instrument(skip_all, fields(run_id = %uuid::Uuid::now_v7(), user = %config.username))]
pub async fn harvest<B>(
    config: &HarvestConfig,
    session: &B,
    extractor: &dyn ContentExtractor,
    progress: &dyn ProgressReporter,
) -> Result<HarvestSummary>
where
    B: SessionProvider + SourceFetcher,
{
    let result = run(config, session, extractor, progress).await;

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "failed to shut down the browser session");
    }

    let summary = result?;
    progress.done(&summary);
    Ok(summary)
}

async fn run<B>(
    config: &HarvestConfig,
    session: &B,
    extractor: &dyn ContentExtractor,
    progress: &dyn ProgressReporter,
) -> Result<HarvestSummary>
where
    B: SessionProvider + SourceFetcher,
{
    let start = Instant::now();
    config.validate()?;

    // --- Phase 1: Workspace ---
    progress.phase("Preparing workspace");
    let layout = NotesLayout::new(&config.work_dir);
    let outcome = layout.prepare(config.force_recompute).await?;
    info!(root = %layout.root().display(), reset = outcome.reset, "workspace ready");

    // --- Phase 2: Listing ---
    let listing = ListingCache::new(layout.clone());
    let record = listing.load().await?;
    let (urls, listing_cached) = match record.cached_urls() {
        Some(urls) if !config.force_recompute => {
            info!(count = urls.len(), "using cached listing");
            (urls.to_vec(), true)
        }
        _ => {
            progress.phase("Waiting for login");
            let identity = session.login().await?;
            info!(%identity, "session ready");

            progress.phase("Discovering notes");
            let opts = ListingOptions {
                poll_interval: config.poll_interval,
                stable_polls: config.stable_polls,
                max_ticks: config.max_ticks,
            };
            let urls = session.discover_listing(&config.listing_url(), &opts).await?;
            listing.store(&urls).await?;
            (urls, false)
        }
    };

    // --- Phase 3: Metas ---
    let metas = Meta::from_urls(&urls)?;
    let total = metas.len();

    // --- Phase 4: Pipeline ---
    progress.phase("Harvesting notes");
    info!(total, "fetching content for notes");

    let cache = CacheStore::new(layout, config.force_recompute);
    let pipeline =
        DocumentPipeline::new(&cache, session, extractor, &config.source.stylesheet_url);

    for (i, meta) in metas.iter().enumerate() {
        progress.note_started(&meta.id, i + 1, total);
        info!(id = %meta.id, current = i + 1, total, "harvesting note");
        pipeline.run(meta).await?;
    }

    let stats = pipeline.stats();
    let summary = HarvestSummary {
        documents: total,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        listing_cached,
        elapsed: start.elapsed(),
    };

    info!(
        documents = summary.documents,
        cache_hits = summary.cache_hits,
        cache_misses = summary.cache_misses,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "harvest complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// What a working directory currently holds.
#[derive(Debug, Clone)]
pub struct WorkspaceStatus {
    /// Listed note urls, if a listing has been discovered.
    pub listed: Option<usize>,
    /// When the listing was discovered.
    pub discovered_at: Option<DateTime<Utc>>,
    /// Cached record count per stage, in pipeline order.
    pub stages: Vec<(Stage, usize)>,
}

/// Inspect a working directory without modifying it.
pub async fn workspace_status(work_dir: &Path) -> Result<WorkspaceStatus> {
    let layout = NotesLayout::new(work_dir);
    let record = ListingCache::new(layout.clone()).load().await?;
    let cache = CacheStore::new(layout, false);

    let mut stages = Vec::with_capacity(Stage::ALL.len());
    for stage in Stage::ALL {
        stages.push((stage, cache.count(stage).await?));
    }

    Ok(WorkspaceStatus {
        listed: record.cached_urls().map(<[String]>::len),
        discovered_at: record.discovered_at,
        stages,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
