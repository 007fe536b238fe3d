//! Listing discovery for infinitely-scrolling sources.
//!
//! The listing page loads more entries as it is scrolled, with no reliable
//! "end of list" signal. [`discover`] keeps scrolling on a fixed interval and
//! accumulates matching links until the set has not grown for a number of
//! consecutive ticks (see [`Stabilization`]).

mod stabilization;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use noteharvest_shared::{HarvestError, Result};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

pub use stabilization::Stabilization;

/// Default delay between ticks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of consecutive unchanged ticks that ends discovery.
const DEFAULT_STABLE_POLLS: u32 = 10;

// ---------------------------------------------------------------------------
// LinkSource
// ---------------------------------------------------------------------------

/// A live listing that can be advanced one tick at a time.
#[async_trait]
pub trait LinkSource: Send {
    /// Scroll to the bottom and return every matching link currently present.
    ///
    /// Links already returned on earlier ticks may be returned again.
    async fn poll_links(&mut self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tuning for [`discover`].
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Delay between ticks.
    pub poll_interval: Duration,
    /// Consecutive unchanged ticks required to finish.
    pub stable_polls: u32,
    /// Give up after this many ticks.
    pub max_ticks: Option<u32>,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stable_polls: DEFAULT_STABLE_POLLS,
            max_ticks: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Poll `source` until its link set stabilizes; return the links in first-seen order.
///
/// The first tick fires one interval after the call, matching a timer that is
/// armed when the listing page has just loaded. An empty stable set is an
/// error ([`HarvestError::ListingEmpty`]), never an empty success.
#[instrument(skip_all, fields(stable_polls = opts.stable_polls))]
pub async fn discover<S: LinkSource + ?Sized>(
    source: &mut S,
    opts: &ListingOptions,
) -> Result<Vec<String>> {
    let mut interval =
        tokio::time::interval_at(Instant::now() + opts.poll_interval, opts.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut state = Stabilization::default();
    let mut ticks: u32 = 0;

    loop {
        interval.tick().await;
        ticks += 1;

        for url in source.poll_links().await? {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }

        state = state.advance(urls.len(), opts.stable_polls);
        debug!(tick = ticks, found = urls.len(), ?state, "listing tick");

        match state {
            Stabilization::Done { total } => {
                info!(total, ticks, "listing stabilized");
                return Ok(urls);
            }
            Stabilization::Failed => return Err(HarvestError::ListingEmpty),
            Stabilization::Polling { .. } | Stabilization::Stabilizing { .. } => {}
        }

        if opts.max_ticks.is_some_and(|max| ticks >= max) {
            return Err(HarvestError::validation(format!(
                "listing did not stabilize within {ticks} polls ({} links so far)",
                urls.len()
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Returns `links_at(tick)` on each tick, counting ticks.
    struct ScriptedSource<F> {
        ticks: Arc<AtomicU32>,
        links_at: F,
    }

    impl<F: Fn(u32) -> Vec<String> + Send> ScriptedSource<F> {
        fn new(links_at: F) -> (Self, Arc<AtomicU32>) {
            let ticks = Arc::new(AtomicU32::new(0));
            (
                Self {
                    ticks: ticks.clone(),
                    links_at,
                },
                ticks,
            )
        }
    }

    #[async_trait]
    impl<F: Fn(u32) -> Vec<String> + Send> LinkSource for ScriptedSource<F> {
        async fn poll_links(&mut self) -> Result<Vec<String>> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((self.links_at)(tick))
        }
    }

    fn links(n: u32) -> Vec<String> {
        (1..=n)
            .map(|i| format!("https://example.com/notes/n{i}/{i}/"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_at_tick_thirteen_when_growth_stops_at_three() {
        let (mut source, ticks) = ScriptedSource::new(|tick| links(tick.min(3)));
        let start = Instant::now();

        let urls = discover(&mut source, &ListingOptions::default()).await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 13);
        assert_eq!(urls, links(3));
        assert_eq!(start.elapsed(), Duration::from_millis(500 * 13));
    }

    #[tokio::test(start_paused = true)]
    async fn growth_at_tick_seven_restarts_countdown() {
        let (mut source, ticks) = ScriptedSource::new(|tick| match tick {
            1..=3 => links(tick),
            4..=6 => links(3),
            _ => links(5),
        });

        let urls = discover(&mut source, &ListingOptions::default()).await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 17);
        assert_eq!(urls.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_listing_is_an_error() {
        let (mut source, _) = ScriptedSource::new(|_| Vec::new());
        let err = discover(&mut source, &ListingOptions::default()).await.unwrap_err();
        assert!(matches!(err, HarvestError::ListingEmpty));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_are_merged_in_first_seen_order() {
        let (mut source, _) = ScriptedSource::new(|tick| {
            let mut all = links(tick.min(2));
            all.reverse();
            all.extend(links(tick.min(2)));
            all
        });
        let opts = ListingOptions {
            stable_polls: 2,
            ..ListingOptions::default()
        };

        let urls = discover(&mut source, &opts).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/notes/n1/1/".to_string(),
                "https://example.com/notes/n2/2/".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn max_ticks_bounds_a_listing_that_keeps_growing() {
        let (mut source, ticks) = ScriptedSource::new(links);
        let opts = ListingOptions {
            max_ticks: Some(5),
            ..ListingOptions::default()
        };

        let err = discover(&mut source, &opts).await.unwrap_err();
        assert!(err.to_string().contains("did not stabilize"));
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn source_errors_propagate() {
        struct Broken;

        #[async_trait]
        impl LinkSource for Broken {
            async fn poll_links(&mut self) -> Result<Vec<String>> {
                Err(HarvestError::Browser("page crashed".into()))
            }
        }

        let err = discover(&mut Broken, &ListingOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("page crashed"));
    }
}
