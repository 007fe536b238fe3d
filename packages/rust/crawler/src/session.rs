//! Shared browser session: lazy Chromium launch and memoized login.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig as ChromeConfig, Page};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use noteharvest_discovery::{ListingOptions, discover};
use noteharvest_shared::{BrowserConfig, HarvestError, Result, SourceProfile};

use crate::listing::{ListingPage, listing_base};
use crate::script;

/// Delay between checks for the post-login marker.
const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Produces an authenticated session and the listing behind it.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Authenticate once and return the signed-in identity.
    ///
    /// Later calls return the same identity without repeating the flow.
    async fn login(&self) -> Result<String>;

    /// Open the listing at `url` and scroll it until its link set stabilizes.
    async fn discover_listing(&self, url: &str, opts: &ListingOptions) -> Result<Vec<String>>;

    /// Release the browser. Safe to call when it was never launched.
    async fn shutdown(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// BrowserSession
// ---------------------------------------------------------------------------

struct Launched {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// A single Chromium instance shared by every browser-backed operation.
///
/// Nothing is launched until the first page is needed.
pub struct BrowserSession {
    config: BrowserConfig,
    profile: SourceProfile,
    launched: Mutex<Option<Launched>>,
    identity: OnceCell<String>,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig, profile: SourceProfile) -> Self {
        Self {
            config,
            profile,
            launched: Mutex::new(None),
            identity: OnceCell::new(),
        }
    }

    pub fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    /// Open a new tab at `url`, launching the browser first if needed.
    pub(crate) async fn open_page(&self, url: &str) -> Result<Page> {
        let mut launched = self.launched.lock().await;
        if launched.is_none() {
            *launched = Some(self.launch().await?);
        }
        let Some(Launched { browser, .. }) = launched.as_ref() else {
            return Err(HarvestError::Browser("browser is not running".into()));
        };

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to open {url}: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| HarvestError::Browser(format!("navigation to {url} failed: {e}")))?;

        debug!(%url, "page opened");
        Ok(page)
    }

    #[instrument(skip_all, fields(headless = self.config.headless))]
    async fn launch(&self) -> Result<Launched> {
        let mut builder = ChromeConfig::builder();
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }
        let chrome_config = builder.build().map_err(HarvestError::Browser)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to launch chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("browser launched");
        Ok(Launched { browser, handler })
    }

    async fn authenticate(&self) -> Result<String> {
        let page = self.open_page(&self.profile.home_url).await?;
        info!("please log in using the browser window");

        let marker = script::selector_present(&self.profile.login_marker);
        while !evaluate::<bool>(&page, &marker).await? {
            tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
        }

        let identity: String =
            evaluate(&page, &script::identity(&self.profile.identity_selector)).await?;
        close_page(page).await;

        info!(%identity, "logged in");
        Ok(identity)
    }
}

#[async_trait]
impl SessionProvider for BrowserSession {
    async fn login(&self) -> Result<String> {
        self.identity
            .get_or_try_init(|| async { self.authenticate().await.map_err(HarvestError::login) })
            .await
            .cloned()
    }

    #[instrument(skip(self, opts))]
    async fn discover_listing(&self, url: &str, opts: &ListingOptions) -> Result<Vec<String>> {
        self.login().await?;
        info!("fetching the urls of all notes");

        let base = listing_base(url)?;
        let page = self.open_page(url).await?;
        let mut listing = ListingPage::new(page, &self.profile.listing_link_selector, base);
        let result = discover(&mut listing, opts).await;
        close_page(listing.into_page()).await;

        result
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(Launched {
            mut browser,
            handler,
        }) = self.launched.lock().await.take()
        else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map_err(|e| HarvestError::Browser(format!("failed to close browser: {e}")));
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        handler.abort();

        debug!("browser closed");
        closed.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Page helpers
// ---------------------------------------------------------------------------

/// Evaluate `expression` in `page` and deserialize its value.
pub(crate) async fn evaluate<T: DeserializeOwned>(page: &Page, expression: &str) -> Result<T> {
    page.evaluate(expression)
        .await
        .map_err(|e| HarvestError::Browser(format!("script evaluation failed: {e}")))?
        .into_value::<T>()
        .map_err(|e| HarvestError::Browser(format!("unexpected script result: {e}")))
}

/// Close a tab; failure only leaks the tab until the browser exits.
pub(crate) async fn close_page(page: Page) {
    if let Err(e) = page.close().await {
        warn!(error = %e, "failed to close page");
    }
}
