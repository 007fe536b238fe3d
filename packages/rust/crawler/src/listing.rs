//! The live listing page as a [`LinkSource`].

use async_trait::async_trait;
use chromiumoxide::Page;
use url::Url;

use noteharvest_discovery::LinkSource;
use noteharvest_shared::{HarvestError, Result};

use crate::script;
use crate::session::evaluate;

/// An open listing tab. Each poll scrolls it and re-reads the note links.
pub struct ListingPage {
    page: Page,
    collect_js: String,
    base: Url,
}

impl ListingPage {
    pub fn new(page: Page, link_selector: &str, base: Url) -> Self {
        Self {
            page,
            collect_js: script::scroll_and_collect(link_selector),
            base,
        }
    }

    pub fn into_page(self) -> Page {
        self.page
    }
}

#[async_trait]
impl LinkSource for ListingPage {
    async fn poll_links(&mut self) -> Result<Vec<String>> {
        let hrefs: Vec<String> = evaluate(&self.page, &self.collect_js).await?;
        Ok(resolve_hrefs(&self.base, hrefs))
    }
}

/// Parse the listing URL that relative note links are resolved against.
pub(crate) fn listing_base(listing_url: &str) -> Result<Url> {
    Url::parse(listing_url)
        .map_err(|e| HarvestError::config(format!("invalid listing url '{listing_url}': {e}")))
}

/// Make every href absolute against the listing URL, dropping unparseable ones.
pub(crate) fn resolve_hrefs(base: &Url, hrefs: Vec<String>) -> Vec<String> {
    hrefs
        .into_iter()
        .filter_map(|href| base.join(&href).ok())
        .map(String::from)
        .collect()
}
