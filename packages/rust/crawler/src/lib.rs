//! Browser-backed collaborators of the harvest pipeline.
//!
//! This crate provides:
//! - [`BrowserSession`] - one lazily launched Chromium shared by all operations;
//!   implements [`SessionProvider`] (login, listing discovery) and
//!   [`SourceFetcher`] (raw note capture)
//! - [`ListingPage`] - the scrolling listing tab as a discovery link source
//! - [`ReadabilityExtractor`] - the [`ContentExtractor`] used by the readable stage
//!
//! Everything the core needs goes through the traits, so it can be driven by
//! fakes in tests.

mod fetcher;
mod listing;
mod readable;
mod script;
mod session;

pub use fetcher::SourceFetcher;
pub use listing::ListingPage;
pub use readable::{ContentExtractor, ReadabilityExtractor};
pub use session::{BrowserSession, SessionProvider};
