//! On-disk persistence for harvested notes.
//!
//! Everything lives under `<work_dir>/notes/`:
//!
//! ```text
//! notes/
//! ├── database.json        listing cache ({ "urls": [...] })
//! ├── raw/<id>.html        + <id>.json
//! ├── readable/<id>.html   + <id>.json
//! ├── markdown/<id>.md     + <id>.json
//! └── rendered/<id>.html   + <id>.json
//! ```
//!
//! The `.json` record is the source of truth for "already computed"; the
//! other file is only there to be looked at.

mod cache;
mod fs;
mod layout;
mod listing;

pub use cache::CacheStore;
pub use layout::{NotesLayout, PrepareOutcome};
pub use listing::ListingCache;
