//! Application configuration for noteharvest.
//!
//! User config lives at `~/.noteharvest/noteharvest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "noteharvest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".noteharvest";

// ---------------------------------------------------------------------------
// Config structs (matching noteharvest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Listing discovery tuning.
    #[serde(default)]
    pub listing: ListingConfig,

    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Selectors and URLs of the source site.
    #[serde(default)]
    pub source: SourceProfile,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Working root; `notes/` is created beneath it.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Source account whose notes are harvested.
    #[serde(default = "default_username")]
    pub username: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            username: default_username(),
        }
    }
}

fn default_work_dir() -> String {
    ".".into()
}
fn default_username() -> String {
    "me".into()
}

/// `[listing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Milliseconds between scroll/poll ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Consecutive unchanged polls before the listing counts as complete.
    #[serde(default = "default_stable_polls")]
    pub stable_polls: u32,

    /// Hard cap on ticks; `None` polls until stable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u32>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            stable_polls: default_stable_polls(),
            max_ticks: None,
        }
    }
}

fn default_poll_interval() -> u64 {
    500
}
fn default_stable_polls() -> u32 {
    10
}

/// `[browser]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chromium without a window. Interactive login needs a window.
    #[serde(default)]
    pub headless: bool,

    /// Explicit Chromium executable; auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}

/// `[source]` section: everything that is specific to the harvested site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Page opened for interactive login.
    #[serde(default = "default_home_url")]
    pub home_url: String,

    /// Listing page; `{user}` is replaced by the configured username.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Selector that only matches once the user is logged in.
    #[serde(default = "default_login_marker")]
    pub login_marker: String,

    /// Element whose `aria-label` holds the logged-in user's name.
    #[serde(default = "default_identity_selector")]
    pub identity_selector: String,

    /// Links on the listing page that point at individual notes.
    #[serde(default = "default_link_selector")]
    pub listing_link_selector: String,

    /// Container of a single note's body.
    #[serde(default = "default_article_selector")]
    pub article_selector: String,

    /// Title element, relative to the article container.
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// Text the source shows when requests are being throttled.
    #[serde(default = "default_rate_limit_phrase")]
    pub rate_limit_phrase: String,

    /// Stylesheet linked from readable and rendered articles.
    #[serde(default = "default_stylesheet")]
    pub stylesheet_url: String,
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            listing_url: default_listing_url(),
            login_marker: default_login_marker(),
            identity_selector: default_identity_selector(),
            listing_link_selector: default_link_selector(),
            article_selector: default_article_selector(),
            title_selector: default_title_selector(),
            rate_limit_phrase: default_rate_limit_phrase(),
            stylesheet_url: default_stylesheet(),
        }
    }
}

impl SourceProfile {
    /// Listing URL for a given account.
    pub fn listing_url_for(&self, username: &str) -> String {
        self.listing_url.replace("{user}", username)
    }
}

fn default_home_url() -> String {
    "https://www.facebook.com".into()
}
fn default_listing_url() -> String {
    "https://www.facebook.com/{user}/notes".into()
}
fn default_login_marker() -> String {
    r#"[href="/me/"][aria-label],form[action^="/logout"]"#.into()
}
fn default_identity_selector() -> String {
    r#"[href="/me/"][aria-label]"#.into()
}
fn default_link_selector() -> String {
    r#"a[role=link][href^="https://www.facebook.com/notes/"]"#.into()
}
fn default_article_selector() -> String {
    r#"[data-pagelet="page"]"#.into()
}
fn default_title_selector() -> String {
    "h2 > span".into()
}
fn default_rate_limit_phrase() -> String {
    "We limit how often you can post".into()
}
fn default_stylesheet() -> String {
    "https://cdnjs.cloudflare.com/ajax/libs/normalize/8.0.1/normalize.min.css".into()
}

// ---------------------------------------------------------------------------
// Harvest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime harvest configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Working root holding `notes/`.
    pub work_dir: PathBuf,
    /// Source account identifier.
    pub username: String,
    /// Disable cache reads and reset the workspace.
    pub force_recompute: bool,
    /// Delay between listing polls.
    pub poll_interval: Duration,
    /// Consecutive stable polls required.
    pub stable_polls: u32,
    /// Optional cap on listing polls.
    pub max_ticks: Option<u32>,
    /// Browser launch settings.
    pub browser: BrowserConfig,
    /// Site profile.
    pub source: SourceProfile,
}

impl From<&AppConfig> for HarvestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            work_dir: PathBuf::from(&config.defaults.work_dir),
            username: config.defaults.username.clone(),
            force_recompute: false,
            poll_interval: Duration::from_millis(config.listing.poll_interval_ms),
            stable_polls: config.listing.stable_polls,
            max_ticks: config.listing.max_ticks,
            browser: config.browser.clone(),
            source: config.source.clone(),
        }
    }
}

impl HarvestConfig {
    /// Listing URL for the configured account.
    pub fn listing_url(&self) -> String {
        self.source.listing_url_for(&self.username)
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(HarvestError::config("username must not be empty"));
        }
        if self.stable_polls == 0 {
            return Err(HarvestError::config("listing.stable_polls must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(HarvestError::config("listing.poll_interval_ms must be positive"));
        }
        url::Url::parse(&self.listing_url()).map_err(|e| {
            HarvestError::config(format!("invalid listing url {}: {e}", self.listing_url()))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.noteharvest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HarvestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.noteharvest/noteharvest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HarvestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HarvestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("work_dir"));
        assert!(toml_str.contains("poll_interval_ms = 500"));
        assert!(toml_str.contains("normalize.min.css"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.listing.stable_polls, 10);
        assert_eq!(parsed.defaults.username, "me");
        assert_eq!(parsed.source.title_selector, "h2 > span");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
username = "someone"

[listing]
stable_polls = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.username, "someone");
        assert_eq!(config.defaults.work_dir, ".");
        assert_eq!(config.listing.stable_polls, 3);
        assert_eq!(config.listing.poll_interval_ms, 500);
        assert!(!config.browser.headless);
    }

    #[test]
    fn harvest_config_from_app_config() {
        let mut app = AppConfig::default();
        app.defaults.username = "alice".into();
        let harvest = HarvestConfig::from(&app);
        assert_eq!(harvest.poll_interval, Duration::from_millis(500));
        assert_eq!(harvest.stable_polls, 10);
        assert!(!harvest.force_recompute);
        assert_eq!(harvest.listing_url(), "https://www.facebook.com/alice/notes");
        harvest.validate().expect("defaults are valid");
    }

    #[test]
    fn validation_rejects_zero_stable_polls() {
        let mut harvest = HarvestConfig::from(&AppConfig::default());
        harvest.stable_polls = 0;
        let err = harvest.validate().unwrap_err();
        assert!(err.to_string().contains("stable_polls"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = std::env::temp_dir().join(format!("nh-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[browser]\nheadless = true\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert!(config.browser.headless);

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(load_config_from(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
