//! Application configuration for watchshots.
//!
//! User config lives at `~/.watchshots/watchshots.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchshotsError};
use crate::types::Category;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "watchshots.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".watchshots";

/// Desktop browser User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching watchshots.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Courtesy delays between outbound requests.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Image normalization policy.
    #[serde(default)]
    pub images: ImageConfig,

    /// Reddit listing source.
    #[serde(default)]
    pub reddit: RedditConfig,

    /// Rendered blog search source.
    #[serde(default)]
    pub blog: BlogConfig,

    /// Ordered categorizer rules (first match wins).
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,

    /// Hardcoded `category → theme → language → [url]` table.
    #[serde(default)]
    pub table: UrlTable,

    /// Quick list of individual image links.
    #[serde(default = "default_links")]
    pub links: Vec<LinkEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            http: HttpConfig::default(),
            pacing: PacingConfig::default(),
            images: ImageConfig::default(),
            reddit: RedditConfig::default(),
            blog: BlogConfig::default(),
            categories: default_category_rules(),
            table: UrlTable::new(),
            links: default_links(),
        }
    }
}

/// Nested `category → theme → language → [url]` table.
pub type UrlTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Dataset output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Log file name, relative to the output directory unless absolute.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_file: default_log_file(),
        }
    }
}

fn default_output_dir() -> String {
    "smartwatch_screenshots".into()
}
fn default_log_file() -> String {
    "collection_log.txt".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest image body accepted, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_bytes() -> u64 {
    20 * 1024 * 1024
}

/// `[pacing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause after each download attempt.
    #[serde(default = "default_download_delay")]
    pub download_delay_ms: u64,

    /// Pause between sub-source listing requests.
    #[serde(default = "default_source_delay")]
    pub source_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            download_delay_ms: default_download_delay(),
            source_delay_ms: default_source_delay(),
        }
    }
}

fn default_download_delay() -> u64 {
    1000
}
fn default_source_delay() -> u64 {
    2000
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Longer side is downscaled to this when exceeded.
    #[serde(default = "default_max_side")]
    pub max_side: u32,

    /// Images with both sides below this are rejected.
    #[serde(default = "default_min_side")]
    pub min_side: u32,

    /// JPEG encoder quality (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_side: default_max_side(),
            min_side: default_min_side(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_max_side() -> u32 {
    1280
}
fn default_min_side() -> u32 {
    640
}
fn default_jpeg_quality() -> u8 {
    95
}

/// `[reddit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    /// API origin.
    #[serde(default = "default_reddit_base")]
    pub base_url: String,

    /// Sub-sources, written as `r/<name>`.
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<String>,

    /// Title keywords (any match, case-insensitive).
    #[serde(default = "default_reddit_keywords")]
    pub keywords: Vec<String>,

    /// Listing window for `top` (`day`, `week`, `month`, ...).
    #[serde(default = "default_reddit_period")]
    pub period: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_reddit_base(),
            subreddits: default_subreddits(),
            keywords: default_reddit_keywords(),
            period: default_reddit_period(),
        }
    }
}

fn default_reddit_base() -> String {
    "https://www.reddit.com".into()
}
fn default_subreddits() -> Vec<String> {
    ["r/running", "r/Strava", "r/GarminWatches", "r/AppleWatchFitness"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_reddit_keywords() -> Vec<String> {
    ["strava", "running", "run", "러닝"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_reddit_period() -> String {
    "month".into()
}

/// `[blog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Base URL of the headless-browser rendering service. Unset disables the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer_url: Option<String>,

    /// Name of the env var holding the renderer token (never store the token itself).
    #[serde(default = "default_renderer_token_env")]
    pub renderer_token_env: String,

    /// Search page template; `{query}` is replaced by the encoded keyword.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Search keywords.
    #[serde(default = "default_blog_keywords")]
    pub keywords: Vec<String>,

    /// CSS selector for image elements on the rendered page.
    #[serde(default = "default_image_selector")]
    pub image_selector: String,

    /// Maximum images taken per keyword.
    #[serde(default = "default_max_per_keyword")]
    pub max_per_keyword: usize,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            renderer_url: None,
            renderer_token_env: default_renderer_token_env(),
            search_url: default_search_url(),
            keywords: default_blog_keywords(),
            image_selector: default_image_selector(),
            max_per_keyword: default_max_per_keyword(),
        }
    }
}

fn default_renderer_token_env() -> String {
    "BROWSERLESS_TOKEN".into()
}
fn default_search_url() -> String {
    "https://search.naver.com/search.naver?where=blog&query={query}".into()
}
fn default_blog_keywords() -> Vec<String> {
    ["스트라바 후기", "NRC 러닝 기록", "가민 운동 기록", "애플워치 러닝"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_image_selector() -> String {
    "img[src*='postfiles']".into()
}
fn default_max_per_keyword() -> usize {
    5
}

/// `[[categories]]` entry: one ordered categorizer rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Label assigned when any keyword matches.
    pub label: Category,
    /// Lowercase substrings searched for in the candidate context.
    pub keywords: Vec<String>,
}

impl CategoryRule {
    fn new(label: Category, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in rules. Order matters: earlier rules shadow later ones.
pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(Category::Strava, &["strava", "스트라바"]),
        CategoryRule::new(Category::Nrc, &["nike", "nrc", "나이키"]),
        CategoryRule::new(Category::SamsungHealth, &["samsung", "삼성", "health"]),
        CategoryRule::new(Category::Garmin, &["garmin", "가민"]),
        CategoryRule::new(Category::AppleWatch, &["apple", "애플"]),
        CategoryRule::new(Category::GalaxyWatch, &["galaxy", "갤럭시"]),
    ]
}

/// `[[links]]` entry: a single known image link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Image URL.
    pub url: String,
    /// Descriptive title used for categorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Origin label.
    pub source: String,
}

fn default_links() -> Vec<LinkEntry> {
    vec![LinkEntry {
        url: "https://images.unsplash.com/photo-1461897104016-0b3b00cc81ee".into(),
        title: Some("running app screenshot".into()),
        source: "unsplash".into(),
    }]
}

// ---------------------------------------------------------------------------
// Collect config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime collection configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Dataset root directory.
    pub output_dir: PathBuf,
    /// User-Agent header.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Largest image body accepted, in bytes.
    pub max_bytes: u64,
    /// Pause after each download attempt.
    pub download_delay: Duration,
    /// Pause between sub-source listing requests.
    pub source_delay: Duration,
    /// Longer-side cap in pixels.
    pub max_side: u32,
    /// Minimum side in pixels (both sides below → rejected).
    pub min_side: u32,
    /// JPEG quality.
    pub jpeg_quality: u8,
    /// Ordered categorizer rules.
    pub category_rules: Vec<CategoryRule>,
}

impl From<&AppConfig> for CollectConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            user_agent: config.http.user_agent.clone(),
            timeout: Duration::from_secs(config.http.timeout_secs),
            max_bytes: config.http.max_bytes,
            download_delay: Duration::from_millis(config.pacing.download_delay_ms),
            source_delay: Duration::from_millis(config.pacing.source_delay_ms),
            max_side: config.images.max_side,
            min_side: config.images.min_side,
            jpeg_quality: config.images.jpeg_quality,
            category_rules: config.categories.clone(),
        }
    }
}

impl CollectConfig {
    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_side == 0 {
            return Err(WatchshotsError::config("images.max_side must be positive"));
        }
        if self.min_side > self.max_side {
            return Err(WatchshotsError::config(format!(
                "images.min_side ({}) exceeds images.max_side ({})",
                self.min_side, self.max_side
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WatchshotsError::config(format!(
                "images.jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.watchshots/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WatchshotsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.watchshots/watchshots.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| WatchshotsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WatchshotsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WatchshotsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WatchshotsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WatchshotsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the blog renderer token from the configured env var, if set and non-empty.
pub fn renderer_token(config: &AppConfig) -> Option<String> {
    std::env::var(&config.blog.renderer_token_env)
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("r/GarminWatches"));
        assert!(toml_str.contains("BROWSERLESS_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.http.timeout_secs, 10);
        assert_eq!(parsed.images.max_side, 1280);
        assert_eq!(parsed.categories, default_category_rules());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let parsed: AppConfig = toml::from_str("").expect("parse empty");
        assert_eq!(parsed.defaults.output_dir, "smartwatch_screenshots");
        assert_eq!(parsed.categories.len(), 6);
        assert_eq!(parsed.links.len(), 1);
        assert!(parsed.table.is_empty());
    }

    #[test]
    fn config_with_table_and_rules() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/shots"

[[categories]]
label = "garmin"
keywords = ["fenix", "forerunner"]

[table.galaxy_watch.light]
ko = ["https://example.com/a.jpg", "https://example.com/b.jpg"]
en = []

[table.apple_watch.dark]
en = ["https://example.com/c.jpg"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].label, Category::Garmin);
        assert_eq!(config.table["galaxy_watch"]["light"]["ko"].len(), 2);
        assert_eq!(config.table["apple_watch"]["dark"]["en"].len(), 1);
    }

    #[test]
    fn collect_config_from_app_config() {
        let app = AppConfig::default();
        let collect = CollectConfig::from(&app);
        assert_eq!(collect.timeout, Duration::from_secs(10));
        assert_eq!(collect.download_delay, Duration::from_millis(1000));
        assert_eq!(collect.source_delay, Duration::from_millis(2000));
        assert_eq!(collect.jpeg_quality, 95);
        assert!(collect.validate().is_ok());
    }

    #[test]
    fn collect_config_rejects_inverted_sides() {
        let mut collect = CollectConfig::from(&AppConfig::default());
        collect.min_side = 2000;
        let err = collect.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
