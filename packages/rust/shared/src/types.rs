//! Core domain types for watchshots collection runs.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one collection run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Closed set of app/device labels a screenshot can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GalaxyWatch,
    AppleWatch,
    Garmin,
    Strava,
    Nrc,
    SamsungHealth,
    Unknown,
}

impl Category {
    /// All labels, in directory-bootstrap order.
    pub const ALL: [Category; 7] = [
        Category::GalaxyWatch,
        Category::AppleWatch,
        Category::Garmin,
        Category::Strava,
        Category::Nrc,
        Category::SamsungHealth,
        Category::Unknown,
    ];

    /// The snake_case label used in paths and filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::GalaxyWatch => "galaxy_watch",
            Category::AppleWatch => "apple_watch",
            Category::Garmin => "garmin",
            Category::Strava => "strava",
            Category::Nrc => "nrc",
            Category::SamsungHealth => "samsung_health",
            Category::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == label)
            .ok_or_else(|| format!("unknown category label '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A prospective image reference with source metadata, not yet fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Image URL.
    pub url: String,
    /// Post title, when the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Search keyword that surfaced this candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Origin label (e.g. `r/Strava`, `naver_blog`, `url_list`).
    pub source: String,
    /// Explicit category, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// UI theme (e.g. `light`, `dark`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// UI language (e.g. `ko`, `en`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Sequence index used in the stored filename.
    #[serde(default)]
    pub index: usize,
}

impl Candidate {
    /// Create a bare candidate for `url` from `source`.
    pub fn new(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// CollectSummary
// ---------------------------------------------------------------------------

/// Aggregate counts for one collection run. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct CollectSummary {
    /// Run identifier (appears in log spans).
    pub run_id: RunId,
    /// Images fetched, normalized and written.
    pub downloaded: usize,
    /// Candidates that failed (network, content type, decode, size, I/O).
    pub failed: usize,
    /// Candidates whose target path already existed.
    pub skipped: usize,
    /// URL list lines that did not parse.
    pub malformed: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl CollectSummary {
    /// Number of candidates that went through a download attempt.
    pub fn attempted(&self) -> usize {
        self.downloaded + self.failed
    }
}

// ---------------------------------------------------------------------------
// DatasetInfo
// ---------------------------------------------------------------------------

/// The `dataset_info.json` structure written at the dataset root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Total image files across all directories.
    pub total_images: usize,
    /// Image count per directory, keyed by path relative to the dataset root.
    pub categories: BTreeMap<String, usize>,
    /// When the report was generated.
    pub created_at: DateTime<Local>,
}
