//! Candidate enumeration from the places screenshots are collected.
//!
//! Every origin implements [`CandidateSource`] and yields a finite list of
//! [`Candidate`]s. None of them retries a failed listing fetch, and a fresh
//! call always re-reads from the start.
//!
//! - [`RedditSource`]: subreddit `top` listings via the JSON API
//! - [`UrlListSource`]: `category,theme,lang,url` flat files
//! - [`TableSource`] / [`LinkListSource`]: tables and lists from config
//! - [`BlogSearchSource`]: blog search pages rendered by a headless browser

mod blog;
mod reddit;
mod table;
mod url_list;

use async_trait::async_trait;
use watchshots_shared::{Candidate, Result};

pub use blog::{BlogSearchSource, BrowserlessRenderer, PageRenderer, extract_image_urls};
pub use reddit::RedditSource;
pub use table::{LinkListSource, TableSource};
pub use url_list::{MalformedLine, UrlList, UrlListSource, parse_url_list, read_url_list};

/// A single origin of candidates.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Human-readable source name for tracing.
    fn name(&self) -> &str;

    /// Enumerate every candidate this source currently offers.
    ///
    /// Only failures that make the whole source unusable (unreadable file,
    /// unreachable renderer) are returned as errors; per-listing failures are
    /// logged and skipped.
    async fn candidates(&self) -> Result<Vec<Candidate>>;

    /// Lines rejected while enumerating (only meaningful for file sources).
    fn malformed_count(&self) -> usize {
        0
    }
}
