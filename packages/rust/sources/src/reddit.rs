//! Subreddit `top` listings via Reddit's public JSON API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use watchshots_shared::{Candidate, CollectConfig, RedditConfig, Result, WatchshotsError};

use crate::CandidateSource;

// ---------------------------------------------------------------------------
// Listing schema (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    #[serde(default)]
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
struct Post {
    #[serde(default)]
    post_hint: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Image posts from a fixed list of subreddits, filtered by title keywords.
pub struct RedditSource {
    client: Client,
    config: RedditConfig,
    source_delay: std::time::Duration,
}

impl RedditSource {
    /// Create a Reddit source using the shared HTTP settings in `collect`.
    pub fn new(config: RedditConfig, collect: &CollectConfig) -> Result<Self> {
        let client = watchshots_shared::build_client(&collect.user_agent, collect.timeout)?;
        Ok(Self {
            client,
            config,
            source_delay: collect.source_delay,
        })
    }

    /// Listing endpoint for one sub-source, e.g. `https://www.reddit.com/r/Strava/top.json?t=month`.
    fn listing_url(&self, sub: &str) -> String {
        format!(
            "{}/{}/top.json?t={}",
            self.config.base_url.trim_end_matches('/'),
            sub.trim_matches('/'),
            self.config.period
        )
    }

    /// Fetch one sub-source listing and keep the matching image posts.
    async fn fetch_sub(&self, sub: &str) -> Result<Vec<Candidate>> {
        let url = self.listing_url(sub);
        debug!(%url, "fetching listing");

        let unavailable = |message: String| WatchshotsError::SourceUnavailable {
            source_name: sub.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(unavailable(format!("HTTP {status}")));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid listing JSON: {e}")))?;

        Ok(filter_posts(listing, sub, &self.config.keywords))
    }
}

/// Keep posts with `post_hint == "image"` whose title contains any keyword.
///
/// Candidates keep the default index: listing order changes between runs,
/// so only the URL hash may distinguish stored files.
fn filter_posts(listing: Listing, sub: &str, keywords: &[String]) -> Vec<Candidate> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| post.post_hint.as_deref() == Some("image"))
        .filter(|post| {
            let title = post.title.as_deref().unwrap_or_default().to_lowercase();
            keywords.iter().any(|k| title.contains(k.as_str()))
        })
        .filter_map(|post| {
            let url = post.url.filter(|u| !u.is_empty())?;
            Some(Candidate {
                url,
                title: post.title,
                source: sub.to_string(),
                ..Candidate::default()
            })
        })
        .collect()
}

#[async_trait]
impl CandidateSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    #[instrument(skip_all, fields(subs = self.config.subreddits.len()))]
    async fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut all = Vec::new();

        for (i, sub) in self.config.subreddits.iter().enumerate() {
            if i > 0 && !self.source_delay.is_zero() {
                tokio::time::sleep(self.source_delay).await;
            }

            match self.fetch_sub(sub).await {
                Ok(found) => {
                    info!(sub = %sub, found = found.len(), "listing collected");
                    all.extend(found);
                }
                Err(e) => {
                    warn!(sub = %sub, reason = e.reason_code(), error = %e, "listing failed, continuing");
                }
            }
        }

        Ok(all)
    }
}
