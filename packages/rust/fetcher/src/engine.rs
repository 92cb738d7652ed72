//! Fetch-and-persist engine for a single candidate.
//!
//! The fetcher derives the target path, skips candidates whose file already
//! exists, downloads and validates the image, normalizes it, and writes it
//! with exclusive creation so an existing file is never overwritten.

use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::{Client, Response, StatusCode, header};
use tracing::{debug, info, instrument};
use watchshots_shared::{Candidate, Category, CollectConfig, Result, WatchshotsError, build_client};

use crate::naming::artifact_path;
use crate::normalize::{ImagePolicy, NormalizedImage, normalize};

// ---------------------------------------------------------------------------
// FetchOutcome
// ---------------------------------------------------------------------------

/// Non-failure result of processing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The image was downloaded, normalized and written.
    Saved {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    /// The target path was already present; nothing was written.
    ///
    /// `downloaded` is set when the file appeared while this candidate was
    /// being downloaded, so a request was still made.
    AlreadyExists { path: PathBuf, downloaded: bool },
}

impl FetchOutcome {
    /// Path the candidate maps to.
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Saved { path, .. } | FetchOutcome::AlreadyExists { path, .. } => path,
        }
    }

    /// Whether a download attempt was made (and therefore pacing applies).
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Saved { .. } | FetchOutcome::AlreadyExists { downloaded: true, .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Downloads candidates into the dataset tree over a single pooled client.
pub struct Fetcher {
    client: Client,
    output_dir: PathBuf,
    policy: ImagePolicy,
    max_bytes: u64,
}

impl Fetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: &CollectConfig) -> Result<Self> {
        let client = build_client(&config.user_agent, config.timeout)?;

        Ok(Self {
            client,
            output_dir: config.output_dir.clone(),
            policy: ImagePolicy::from(config),
            max_bytes: config.max_bytes,
        })
    }

    /// Dataset root this fetcher writes into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target path for `candidate` under `category`.
    pub fn target_path(&self, candidate: &Candidate, category: Category) -> PathBuf {
        artifact_path(&self.output_dir, candidate, category)
    }

    /// Process one candidate: skip if present, otherwise download, normalize and write.
    ///
    /// Every per-candidate failure comes back as `Err`; nothing here is fatal
    /// to a batch.
    #[instrument(skip_all, fields(url = %candidate.url, %category))]
    pub async fn fetch(&self, candidate: &Candidate, category: Category) -> Result<FetchOutcome> {
        let path = self.target_path(candidate, category);

        if path.exists() {
            info!(path = %path.display(), "already exists");
            return Ok(FetchOutcome::AlreadyExists {
                path,
                downloaded: false,
            });
        }

        let bytes = self.download(&candidate.url).await?;
        let image = normalize(&bytes, &candidate.url, &self.policy)?;

        match write_exclusive(&path, &image)? {
            true => {
                info!(
                    path = %path.display(),
                    width = image.width,
                    height = image.height,
                    "saved"
                );
                Ok(FetchOutcome::Saved {
                    path,
                    width: image.width,
                    height: image.height,
                })
            }
            false => {
                info!(path = %path.display(), "already exists (written concurrently)");
                Ok(FetchOutcome::AlreadyExists {
                    path,
                    downloaded: true,
                })
            }
        }
    }

    /// GET `url` and return the body if it is a 200 image response within size limits.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "downloading");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WatchshotsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WatchshotsError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().contains("image") {
            return Err(WatchshotsError::ContentType {
                url: url.to_string(),
                content_type,
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(WatchshotsError::validation(format!(
                    "{url}: response too large ({len} bytes, max {})",
                    self.max_bytes
                )));
            }
        }

        read_limited(response, url, self.max_bytes).await
    }
}

/// Stream the body, giving up as soon as it grows past `max_bytes`.
async fn read_limited(mut response: Response, url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| WatchshotsError::Network(format!("{url}: failed to read body: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(WatchshotsError::validation(format!(
                "{url}: response too large (over {max_bytes} bytes)"
            )));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Write `image` to `path`, creating parents. Returns `false` if the file appeared meanwhile.
///
/// Uses `create_new` so two writers can never both claim the same path. A
/// partially written file is removed before the error is returned.
fn write_exclusive(path: &Path, image: &NormalizedImage) -> Result<bool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WatchshotsError::io(parent, e))?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(WatchshotsError::io(path, e)),
    };

    if let Err(e) = file.write_all(&image.jpeg).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(WatchshotsError::io(path, e));
    }

    Ok(true)
}
