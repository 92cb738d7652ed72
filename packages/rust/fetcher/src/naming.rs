//! Deterministic storage paths for collected images.
//!
//! Layout: `<root>/<category>/<theme>/<lang>/<category>_<theme>_<lang>_<NNN>_<hash8>.jpg`.
//! Uniqueness rests on the 8-hex-char URL hash; two URLs sharing a prefix
//! map to the same path and the second one is treated as already present.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use watchshots_shared::{Candidate, Category};

/// Number of hex characters of the URL hash kept in filenames.
pub const HASH_LEN: usize = 8;

/// Placeholder for a missing theme or language component.
pub const ANY_COMPONENT: &str = "any";

/// First [`HASH_LEN`] hex characters of SHA-256(url).
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(HASH_LEN);
    hex
}

/// Make a free-form metadata value safe to use as one path component.
fn sanitize(component: Option<&str>) -> String {
    let cleaned: String = component
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');

    if cleaned.is_empty() {
        ANY_COMPONENT.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Target path for `candidate` filed under `category` inside `root`.
pub fn artifact_path(root: &Path, candidate: &Candidate, category: Category) -> PathBuf {
    let theme = sanitize(candidate.theme.as_deref());
    let lang = sanitize(candidate.language.as_deref());
    let filename = format!(
        "{category}_{theme}_{lang}_{:03}_{}.jpg",
        candidate.index,
        url_hash(&candidate.url)
    );

    root.join(category.as_str()).join(&theme).join(&lang).join(filename)
}
