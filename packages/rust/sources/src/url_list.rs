//! Flat-file URL list parser.
//!
//! Format, one record per line:
//! - `category,theme,lang,url`
//! - Blank lines and lines starting with `#` are ignored.
//! - The URL is the fourth field and keeps any further commas.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;
use watchshots_shared::{Candidate, Category, Result, WatchshotsError};

use crate::CandidateSource;

/// Source label attached to candidates read from a URL list.
const SOURCE_LABEL: &str = "url_list";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed contents of a URL list file.
#[derive(Debug, Clone, Default)]
pub struct UrlList {
    /// Well-formed records, in file order.
    pub candidates: Vec<Candidate>,
    /// Lines that were rejected.
    pub malformed: Vec<MalformedLine>,
}

/// A rejected line with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// 1-based line number.
    pub line: usize,
    /// The trimmed line content.
    pub content: String,
    /// Why the line was rejected.
    pub reason: String,
}

impl From<MalformedLine> for WatchshotsError {
    fn from(m: MalformedLine) -> Self {
        WatchshotsError::MalformedRecord {
            line: m.line,
            content: m.content,
            reason: m.reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse URL list text. Malformed lines are logged and collected, never fatal.
pub fn parse_url_list(content: &str) -> UrlList {
    let mut list = UrlList::default();

    for (idx, raw) in content.lines().enumerate() {
        let line_num = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line, line_num) {
            Ok(candidate) => list.candidates.push(candidate),
            Err(reason) => {
                warn!(line = line_num, content = line, %reason, "malformed URL list line");
                list.malformed.push(MalformedLine {
                    line: line_num,
                    content: line.to_string(),
                    reason,
                });
            }
        }
    }

    list
}

fn parse_line(line: &str, line_num: usize) -> std::result::Result<Candidate, String> {
    let parts: Vec<&str> = line.splitn(4, ',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected 4 fields, found {}", parts.len()));
    }

    let [category, theme, lang, url] = [parts[0], parts[1], parts[2], parts[3]];
    if [category, theme, lang, url].iter().any(|f| f.is_empty()) {
        return Err("empty field".into());
    }

    let category: Category = category.parse()?;
    Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;

    Ok(Candidate {
        url: url.to_string(),
        source: SOURCE_LABEL.to_string(),
        category: Some(category),
        theme: Some(theme.to_string()),
        language: Some(lang.to_string()),
        index: line_num,
        ..Candidate::default()
    })
}

/// Read and parse a URL list file. Failing to read the file at all is fatal.
pub fn read_url_list(path: &Path) -> Result<UrlList> {
    let content = std::fs::read_to_string(path).map_err(|e| WatchshotsError::io(path, e))?;
    Ok(parse_url_list(&content))
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Candidates from a `category,theme,lang,url` file.
pub struct UrlListSource {
    path: PathBuf,
    malformed: AtomicUsize,
}

impl UrlListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            malformed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CandidateSource for UrlListSource {
    fn name(&self) -> &str {
        SOURCE_LABEL
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn candidates(&self) -> Result<Vec<Candidate>> {
        let list = read_url_list(&self.path)?;
        self.malformed.store(list.malformed.len(), Ordering::Relaxed);
        info!(
            records = list.candidates.len(),
            malformed = list.malformed.len(),
            "URL list read"
        );
        Ok(list.candidates)
    }

    fn malformed_count(&self) -> usize {
        self.malformed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record() {
        let list = parse_url_list("galaxy_watch,light,ko,https://x/y.jpg\n");
        assert_eq!(list.candidates.len(), 1);
        assert!(list.malformed.is_empty());

        let c = &list.candidates[0];
        assert_eq!(c.category, Some(Category::GalaxyWatch));
        assert_eq!(c.theme.as_deref(), Some("light"));
        assert_eq!(c.language.as_deref(), Some("ko"));
        assert_eq!(c.url, "https://x/y.jpg");
        assert_eq!(c.index, 1);
        assert_eq!(c.source, "url_list");
    }

    #[test]
    fn three_fields_is_skipped_not_raised() {
        let list = parse_url_list("galaxy_watch,light,https://x/y.jpg");
        assert!(list.candidates.is_empty());
        assert_eq!(list.malformed.len(), 1);
        assert_eq!(list.malformed[0].line, 1);
        assert!(list.malformed[0].reason.contains("expected 4 fields"));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let content = "\
# format: category,theme,lang,url
# galaxy_watch,light,ko,https://example.com/image1.jpg

  apple_watch , dark , en , https://example.com/image2.jpg
";
        let list = parse_url_list(content);
        assert!(list.malformed.is_empty());
        assert_eq!(list.candidates.len(), 1);
        assert_eq!(list.candidates[0].category, Some(Category::AppleWatch));
        assert_eq!(list.candidates[0].theme.as_deref(), Some("dark"));
        assert_eq!(list.candidates[0].url, "https://example.com/image2.jpg");
        assert_eq!(list.candidates[0].index, 4);
    }

    #[test]
    fn url_keeps_extra_commas() {
        let list = parse_url_list("garmin,dark,en,https://cdn.example.com/a,b.jpg");
        assert_eq!(list.candidates.len(), 1);
        assert_eq!(list.candidates[0].url, "https://cdn.example.com/a,b.jpg");
    }

    #[test]
    fn rejects_unknown_category_and_bad_url() {
        let content = "fitbit,light,en,https://x/y.jpg\ngarmin,light,en,not a url\ngarmin,,en,https://x/z.jpg";
        let list = parse_url_list(content);
        assert!(list.candidates.is_empty());
        assert_eq!(list.malformed.len(), 3);
        assert!(list.malformed[0].reason.contains("unknown category"));
        assert!(list.malformed[1].reason.contains("invalid URL"));
        assert_eq!(list.malformed[2].reason, "empty field");
    }

    #[test]
    fn malformed_line_converts_to_error() {
        let list = parse_url_list("a,b");
        let err: WatchshotsError = list.malformed[0].clone().into();
        assert_eq!(err.reason_code(), "malformed_record");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let path = std::env::temp_dir().join("watchshots-no-such-list.txt");
        let err = read_url_list(&path).unwrap_err();
        assert_eq!(err.reason_code(), "io");
    }

    #[tokio::test]
    async fn source_reports_malformed_count() {
        let dir = std::env::temp_dir().join(format!("ws-urllist-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("urls.txt");
        std::fs::write(
            &path,
            "strava,light,en,https://x/1.jpg\nnrc,dark,ko,https://x/2.jpg\nbroken,line\n",
        )
        .unwrap();

        let source = UrlListSource::new(&path);
        let candidates = source.candidates().await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(source.malformed_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
