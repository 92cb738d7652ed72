//! End-to-end `collect` pipeline: sources → categorize → fetch → tally.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use watchshots_fetcher::{FetchOutcome, Fetcher};
use watchshots_shared::{Category, CollectConfig, CollectSummary, Result, RunId, WatchshotsError};
use watchshots_sources::{CandidateSource, UrlListSource};

use crate::categorizer::Categorizer;

/// What happened to a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    Downloaded,
    Skipped,
    /// Carries the error's reason code.
    Failed(&'static str),
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase (e.g. enumerating a source).
    fn phase(&self, name: &str);
    /// Called after each candidate has been processed.
    fn candidate_done(&self, url: &str, status: CandidateStatus, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &CollectSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn candidate_done(&self, _url: &str, _status: CandidateStatus, _current: usize, _total: usize) {
    }
    fn done(&self, _summary: &CollectSummary) {}
}

/// Create the dataset root and one directory per category label.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    for category in Category::ALL {
        let dir = output_dir.join(category.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| WatchshotsError::io(&dir, e))?;
    }
    Ok(())
}

/// Run a collection over `sources`, in order.
///
/// A source whose enumeration fails fatally aborts the run; every
/// per-candidate failure is logged and counted instead.
#[instrument(skip_all, fields(run_id = tracing::field::Empty, output_dir = %config.output_dir.display()))]
pub async fn collect(
    config: &CollectConfig,
    sources: &[Box<dyn CandidateSource>],
    progress: &dyn ProgressReporter,
) -> Result<CollectSummary> {
    config.validate()?;

    let start = Instant::now();
    let mut summary = CollectSummary {
        run_id: RunId::new(),
        ..CollectSummary::default()
    };
    tracing::Span::current().record("run_id", tracing::field::display(&summary.run_id));

    info!(run_id = %summary.run_id, sources = sources.len(), "starting collection");

    prepare_output_dir(&config.output_dir)?;

    let fetcher = Fetcher::new(config)?;
    let categorizer = Categorizer::new(config.category_rules.clone());

    for source in sources {
        progress.phase(&format!("Collecting from {}", source.name()));

        let candidates = source.candidates().await?;
        summary.malformed += source.malformed_count();

        let total = candidates.len();
        info!(source = source.name(), candidates = total, "source enumerated");

        for (i, candidate) in candidates.iter().enumerate() {
            let category = categorizer.resolve(candidate);

            let (status, attempted) = match fetcher.fetch(candidate, category).await {
                Ok(outcome @ FetchOutcome::Saved { .. }) => {
                    summary.downloaded += 1;
                    (CandidateStatus::Downloaded, outcome.attempted())
                }
                Ok(outcome @ FetchOutcome::AlreadyExists { .. }) => {
                    summary.skipped += 1;
                    (CandidateStatus::Skipped, outcome.attempted())
                }
                Err(e) => {
                    warn!(url = %candidate.url, reason = e.reason_code(), error = %e, "download failed");
                    summary.failed += 1;
                    (CandidateStatus::Failed(e.reason_code()), true)
                }
            };

            progress.candidate_done(&candidate.url, status, i + 1, total);

            // A request went out whenever the file was not already on disk.
            if attempted && !config.download_delay.is_zero() {
                tokio::time::sleep(config.download_delay).await;
            }
        }
    }

    summary.elapsed = start.elapsed();

    info!(
        downloaded = summary.downloaded,
        failed = summary.failed,
        skipped = summary.skipped,
        malformed = summary.malformed,
        elapsed_ms = summary.elapsed.as_millis(),
        "collection finished"
    );

    progress.done(&summary);
    Ok(summary)
}

/// Collect every candidate listed in a `category,theme,lang,url` file.
pub async fn collect_from_urls_file(
    config: &CollectConfig,
    path: impl Into<PathBuf>,
    progress: &dyn ProgressReporter,
) -> Result<CollectSummary> {
    let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(UrlListSource::new(path))];
    collect(config, &sources, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;
    use watchshots_shared::{AppConfig, Candidate, LinkEntry};
    use watchshots_sources::LinkListSource;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn test_config(name: &str) -> CollectConfig {
        let mut config = CollectConfig::from(&AppConfig::default());
        config.output_dir = std::env::temp_dir().join(format!("ws-{name}-{}", Uuid::now_v7()));
        config.download_delay = Duration::ZERO;
        config.source_delay = Duration::ZERO;
        config.timeout = Duration::from_secs(5);
        config
    }

    async fn image_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/img/.*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png(800, 1000)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/tiny/.*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png(100, 100)),
            )
            .mount(&server)
            .await;
        server
    }

    struct FixedSource(Vec<Candidate>);

    #[async_trait]
    impl CandidateSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn candidates(&self) -> Result<Vec<Candidate>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl CandidateSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn candidates(&self) -> Result<Vec<Candidate>> {
            Err(WatchshotsError::Browser("renderer unreachable".into()))
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<CandidateStatus>>);

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn candidate_done(&self, _url: &str, status: CandidateStatus, _c: usize, _t: usize) {
            self.0.lock().unwrap().push(status);
        }
        fn done(&self, _summary: &CollectSummary) {}
    }

    fn titled(url: String, title: &str, index: usize) -> Candidate {
        Candidate {
            url,
            title: Some(title.into()),
            source: "test".into(),
            index,
            ..Candidate::default()
        }
    }

    #[tokio::test]
    async fn second_run_skips_everything_first_run_downloaded() {
        let server = image_server().await;
        let config = test_config("idem");

        let candidates = vec![
            titled(format!("{}/img/a.png", server.uri()), "Strava weekly recap", 1),
            titled(format!("{}/img/b.png", server.uri()), "my garmin face", 2),
            titled(format!("{}/tiny/c.png", server.uri()), "nrc", 3),
        ];
        let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(FixedSource(candidates))];

        let first = collect(&config, &sources, &SilentProgress).await.unwrap();
        assert_eq!(first.downloaded, 2);
        assert_eq!(first.failed, 1);
        assert_eq!(first.skipped, 0);

        let second = collect(&config, &sources, &SilentProgress).await.unwrap();
        assert_eq!(second.skipped, first.downloaded);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.failed, 1);
        assert_ne!(first.run_id, second.run_id);

        assert!(config.output_dir.join("strava/any/any").is_dir());
        assert!(config.output_dir.join("garmin/any/any").is_dir());

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn reordered_links_are_not_downloaded_twice() {
        let server = image_server().await;
        let config = test_config("reorder");
        let link = |name: &str| LinkEntry {
            url: format!("{}/img/{name}.png", server.uri()),
            title: Some("Strava run".into()),
            source: "links".into(),
        };

        let first: Vec<Box<dyn CandidateSource>> =
            vec![Box::new(LinkListSource::new(vec![link("a")]))];
        let summary = collect(&config, &first, &SilentProgress).await.unwrap();
        assert_eq!(summary.downloaded, 1);

        let second: Vec<Box<dyn CandidateSource>> =
            vec![Box::new(LinkListSource::new(vec![link("b"), link("a")]))];
        let summary = collect(&config, &second, &SilentProgress).await.unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.skipped, 1);

        assert_eq!(files_in(&config.output_dir.join("strava/any/any")), 2);

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[tokio::test]
    async fn skipped_candidates_do_not_wait() {
        let server = image_server().await;
        let mut config = test_config("nowait");
        let candidates: Vec<Candidate> = (0..3)
            .map(|i| titled(format!("{}/img/{i}.png", server.uri()), "strava", i))
            .collect();
        let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(FixedSource(candidates))];

        collect(&config, &sources, &SilentProgress).await.unwrap();

        config.download_delay = Duration::from_secs(2);
        let summary = collect(&config, &sources, &SilentProgress).await.unwrap();
        assert_eq!(summary.skipped, 3);
        assert!(summary.elapsed < Duration::from_secs(2));

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[tokio::test]
    async fn urls_file_counts_malformed_and_downloads_valid_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/img/.*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png(700, 700)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = test_config("urlfile");
        std::fs::create_dir_all(&config.output_dir).unwrap();
        let list = config.output_dir.join("urls.txt");
        std::fs::write(
            &list,
            format!(
                "galaxy_watch,light,ko,{0}/img/1.png\n\
                 garmin,dark\n\
                 strava,dark,en,{0}/img/2.png\n",
                server.uri()
            ),
        )
        .unwrap();

        let progress = RecordingProgress::default();
        let summary = collect_from_urls_file(&config, &list, &progress).await.unwrap();

        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.attempted(), 2);
        assert_eq!(
            *progress.0.lock().unwrap(),
            vec![CandidateStatus::Downloaded, CandidateStatus::Downloaded]
        );
        assert!(config.output_dir.join("galaxy_watch/light/ko").is_dir());
        assert!(config.output_dir.join("strava/dark/en").is_dir());

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[tokio::test]
    async fn missing_urls_file_is_fatal() {
        let config = test_config("nofile");
        let err = collect_from_urls_file(&config, config.output_dir.join("nope.txt"), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.reason_code(), "io");

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[tokio::test]
    async fn fatal_source_error_aborts_run() {
        let config = test_config("broken");
        let sources: Vec<Box<dyn CandidateSource>> = vec![Box::new(BrokenSource)];
        let err = collect(&config, &sources, &SilentProgress).await.unwrap_err();
        assert_eq!(err.reason_code(), "browser");

        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_any_work() {
        let mut config = test_config("invalid");
        config.min_side = config.max_side + 1;
        let sources: Vec<Box<dyn CandidateSource>> = vec![];
        let err = collect(&config, &sources, &SilentProgress).await.unwrap_err();
        assert_eq!(err.reason_code(), "config");
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn prepare_creates_every_category_dir() {
        let dir = std::env::temp_dir().join(format!("ws-prep-{}", Uuid::now_v7()));
        prepare_output_dir(&dir).unwrap();
        for category in Category::ALL {
            assert!(dir.join(category.as_str()).is_dir());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
