//! Sources backed by static tables from the config file.

use async_trait::async_trait;
use tracing::warn;
use watchshots_shared::{Candidate, Category, LinkEntry, Result, UrlTable};

use crate::CandidateSource;

/// Candidates from the `category → theme → language → [url]` table.
///
/// Each URL's `index` is its position within its own list, so adding URLs to
/// the end of a list never renames existing files.
pub struct TableSource {
    table: UrlTable,
}

impl TableSource {
    pub fn new(table: UrlTable) -> Self {
        Self { table }
    }

    fn enumerate(&self) -> Vec<Candidate> {
        let mut out = Vec::new();

        for (category_key, themes) in &self.table {
            let category: Category = match category_key.parse() {
                Ok(c) => c,
                Err(reason) => {
                    warn!(category = %category_key, %reason, "skipping table category");
                    continue;
                }
            };

            for (theme, languages) in themes {
                for (language, urls) in languages {
                    for (index, url) in urls.iter().enumerate() {
                        if url.trim().is_empty() {
                            warn!(category = %category_key, %theme, %language, index, "skipping empty table URL");
                            continue;
                        }
                        out.push(Candidate {
                            url: url.trim().to_string(),
                            source: "table".into(),
                            category: Some(category),
                            theme: Some(theme.clone()),
                            language: Some(language.clone()),
                            index,
                            ..Candidate::default()
                        });
                    }
                }
            }
        }

        out
    }
}

#[async_trait]
impl CandidateSource for TableSource {
    fn name(&self) -> &str {
        "table"
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.enumerate())
    }
}

/// Candidates from the `[[links]]` quick list, in order.
///
/// Links are named by URL hash alone (index 0), so reordering the list never
/// duplicates a stored file.
pub struct LinkListSource {
    links: Vec<LinkEntry>,
}

impl LinkListSource {
    pub fn new(links: Vec<LinkEntry>) -> Self {
        Self { links }
    }
}

#[async_trait]
impl CandidateSource for LinkListSource {
    fn name(&self) -> &str {
        "links"
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .links
            .iter()
            .filter(|link| {
                let empty = link.url.trim().is_empty();
                if empty {
                    warn!(source = %link.source, "skipping link with empty URL");
                }
                !empty
            })
            .map(|link| Candidate {
                url: link.url.trim().to_string(),
                title: link.title.clone(),
                source: link.source.clone(),
                ..Candidate::default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn table() -> UrlTable {
        let mut langs = BTreeMap::new();
        langs.insert(
            "ko".to_string(),
            vec!["https://x/1.jpg".to_string(), "https://x/2.jpg".to_string()],
        );
        langs.insert("en".to_string(), vec![]);
        let mut themes = BTreeMap::new();
        themes.insert("light".to_string(), langs);

        let mut table = UrlTable::new();
        table.insert("galaxy_watch".to_string(), themes.clone());
        table.insert("pebble".to_string(), themes);
        table
    }

    #[tokio::test]
    async fn table_emits_one_candidate_per_url() {
        let found = TableSource::new(table()).candidates().await.unwrap();
        // "pebble" is not a known category and is skipped.
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.category == Some(Category::GalaxyWatch)));
        assert_eq!(found[0].theme.as_deref(), Some("light"));
        assert_eq!(found[0].language.as_deref(), Some("ko"));
        assert_eq!(found[0].index, 0);
        assert_eq!(found[1].index, 1);
    }

    #[tokio::test]
    async fn empty_table_yields_nothing() {
        let found = TableSource::new(UrlTable::new()).candidates().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn links_keep_metadata() {
        let links = vec![LinkEntry {
            url: "https://images.example.com/run.jpg".into(),
            title: Some("running app screenshot".into()),
            source: "unsplash".into(),
        }];
        let found = LinkListSource::new(links).candidates().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "unsplash");
        assert_eq!(found[0].title.as_deref(), Some("running app screenshot"));
        assert!(found[0].category.is_none());
    }

    #[tokio::test]
    async fn empty_table_urls_are_skipped() {
        let mut table = table();
        if let Some(urls) = table
            .get_mut("galaxy_watch")
            .and_then(|t| t.get_mut("light"))
            .and_then(|l| l.get_mut("ko"))
        {
            urls.insert(0, "  ".to_string());
        }
        let found = TableSource::new(table).candidates().await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| !c.url.is_empty()));
        // Positions still count the skipped entry.
        assert_eq!(found[0].index, 1);
    }

    #[tokio::test]
    async fn empty_links_are_skipped_and_unindexed() {
        let links = vec![
            LinkEntry {
                url: String::new(),
                title: None,
                source: "unsplash".into(),
            },
            LinkEntry {
                url: "https://images.example.com/a.jpg".into(),
                title: None,
                source: "unsplash".into(),
            },
            LinkEntry {
                url: "https://images.example.com/b.jpg".into(),
                title: None,
                source: "unsplash".into(),
            },
        ];
        let found = LinkListSource::new(links).candidates().await.unwrap();
        let urls: Vec<&str> = found.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://images.example.com/a.jpg", "https://images.example.com/b.jpg"]
        );
        assert!(found.iter().all(|c| c.index == 0));
    }
}
