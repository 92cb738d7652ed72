//! Keyword-rule categorization of candidates.

use watchshots_shared::{Candidate, Category, CategoryRule, default_category_rules};

/// Ordered keyword rules mapping a candidate's text context to a [`Category`].
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_category_rules())
    }
}

impl Categorizer {
    /// Build a categorizer from rules. Keywords are lowercased once here.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                label: rule.label,
                keywords: rule
                    .keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Label for `candidate`: first rule with a keyword contained in its context, else `Unknown`.
    pub fn categorize(&self, candidate: &Candidate) -> Category {
        let context = context_of(candidate);

        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| context.contains(k.as_str())))
            .map(|rule| rule.label)
            .unwrap_or(Category::Unknown)
    }

    /// The candidate's explicit category if it has one, otherwise [`Self::categorize`].
    pub fn resolve(&self, candidate: &Candidate) -> Category {
        candidate
            .category
            .unwrap_or_else(|| self.categorize(candidate))
    }
}

/// Lowercase `"{title} {keyword} {source}"`, missing parts empty.
fn context_of(candidate: &Candidate) -> String {
    format!(
        "{} {} {}",
        candidate.title.as_deref().unwrap_or_default(),
        candidate.keyword.as_deref().unwrap_or_default(),
        candidate.source
    )
    .to_lowercase()
}
