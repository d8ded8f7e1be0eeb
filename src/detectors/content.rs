//! Content-category classification.
//!
//! Two variants share the category data: the URL check (blocked-TLD
//! lookup, then keyword scan over the URL string) and the page-content
//! check (keyword occurrence counting over title + text, with a minimum
//! density before a category fires). Strictness tiers widen the keyword
//! set: High strictness includes the moderate keywords alongside the
//! explicit ones.

use serde::{Deserialize, Serialize};

use crate::config::{Settings, Strictness};
use crate::core::Flag;
use crate::reputation::{ContentCategory, ReputationData};

const BLOCKED_TLD_SCORE: u32 = 100;
const URL_KEYWORD_SCORE: u32 = 50;
const MIN_PAGE_OCCURRENCES: usize = 3;
const PER_CATEGORY_PAGE_CAP: u32 = 50;
const TOTAL_SCORE_CAP: u32 = 100;
/// A category blocks once its cumulative score reaches this.
const CATEGORY_BLOCK_THRESHOLD: u32 = 50;

/// One content category that matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMatch {
    pub category: String,
    /// Keyword occurrences counted (0 for blocked-TLD matches).
    pub occurrences: usize,
    pub score: u32,
    pub should_block: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentReport {
    pub matched_categories: Vec<CategoryMatch>,
    pub should_block: bool,
    pub score: u32,
    pub flags: Vec<Flag>,
}

impl ContentReport {
    fn push(&mut self, m: CategoryMatch, flag: Flag) {
        self.should_block |= m.should_block;
        self.score = (self.score + m.score).min(TOTAL_SCORE_CAP);
        self.matched_categories.push(m);
        self.flags.push(flag);
    }
}

/// URL-level classification: blocked TLDs first (immediate max-score
/// block), then keyword presence in the URL string.
pub fn check_url(url: &str, host: &str, data: &ReputationData, settings: &Settings) -> ContentReport {
    if !settings.content_filtering {
        return ContentReport::default();
    }

    let mut report = ContentReport::default();
    let tld = host.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    let url_lower = url.to_ascii_lowercase();

    // Categories are scanned in data-file order; a TLD listed by more
    // than one category is attributed to the first enabled one.
    for category in &data.content_categories {
        let policy = settings.content_policy(&category.name);
        if !policy.enabled {
            continue;
        }

        if category.blocked_tlds.contains(&tld) {
            report.push(
                CategoryMatch {
                    category: category.name.clone(),
                    occurrences: 0,
                    score: BLOCKED_TLD_SCORE,
                    should_block: true,
                },
                Flag::new(
                    "blocked_tld",
                    format!(".{tld} is blocked for category '{}'", category.name),
                    BLOCKED_TLD_SCORE,
                ),
            );
            return report;
        }

        if let Some(keyword) = keywords(category, policy.strictness).find(|kw| url_lower.contains(*kw))
        {
            report.push(
                CategoryMatch {
                    category: category.name.clone(),
                    occurrences: 1,
                    score: URL_KEYWORD_SCORE,
                    should_block: URL_KEYWORD_SCORE >= CATEGORY_BLOCK_THRESHOLD,
                },
                Flag::new(
                    "content_keyword_url",
                    format!("URL contains '{}' ({})", keyword, category.name),
                    URL_KEYWORD_SCORE,
                ),
            );
        }
    }

    report
}

/// Page-content classification over title + visible text. A category only
/// fires at 3+ keyword occurrences; its score is `min(occurrences * 10,
/// 50)`, and categories are summed with a 100 cap.
pub fn check_page(
    title: &str,
    text: &str,
    data: &ReputationData,
    settings: &Settings,
) -> ContentReport {
    if !settings.content_filtering {
        return ContentReport::default();
    }

    let haystack = format!("{} {}", title, text).to_ascii_lowercase();
    let mut report = ContentReport::default();

    for category in &data.content_categories {
        let policy = settings.content_policy(&category.name);
        if !policy.enabled {
            continue;
        }

        let occurrences: usize = keywords(category, policy.strictness)
            .map(|kw| haystack.matches(kw).count())
            .sum();
        if occurrences < MIN_PAGE_OCCURRENCES {
            continue;
        }

        let score = (occurrences as u32 * 10).min(PER_CATEGORY_PAGE_CAP);
        report.push(
            CategoryMatch {
                category: category.name.clone(),
                occurrences,
                score,
                should_block: score >= CATEGORY_BLOCK_THRESHOLD,
            },
            Flag::new(
                "content_keywords",
                format!(
                    "{} occurrences of '{}' keywords in page content",
                    occurrences, category.name
                ),
                score,
            ),
        );
    }

    report
}

fn keywords(category: &ContentCategory, strictness: Strictness) -> impl Iterator<Item = &str> {
    let moderate = match strictness {
        Strictness::High => category.moderate.as_slice(),
        _ => &[],
    };
    category
        .explicit
        .iter()
        .chain(moderate.iter())
        .map(String::as_str)
}
