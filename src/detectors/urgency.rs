//! Urgency and pressure-language detection over page text.
//!
//! Runs the compiled urgency rules (deadline pressure, credential
//! harvesting prompts, fake rewards, authority impersonation) against
//! the page title and body and sums the scores of everything that fires.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::reputation::ReputationData;

/// One urgency rule that matched the page text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrgencyMatch {
    pub category: String,
    pub pattern: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UrgencyReport {
    pub matches: Vec<UrgencyMatch>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(title: &str, text: &str, data: &ReputationData) -> UrgencyReport {
    let haystack = format!("{} {}", title, text);
    let mut report = UrgencyReport::default();

    for rule in &data.urgency_rules {
        if !rule.regex.is_match(&haystack) {
            continue;
        }
        report.score += rule.score;
        report.flags.push(Flag::new(
            "urgency_language",
            format!("{} pattern matched: {}", rule.category, rule.regex.as_str()),
            rule.score,
        ));
        report.matches.push(UrgencyMatch {
            category: rule.category.to_string(),
            pattern: rule.regex.as_str().to_string(),
            score: rule.score,
        });
    }

    report
}
