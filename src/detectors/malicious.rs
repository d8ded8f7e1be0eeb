//! Known-malicious domain lookup.
//!
//! Exact list membership is checked first (phishing, then malware, then
//! scam — first match wins and scores the maximum immediately), followed
//! by the compiled malicious-pattern table.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::reputation::ReputationData;

const LISTED_SCORE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MaliciousReport {
    pub listed: bool,
    /// The list ("phishing", "malware", "scam") or pattern that matched.
    pub category: Option<String>,
    pub pattern: Option<String>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(host: &str, data: &ReputationData) -> MaliciousReport {
    // Both the full host and its registrable root are candidates, so a
    // listed domain also covers its subdomains.
    let root = psl::domain_str(host).unwrap_or(host);

    let lists = [
        ("phishing", &data.malicious.phishing),
        ("malware", &data.malicious.malware),
        ("scam", &data.malicious.scam),
    ];
    for (category, list) in lists {
        if list.contains(host) || list.contains(root) {
            metrics::counter!("detector_hits", "detector" => "malicious").increment(1);
            return MaliciousReport {
                listed: true,
                category: Some(category.to_string()),
                pattern: None,
                score: LISTED_SCORE,
                flags: vec![Flag::new(
                    "known_malicious",
                    format!("domain on the {category} list"),
                    LISTED_SCORE,
                )],
            };
        }
    }

    for rule in &data.malicious.patterns {
        if rule.regex.is_match(host) {
            return MaliciousReport {
                listed: true,
                category: Some("pattern".to_string()),
                pattern: Some(rule.name.clone()),
                score: rule.score,
                flags: vec![Flag::new(
                    "malicious_pattern",
                    format!("domain matches pattern '{}'", rule.name),
                    rule.score,
                )],
            };
        }
    }

    MaliciousReport::default()
}
