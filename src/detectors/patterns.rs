//! Suspicious URL pattern scanning.
//!
//! Runs the compiled suspicious-URL rule table against the full URL, then
//! adds the structural host heuristics: unusually long domains, deep
//! subdomain nesting, high-entropy (machine-generated) hostnames, and
//! brand keywords embedded in domains the brand does not own.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::lexical::shannon_entropy;
use crate::reputation::ReputationData;

const MAX_DOMAIN_LENGTH: usize = 50;
const LONG_DOMAIN_SCORE: u32 = 10;
const MAX_SUBDOMAIN_COUNT: usize = 3;
const ENTROPY_THRESHOLD: f64 = 4.0;
const HIGH_ENTROPY_SCORE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousReport {
    /// Names of the table rules that matched.
    pub matched_rules: Vec<String>,
    /// Shannon entropy of the hostname, for diagnostics.
    pub entropy: f64,
    pub subdomain_count: usize,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(url: &str, host: &str, data: &ReputationData) -> SuspiciousReport {
    let mut report = SuspiciousReport {
        entropy: shannon_entropy(host),
        subdomain_count: subdomain_count(host),
        ..Default::default()
    };

    for rule in &data.suspicious_rules {
        if rule.regex.is_match(url) {
            report.matched_rules.push(rule.name.clone());
            report
                .flags
                .push(Flag::new(&rule.name, format!("URL matches rule '{}'", rule.name), rule.score));
            report.score += rule.score;
        }
    }

    if host.len() > MAX_DOMAIN_LENGTH {
        report.flags.push(Flag::new(
            "long_domain",
            format!("domain is {} characters long", host.len()),
            LONG_DOMAIN_SCORE,
        ));
        report.score += LONG_DOMAIN_SCORE;
    }

    if report.subdomain_count > MAX_SUBDOMAIN_COUNT {
        let score = report.subdomain_count as u32 * 5;
        report.flags.push(Flag::new(
            "subdomain_nesting",
            format!("{} subdomain labels", report.subdomain_count),
            score,
        ));
        report.score += score;
    }

    if report.entropy > ENTROPY_THRESHOLD {
        report.flags.push(Flag::new(
            "high_entropy",
            format!("hostname entropy {:.2} bits", report.entropy),
            HIGH_ENTROPY_SCORE,
        ));
        report.score += HIGH_ENTROPY_SCORE;
    }

    for brand in &data.brands {
        if brand.is_legitimate_domain(host) {
            continue;
        }
        let embedded = brand
            .keywords
            .iter()
            .find(|kw| host_token_matches(host, kw));
        if let Some(keyword) = embedded {
            let score = brand.priority_weight();
            report.flags.push(Flag::new(
                "brand_keyword",
                format!("brand keyword '{keyword}' in unaffiliated domain"),
                score,
            ));
            report.score += score;
        }
    }

    report
}

/// Number of labels beyond the registrable domain.
fn subdomain_count(host: &str) -> usize {
    let total = host.split('.').filter(|l| !l.is_empty()).count();
    let root_labels = psl::domain_str(host)
        .map(|root| root.split('.').count())
        .unwrap_or(2);
    total.saturating_sub(root_labels)
}

/// Matches a brand keyword against host tokens (labels and hyphen
/// segments). Short keywords must match a token exactly so incidental
/// substrings ("chase" inside "purchase") do not fire.
fn host_token_matches(host: &str, keyword: &str) -> bool {
    if keyword.len() >= 6 {
        return host.contains(keyword);
    }
    host.split(['.', '-']).any(|token| token == keyword)
}
