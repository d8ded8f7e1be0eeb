//! Typosquatting detection: near-miss edit distance to a brand keyword.
//!
//! Domains that literally contain a brand keyword are not typosquats (the
//! suspicious-pattern and brand-impersonation detectors cover those); the
//! interesting case is a domain one or two keystrokes away from a brand,
//! registered to catch mistyped or visually-confused navigation.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::lexical::levenshtein;
use crate::reputation::ReputationData;

/// Maximum edit distance still considered a near-miss.
const DISTANCE_THRESHOLD: usize = 3;
/// Keywords shorter than this only match candidate tokens exactly, to keep
/// incidental substrings ("chase" in "purchase") from counting.
const SUBSTRING_MIN_KEYWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TyposquatReport {
    pub detected: bool,
    /// The impersonated brand, for the closest match found.
    pub brand: Option<String>,
    pub keyword: Option<String>,
    pub distance: Option<usize>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(domain: &str, data: &ReputationData) -> TyposquatReport {
    let tokens = candidate_tokens(domain);
    if tokens.is_empty() {
        return TyposquatReport::default();
    }

    let mut best: Option<(&str, &str, usize)> = None;

    for brand in &data.brands {
        if brand.is_legitimate_domain(domain) {
            continue;
        }
        for keyword in &brand.keywords {
            if contains_keyword(domain, keyword) {
                continue;
            }
            // A single keystroke is a near-miss wherever it lands. At two
            // or more edits a matching leading character is required, which
            // keeps unrelated words at distance 3 (e.g. "example" vs
            // "apple") from counting.
            let distance = tokens
                .iter()
                .map(|token| (token, levenshtein(token, keyword)))
                .filter(|(token, d)| {
                    *d == 1 || token.chars().next() == keyword.chars().next()
                })
                .map(|(_, d)| d)
                .min()
                .unwrap_or(usize::MAX);
            if distance == 0 || distance > DISTANCE_THRESHOLD {
                continue;
            }
            if best.map(|(_, _, d)| distance < d).unwrap_or(true) {
                best = Some((brand.name.as_str(), keyword.as_str(), distance));
            }
        }
    }

    match best {
        Some((brand, keyword, distance)) => {
            let score = ((DISTANCE_THRESHOLD - distance + 1) as u32) * 20;
            let flags = vec![Flag::new(
                "typosquatting",
                format!("domain is {distance} edit(s) away from brand '{brand}'"),
                score,
            )];
            metrics::counter!("detector_hits", "detector" => "typosquat").increment(1);
            TyposquatReport {
                detected: true,
                brand: Some(brand.to_string()),
                keyword: Some(keyword.to_string()),
                distance: Some(distance),
                score,
                flags,
            }
        }
        None => TyposquatReport::default(),
    }
}

/// The units compared against brand keywords: the registrable domain's
/// core label plus each of its hyphen-separated tokens.
fn candidate_tokens(domain: &str) -> Vec<String> {
    let root = psl::domain_str(domain).unwrap_or(domain);
    let Some(label) = root.split('.').next().filter(|l| !l.is_empty()) else {
        return Vec::new();
    };

    let mut tokens = vec![label.to_string()];
    if label.contains('-') {
        tokens.extend(label.split('-').filter(|t| !t.is_empty()).map(String::from));
    }
    tokens
}

/// Literal keyword containment check with a token-boundary guard for
/// short keywords.
fn contains_keyword(domain: &str, keyword: &str) -> bool {
    if keyword.len() >= SUBSTRING_MIN_KEYWORD_LEN {
        return domain.contains(keyword);
    }
    domain
        .split(['.', '-'])
        .any(|token| token == keyword)
}
