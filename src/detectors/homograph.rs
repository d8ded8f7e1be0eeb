//! Homograph detection: visually deceptive characters in a hostname.
//!
//! Non-Latin homoglyphs (Cyrillic, Greek, special Latin variants) are
//! always suspicious in a hostname. Digit-for-letter lookalikes are only
//! flagged when substituting the Latin equivalents yields a known brand
//! domain, so legitimately numeric domains (e.g. `365tickets.com`) are not
//! penalized.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::reputation::ReputationData;

const SCORE_PER_HIT: u32 = 15;
const SCORE_CAP: u32 = 45;

/// One deceptive character found in the domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HomoglyphHit {
    pub character: char,
    pub latin: char,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HomographReport {
    pub detected: bool,
    pub hits: Vec<HomoglyphHit>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(domain: &str, data: &ReputationData) -> HomographReport {
    let mut hits: Vec<HomoglyphHit> = domain
        .chars()
        .filter_map(|c| {
            data.homoglyphs
                .get(&c)
                .map(|&latin| HomoglyphHit { character: c, latin })
        })
        .collect();

    hits.extend(digit_hits(domain, data));

    if hits.is_empty() {
        return HomographReport::default();
    }

    let score = (hits.len() as u32 * SCORE_PER_HIT).min(SCORE_CAP);
    let spoofed: String = hits.iter().map(|h| h.character).collect();
    let flags = vec![Flag::new(
        "homograph",
        format!("deceptive characters in domain: {spoofed}"),
        score,
    )];

    HomographReport {
        detected: true,
        hits,
        score,
        flags,
    }
}

/// Digit lookalikes count only when the digit-normalized domain lines up
/// with a known brand: either one of its legitimate domains, or its core
/// label equals a brand keyword.
fn digit_hits(domain: &str, data: &ReputationData) -> Vec<HomoglyphHit> {
    let candidates: Vec<HomoglyphHit> = domain
        .chars()
        .filter_map(|c| {
            data.digit_homoglyphs
                .get(&c)
                .map(|&latin| HomoglyphHit { character: c, latin })
        })
        .collect();
    if candidates.is_empty() {
        return candidates;
    }

    let normalized: String = domain
        .chars()
        .map(|c| data.digit_homoglyphs.get(&c).copied().unwrap_or(c))
        .collect();
    let core = core_label(&normalized);

    let matches_brand = data.brands.iter().any(|brand| {
        brand.is_legitimate_domain(&normalized) || brand.keywords.iter().any(|kw| kw == core)
    });

    if matches_brand {
        candidates
    } else {
        Vec::new()
    }
}

/// First label of the registrable domain ("g00gle" for "g00gle.com").
fn core_label(domain: &str) -> &str {
    let root = psl::domain_str(domain).unwrap_or(domain);
    root.split('.').next().unwrap_or(root)
}
