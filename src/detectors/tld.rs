//! TLD risk assessment.
//!
//! The final label of the hostname is looked up against the risk tiers in
//! a fixed precedence order: high -> medium -> special-purpose -> country
//! -> low. An unknown TLD falls back to the low-risk default.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::reputation::ReputationData;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TldReport {
    pub tld: String,
    pub tier: String,
    pub reason: String,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(host: &str, data: &ReputationData) -> TldReport {
    let Some(tld) = host.rsplit('.').next().filter(|t| !t.is_empty()) else {
        return TldReport::default();
    };
    let tld = tld.to_ascii_lowercase();

    let tiers = [
        ("high_risk", &data.tlds.high_risk),
        ("medium_risk", &data.tlds.medium_risk),
        ("special_purpose", &data.tlds.special_purpose),
        ("country", &data.tlds.country_tlds),
        ("low_risk", &data.tlds.low_risk),
    ];

    let (tier, entry) = tiers
        .iter()
        .find(|(_, entry)| entry.tlds.contains(&tld))
        .copied()
        .unwrap_or(("low_risk", &data.tlds.low_risk));

    let mut report = TldReport {
        tld: tld.clone(),
        tier: tier.to_string(),
        reason: entry.reason.clone(),
        score: entry.score,
        flags: Vec::new(),
    };
    if entry.score > 0 {
        report.flags.push(Flag::new(
            "risky_tld",
            format!(".{tld}: {}", entry.reason),
            entry.score,
        ));
    }
    report
}
