//! Tracker classification.
//!
//! The Bloom filter over all tracker domains is probed first; because the
//! filter was populated with bare tracker domains (not arbitrary
//! subdomains), the probe walks up the hostname by stripping the leftmost
//! label each round. A definite filter miss skips the exact per-category
//! scan entirely; a possible hit is confirmed against the exact lists,
//! honoring per-category enablement from the settings.

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::core::Flag;
use crate::reputation::ReputationData;

const TRACKER_SCORE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackerReport {
    pub is_tracker: bool,
    pub category: Option<String>,
    /// The list entry that matched (the host itself or a parent domain).
    pub matched_domain: Option<String>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(host: &str, data: &ReputationData, settings: &Settings) -> TrackerReport {
    if !settings.tracker_detection {
        return TrackerReport::default();
    }

    for candidate in walk_up(host) {
        if !data.tracker_filter.contains(candidate) {
            continue;
        }
        // Possible member; confirm against the exact lists.
        for (category, domains) in &data.tracker_categories {
            if !settings.tracker_category_enabled(category) {
                continue;
            }
            if domains.contains(candidate) {
                metrics::counter!("detector_hits", "detector" => "tracker").increment(1);
                return TrackerReport {
                    is_tracker: true,
                    category: Some(category.clone()),
                    matched_domain: Some(candidate.to_string()),
                    score: TRACKER_SCORE,
                    flags: vec![Flag::new(
                        "tracker",
                        format!("{candidate} is a known {category} tracker"),
                        TRACKER_SCORE,
                    )],
                };
            }
        }
    }

    TrackerReport::default()
}

/// The host followed by each parent obtained by stripping the leftmost
/// label, down to a bare two-label domain.
fn walk_up(host: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(host), |current| {
        let (_, rest) = current.split_once('.')?;
        rest.contains('.').then_some(rest)
    })
}
