//! URL-shortener detection.
//!
//! Shorteners are not malicious per se, but they hide the true
//! destination, so a flat score nudges borderline URLs toward a warning.

use serde::{Deserialize, Serialize};

use crate::core::Flag;
use crate::reputation::ReputationData;

const SHORTENER_SCORE: u32 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShortenerReport {
    pub is_shortener: bool,
    /// The matched shortener domain (e.g. "bit.ly").
    pub service: Option<String>,
    pub score: u32,
    pub flags: Vec<Flag>,
}

pub fn check(host: &str, data: &ReputationData) -> ShortenerReport {
    let service = data
        .shorteners
        .iter()
        .find(|s| host == s.as_str() || host.ends_with(&format!(".{s}")));

    match service {
        Some(service) => ShortenerReport {
            is_shortener: true,
            service: Some(service.clone()),
            score: SHORTENER_SCORE,
            flags: vec![Flag::new(
                "url_shortener",
                format!("link via shortener {service}"),
                SHORTENER_SCORE,
            )],
        },
        None => ShortenerReport::default(),
    }
}
