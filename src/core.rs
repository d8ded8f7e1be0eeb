//! Core domain types for threatwatch
//!
//! This module defines the fundamental data structures shared by the
//! detectors, the aggregator and the coordinator.

use serde::{Deserialize, Serialize};

use crate::detectors::{
    content::ContentReport, homograph::HomographReport, login::BrandReport,
    login::LoginFormReport, malicious::MaliciousReport, patterns::SuspiciousReport,
    shortener::ShortenerReport, tld::TldReport, tracker::TrackerReport,
    typosquat::TyposquatReport, urgency::UrgencyReport, PageSignalReport,
};

/// A single contributing signal produced by a detector.
///
/// Flag scores are always non-negative; the aggregator clamps the final
/// sum, never the individual contributions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flag {
    /// Machine-readable flag identifier (e.g. "free_tld", "ip_submit").
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable detail for diagnostics and UI rendering.
    pub detail: String,
    /// The score this flag contributed to the aggregate.
    pub score: u32,
}

impl Flag {
    pub fn new(kind: &str, detail: impl Into<String>, score: u32) -> Self {
        Self {
            kind: kind.to_string(),
            detail: detail.into(),
            score,
        }
    }
}

/// Threat classification derived from the aggregate score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Maps a clamped threat score to its level. Inclusive lower bounds:
    /// CRITICAL >= 90, HIGH >= 70, MEDIUM >= 40, LOW >= 1.
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => ThreatLevel::Critical,
            70..=89 => ThreatLevel::High,
            40..=69 => ThreatLevel::Medium,
            1..=39 => ThreatLevel::Low,
            0 => ThreatLevel::None,
        }
    }
}

/// The recommended action for a scored URL or page.
///
/// CRITICAL deliberately collapses into the same BLOCK branch as HIGH;
/// callers that want a distinct critical action can branch on the level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    #[default]
    Allow,
    Warn,
    Block,
}

impl Recommendation {
    pub fn from_score(score: u32) -> Self {
        match score {
            70.. => Recommendation::Block,
            40..=69 => Recommendation::Warn,
            _ => Recommendation::Allow,
        }
    }
}

/// The aggregate output of a URL or page analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    /// The analyzed URL, as received.
    pub url: String,
    /// The parsed hostname, or empty if the URL was unparsable.
    pub domain: String,
    /// Aggregate confidence, always clamped to 0..=100.
    pub threat_score: u32,
    pub threat_level: ThreatLevel,
    pub recommendation: Recommendation,
    /// All contributing flags, in detector execution order.
    pub flags: Vec<Flag>,
    /// Per-detector raw results for diagnostics.
    pub analysis: AnalysisBreakdown,
    /// ISO 8601 timestamp when the assessment was produced.
    pub timestamp: String,
}

impl ThreatAssessment {
    /// A zero-score assessment carrying a single explanatory flag, used for
    /// whitelisted pages and unparsable URLs. Never blocks navigation.
    pub fn neutral(url: &str, domain: &str, flag: Option<Flag>) -> Self {
        Self {
            url: url.to_string(),
            domain: domain.to_string(),
            flags: flag.into_iter().collect(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }
}

/// Per-detector raw results, carried on every assessment for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malicious: Option<MaliciousReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homograph: Option<HomographReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typosquatting: Option<TyposquatReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_patterns: Option<SuspiciousReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tld_risk: Option<TldReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortener: Option<ShortenerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_forms: Option<LoginFormReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_impersonation: Option<BrandReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_signals: Option<PageSignalReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_content: Option<ContentReport>,
}

/// Page content collected by an external collaborator (e.g. a content
/// script), passed to `analyze_page`. Text is expected to be truncated to
/// a bounded length by the collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub forms: Vec<FormData>,
    #[serde(default)]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub has_popup_login: bool,
    #[serde(default)]
    pub has_iframe_login: bool,
    #[serde(default)]
    pub right_click_disabled: bool,
    /// Collector-side timestamp (ms since epoch); used in the page cache key.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A form observed on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FormData {
    /// The form's submission target, possibly relative or empty.
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub inputs: Vec<InputField>,
}

impl FormData {
    /// True if the form carries at least one password input.
    pub fn has_password_field(&self) -> bool {
        self.inputs
            .iter()
            .any(|i| i.kind.eq_ignore_ascii_case("password"))
    }
}

/// A single input field descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InputField {
    /// The input's `type` attribute.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

/// An image observed on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ImageData {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_level_thresholds_are_inclusive_lower_bounds() {
        assert_eq!(ThreatLevel::from_score(0), ThreatLevel::None);
        assert_eq!(ThreatLevel::from_score(1), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_score(39), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_score(40), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_score(69), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_score(70), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_score(89), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_score(90), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_score(100), ThreatLevel::Critical);
    }

    #[test]
    fn recommendation_blocks_critical_and_high_alike() {
        assert_eq!(Recommendation::from_score(0), Recommendation::Allow);
        assert_eq!(Recommendation::from_score(39), Recommendation::Allow);
        assert_eq!(Recommendation::from_score(40), Recommendation::Warn);
        assert_eq!(Recommendation::from_score(70), Recommendation::Block);
        assert_eq!(Recommendation::from_score(95), Recommendation::Block);
    }

    #[test]
    fn password_field_detection_is_case_insensitive() {
        let form = FormData {
            action: "/login".to_string(),
            method: "post".to_string(),
            inputs: vec![InputField {
                kind: "PASSWORD".to_string(),
                name: "pw".to_string(),
            }],
        };
        assert!(form.has_password_field());
    }

    #[test]
    fn flag_serializes_with_type_key() {
        let flag = Flag::new("free_tld", "TLD .tk is frequently abused", 15);
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["type"], "free_tld");
        assert_eq!(json["score"], 15);
    }
}
