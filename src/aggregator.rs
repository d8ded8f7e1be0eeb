//! Score aggregation.
//!
//! URL assessments sum every detector's contribution and clamp to
//! 0..=100. Page assessments sum only the page-side signals and then take
//! the maximum against the URL score, so a clean page cannot dilute a bad
//! URL and a harvesting page cannot hide behind a clean URL.

use chrono::Utc;

use crate::core::{
    AnalysisBreakdown, Flag, Recommendation, ThreatAssessment, ThreatLevel,
};

pub const MAX_SCORE: u32 = 100;

/// Build a URL assessment from the detector breakdown. Flags are collected
/// in detector execution order.
pub fn assess_url(url: &str, domain: &str, analysis: AnalysisBreakdown) -> ThreatAssessment {
    let mut score = 0u32;
    let mut flags = Vec::new();
    for (s, f) in url_contributions(&analysis) {
        score = score.saturating_add(s);
        flags.extend_from_slice(f);
    }
    finish(url, domain, score, flags, analysis)
}

/// Extend a URL assessment with page-side detector results. The page-side
/// scores are summed separately; the final score is the larger of the two
/// sums.
pub fn assess_page(
    url_assessment: &ThreatAssessment,
    analysis: AnalysisBreakdown,
) -> ThreatAssessment {
    let url_score: u32 = url_contributions(&analysis).map(|(s, _)| s).sum();

    let mut page_score = 0u32;
    let mut flags = url_assessment.flags.clone();
    for (s, f) in page_contributions(&analysis) {
        page_score = page_score.saturating_add(s);
        flags.extend_from_slice(f);
    }

    finish(
        &url_assessment.url,
        &url_assessment.domain,
        url_score.max(page_score),
        flags,
        analysis,
    )
}

fn finish(
    url: &str,
    domain: &str,
    score: u32,
    flags: Vec<Flag>,
    analysis: AnalysisBreakdown,
) -> ThreatAssessment {
    let score = score.min(MAX_SCORE);
    ThreatAssessment {
        url: url.to_string(),
        domain: domain.to_string(),
        threat_score: score,
        threat_level: ThreatLevel::from_score(score),
        recommendation: Recommendation::from_score(score),
        flags,
        analysis,
        timestamp: Utc::now().to_rfc3339(),
    }
}

fn url_contributions(a: &AnalysisBreakdown) -> impl Iterator<Item = (u32, &[Flag])> {
    [
        a.malicious.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.homograph.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.typosquatting.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.suspicious_patterns.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.tld_risk.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.shortener.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.tracker.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.content.as_ref().map(|r| (r.score, r.flags.as_slice())),
    ]
    .into_iter()
    .flatten()
}

fn page_contributions(a: &AnalysisBreakdown) -> impl Iterator<Item = (u32, &[Flag])> {
    [
        a.login_forms.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.brand_impersonation.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.urgency.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.page_signals.as_ref().map(|r| (r.score, r.flags.as_slice())),
        a.page_content.as_ref().map(|r| (r.score, r.flags.as_slice())),
    ]
    .into_iter()
    .flatten()
}
