// src/formatting.rs

use itertools::Itertools;

use crate::core::ThreatAssessment;

/// A trait for rendering finished assessments for output.
pub trait TextFormatter: Send + Sync {
    fn format_batch(&self, assessments: &[&ThreatAssessment]) -> String;
}

/// A single-line, human-readable formatter for terminal output.
pub struct PlainTextFormatter;

impl PlainTextFormatter {
    fn format_line(&self, assessment: &ThreatAssessment) -> String {
        let flag_part = if assessment.flags.is_empty() {
            "no flags".to_string()
        } else {
            let kinds: Vec<&str> = assessment.flags.iter().map(|f| f.kind.as_str()).collect();
            kinds.join(", ")
        };

        format!(
            "[{:?}] {} -> score {} ({:?}) [{}]",
            assessment.threat_level,
            assessment.url,
            assessment.threat_score,
            assessment.recommendation,
            flag_part
        )
    }
}

impl TextFormatter for PlainTextFormatter {
    fn format_batch(&self, assessments: &[&ThreatAssessment]) -> String {
        assessments.iter().map(|a| self.format_line(a)).join("\n")
    }
}

/// Emits one JSON document per assessment, newline-separated, for piping
/// into other tooling.
pub struct JsonFormatter;

impl TextFormatter for JsonFormatter {
    fn format_batch(&self, assessments: &[&ThreatAssessment]) -> String {
        assessments
            .iter()
            .filter_map(|a| serde_json::to_string(a).ok())
            .join("\n")
    }
}
