//! Reference-data loading and lookup.
//!
//! This module parses the JSON reputation datasets (brand database,
//! homoglyph maps, TLD risk tables, malicious/tracker/shortener lists,
//! content-category keywords, suspicious and urgency pattern tables) into
//! an immutable `ReputationData` structure at startup. All regexes are
//! validated and compiled exactly once here; an invalid pattern is skipped
//! and surfaced as a structured `LoadDiagnostic` instead of failing the
//! whole dataset or being discovered per-request.

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::bloom::BloomFilter;

/// Errors raised while loading reference data. Only structural problems
/// (unreadable file, malformed JSON) are errors; bad individual patterns
/// degrade to diagnostics.
#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("failed to read dataset {name}: {source}")]
    Read {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {name}: {source}")]
    Parse {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A skipped rule from one of the pattern tables, recorded at load time.
#[derive(Debug, Clone)]
pub struct LoadDiagnostic {
    /// Dataset the rule came from (e.g. "suspicious_patterns").
    pub dataset: &'static str,
    /// The rule's name or pattern source.
    pub rule: String,
    /// The regex compile error message.
    pub error: String,
}

/// A brand entry from the brand database.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    pub keywords: Vec<String>,
    /// Legitimate domains; a leading `*.` segment matches the base domain
    /// and any of its subdomains.
    pub legitimate_domains: Vec<String>,
    /// 1 = highest-value target. Scales impersonation scores.
    pub priority: u8,
}

impl Brand {
    /// Exact, suffix, or wildcard-pattern match against a candidate domain.
    pub fn is_legitimate_domain(&self, domain: &str) -> bool {
        self.legitimate_domains.iter().any(|pattern| {
            if let Some(base) = pattern.strip_prefix("*.") {
                domain == base || domain.ends_with(&format!(".{base}"))
            } else {
                domain == pattern
            }
        })
    }

    /// Score weight for this brand's priority tier.
    pub fn priority_weight(&self) -> u32 {
        match self.priority {
            0 | 1 => 30,
            2 => 20,
            _ => 10,
        }
    }
}

/// One tier of the TLD risk table.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TldTier {
    pub tlds: HashSet<String>,
    pub score: u32,
    pub reason: String,
}

/// TLD risk tables, looked up in a fixed precedence order.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TldTables {
    pub high_risk: TldTier,
    pub medium_risk: TldTier,
    pub special_purpose: TldTier,
    pub country_tlds: TldTier,
    pub low_risk: TldTier,
}

/// A compiled malicious-URL pattern with its score.
#[derive(Debug, Clone)]
pub struct MaliciousPattern {
    pub name: String,
    pub regex: Regex,
    pub score: u32,
}

/// Known-malicious domain lists plus compiled patterns. Exact lists are
/// scanned in declaration order: phishing, malware, scam.
#[derive(Debug, Clone, Default)]
pub struct MaliciousLists {
    pub phishing: HashSet<String>,
    pub malware: HashSet<String>,
    pub scam: HashSet<String>,
    pub patterns: Vec<MaliciousPattern>,
}

/// A compiled suspicious-URL rule.
#[derive(Debug, Clone)]
pub struct SuspiciousRule {
    pub name: String,
    pub regex: Regex,
    pub score: u32,
}

/// A compiled urgency-language rule, grouped by category.
#[derive(Debug, Clone)]
pub struct UrgencyRule {
    pub category: String,
    pub regex: Regex,
    pub score: u32,
}

/// A content-filtering category with strictness-tiered keyword sets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCategory {
    pub name: String,
    /// TLDs that block immediately for this category.
    pub blocked_tlds: HashSet<String>,
    /// Keywords matched at every strictness level.
    pub explicit: Vec<String>,
    /// Keywords matched only at High strictness.
    pub moderate: Vec<String>,
}

/// The complete, immutable reference-data set. Loaded once at startup;
/// detectors only ever take `&ReputationData`.
#[derive(Debug, Clone)]
pub struct ReputationData {
    /// Character -> Latin lookalike, for non-Latin scripts.
    pub homoglyphs: HashMap<char, char>,
    /// Digit -> Latin letter lookalikes, applied under stricter rules.
    pub digit_homoglyphs: HashMap<char, char>,
    pub brands: Vec<Brand>,
    /// Well-known neutral domains never flagged for brand impersonation.
    pub trusted_domains: HashSet<String>,
    pub tlds: TldTables,
    pub malicious: MaliciousLists,
    /// Tracker domains by category, with a Bloom filter over the union.
    pub tracker_categories: HashMap<String, HashSet<String>>,
    pub tracker_filter: BloomFilter,
    pub content_categories: Vec<ContentCategory>,
    pub suspicious_rules: Vec<SuspiciousRule>,
    pub urgency_rules: Vec<UrgencyRule>,
    pub shorteners: HashSet<String>,
    /// Rules skipped at load time because their regexes failed to compile.
    pub diagnostics: Vec<LoadDiagnostic>,
}

// --- Deserialization-only structs ---

#[derive(Debug, Deserialize)]
struct HomoglyphFile {
    #[serde(default)]
    cyrillic: HashMap<String, String>,
    #[serde(default)]
    greek: HashMap<String, String>,
    #[serde(default)]
    special: HashMap<String, String>,
    #[serde(default)]
    digits: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BrandFile {
    brands: Vec<Brand>,
    #[serde(default)]
    trusted: HashSet<String>,
}

#[derive(Debug, Deserialize)]
struct MaliciousFile {
    #[serde(default)]
    phishing: HashSet<String>,
    #[serde(default)]
    malware: HashSet<String>,
    #[serde(default)]
    scam: HashSet<String>,
    #[serde(default)]
    patterns: Vec<RawPattern>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    name: String,
    pattern: String,
    score: u32,
}

#[derive(Debug, Deserialize)]
struct RawScoredPattern {
    pattern: String,
    score: u32,
}

#[derive(Debug, Deserialize)]
struct UrgencyFile {
    #[serde(default)]
    urgency: Vec<RawScoredPattern>,
    #[serde(default, rename = "credentialHarvesting")]
    credential_harvesting: Vec<RawScoredPattern>,
    #[serde(default)]
    reward: Vec<RawScoredPattern>,
    #[serde(default)]
    impersonation: Vec<RawScoredPattern>,
}

/// The raw JSON documents for one reputation data set, before parsing.
/// Embedded defaults and directory overrides both funnel through this.
struct RawSources {
    homoglyphs: String,
    brands: String,
    tlds: String,
    malicious: String,
    trackers: String,
    categories: String,
    suspicious_patterns: String,
    shorteners: String,
    urgency: String,
}

impl RawSources {
    fn builtin() -> Self {
        Self {
            homoglyphs: include_str!("../data/homoglyphs.json").to_string(),
            brands: include_str!("../data/brands.json").to_string(),
            tlds: include_str!("../data/tlds.json").to_string(),
            malicious: include_str!("../data/malicious.json").to_string(),
            trackers: include_str!("../data/trackers.json").to_string(),
            categories: include_str!("../data/categories.json").to_string(),
            suspicious_patterns: include_str!("../data/suspicious_patterns.json").to_string(),
            shorteners: include_str!("../data/shorteners.json").to_string(),
            urgency: include_str!("../data/urgency.json").to_string(),
        }
    }

    /// Replaces any dataset for which a same-named file exists in `dir`.
    fn merge_dir(mut self, dir: &Path) -> Result<Self, ReputationError> {
        let mut load = |name: &'static str, slot: &mut String| -> Result<(), ReputationError> {
            let path = dir.join(format!("{name}.json"));
            if path.exists() {
                *slot = std::fs::read_to_string(&path)
                    .map_err(|source| ReputationError::Read { name, source })?;
            }
            Ok(())
        };
        load("homoglyphs", &mut self.homoglyphs)?;
        load("brands", &mut self.brands)?;
        load("tlds", &mut self.tlds)?;
        load("malicious", &mut self.malicious)?;
        load("trackers", &mut self.trackers)?;
        load("categories", &mut self.categories)?;
        load("suspicious_patterns", &mut self.suspicious_patterns)?;
        load("shorteners", &mut self.shorteners)?;
        load("urgency", &mut self.urgency)?;
        Ok(self)
    }
}

impl ReputationData {
    /// Parses the datasets embedded in the crate.
    pub fn builtin() -> Result<Self, ReputationError> {
        Self::from_sources(RawSources::builtin())
    }

    /// Parses the embedded datasets, with any same-named `*.json` file in
    /// `dir` taking precedence over its embedded counterpart.
    pub fn load_with_overrides(dir: &Path) -> Result<Self, ReputationError> {
        Self::from_sources(RawSources::builtin().merge_dir(dir)?)
    }

    fn from_sources(sources: RawSources) -> Result<Self, ReputationError> {
        let mut diagnostics = Vec::new();

        let homoglyph_file: HomoglyphFile = parse("homoglyphs", &sources.homoglyphs)?;
        let mut homoglyphs = HashMap::new();
        for table in [
            &homoglyph_file.cyrillic,
            &homoglyph_file.greek,
            &homoglyph_file.special,
        ] {
            for (from, to) in table {
                if let (Some(f), Some(t)) = (single_char(from), single_char(to)) {
                    homoglyphs.insert(f, t);
                }
            }
        }
        let mut digit_homoglyphs = HashMap::new();
        for (from, to) in &homoglyph_file.digits {
            if let (Some(f), Some(t)) = (single_char(from), single_char(to)) {
                digit_homoglyphs.insert(f, t);
            }
        }

        let brand_file: BrandFile = parse("brands", &sources.brands)?;
        let tlds: TldTables = parse("tlds", &sources.tlds)?;

        let malicious_file: MaliciousFile = parse("malicious", &sources.malicious)?;
        let patterns = malicious_file
            .patterns
            .into_iter()
            .filter_map(|raw| {
                compile("malicious", &raw.name, &raw.pattern, &mut diagnostics).map(|regex| {
                    MaliciousPattern {
                        name: raw.name,
                        regex,
                        score: raw.score,
                    }
                })
            })
            .collect();
        let malicious = MaliciousLists {
            phishing: malicious_file.phishing,
            malware: malicious_file.malware,
            scam: malicious_file.scam,
            patterns,
        };

        let tracker_categories: HashMap<String, HashSet<String>> =
            parse("trackers", &sources.trackers)?;
        let tracker_count: usize = tracker_categories.values().map(HashSet::len).sum();
        let mut tracker_filter = BloomFilter::optimal(tracker_count.max(1) as u64, 0.01);
        for domain in tracker_categories.values().flatten() {
            tracker_filter.add(domain);
        }

        let content_categories: Vec<ContentCategory> = parse("categories", &sources.categories)?;

        let raw_suspicious: Vec<RawPattern> =
            parse("suspicious_patterns", &sources.suspicious_patterns)?;
        let suspicious_rules = raw_suspicious
            .into_iter()
            .filter_map(|raw| {
                compile("suspicious_patterns", &raw.name, &raw.pattern, &mut diagnostics).map(
                    |regex| SuspiciousRule {
                        name: raw.name,
                        regex,
                        score: raw.score,
                    },
                )
            })
            .collect();

        let shorteners: HashSet<String> = parse("shorteners", &sources.shorteners)?;

        let urgency_file: UrgencyFile = parse("urgency", &sources.urgency)?;
        let mut urgency_rules = Vec::new();
        for (category, rules) in [
            ("urgency", urgency_file.urgency),
            ("credential_harvesting", urgency_file.credential_harvesting),
            ("reward", urgency_file.reward),
            ("impersonation", urgency_file.impersonation),
        ] {
            for raw in rules {
                if let Some(regex) = compile("urgency", &raw.pattern, &raw.pattern, &mut diagnostics)
                {
                    urgency_rules.push(UrgencyRule {
                        category: category.to_string(),
                        regex,
                        score: raw.score,
                    });
                }
            }
        }

        Ok(Self {
            homoglyphs,
            digit_homoglyphs,
            brands: brand_file.brands,
            trusted_domains: brand_file.trusted,
            tlds,
            malicious,
            tracker_categories,
            tracker_filter,
            content_categories,
            suspicious_rules,
            urgency_rules,
            shorteners,
            diagnostics,
        })
    }

    /// True if `domain` (or its registrable parent) is on the trusted list.
    pub fn is_trusted_domain(&self, domain: &str) -> bool {
        if self.trusted_domains.contains(domain) {
            return true;
        }
        psl::domain_str(domain)
            .map(|root| self.trusted_domains.contains(root))
            .unwrap_or(false)
    }
}

fn parse<'a, T: Deserialize<'a>>(
    name: &'static str,
    content: &'a str,
) -> Result<T, ReputationError> {
    serde_json::from_str(content).map_err(|source| ReputationError::Parse { name, source })
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Compiles one rule, recording a diagnostic and returning `None` on
/// failure so the remaining rules still apply.
fn compile(
    dataset: &'static str,
    rule: &str,
    pattern: &str,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(dataset, rule, error = %e, "skipping invalid pattern");
            diagnostics.push(LoadDiagnostic {
                dataset,
                rule: rule.to_string(),
                error: e.to_string(),
            });
            None
        }
    }
}

/// Convenience wrapper used by the binary: loads reference data from the
/// configured directory, or the embedded defaults when none is set.
pub fn load(data_dir: Option<&Path>) -> anyhow::Result<ReputationData> {
    let data = match data_dir {
        Some(dir) => ReputationData::load_with_overrides(dir)
            .with_context(|| format!("loading reference data from {}", dir.display()))?,
        None => ReputationData::builtin().context("parsing embedded reference data")?,
    };
    for diag in &data.diagnostics {
        warn!(
            dataset = diag.dataset,
            rule = %diag.rule,
            error = %diag.error,
            "reference-data rule skipped"
        );
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_data_parses_cleanly() {
        let data = ReputationData::builtin().expect("embedded data must parse");
        assert!(data.diagnostics.is_empty(), "{:?}", data.diagnostics);
        assert!(!data.brands.is_empty());
        assert!(!data.suspicious_rules.is_empty());
        assert!(!data.urgency_rules.is_empty());
        assert!(data.shorteners.contains("bit.ly"));
        assert!(data.homoglyphs.contains_key(&'а')); // Cyrillic a
        assert!(data.tlds.high_risk.tlds.contains("tk"));
    }

    #[test]
    fn tracker_filter_covers_all_listed_domains() {
        let data = ReputationData::builtin().unwrap();
        for domain in data.tracker_categories.values().flatten() {
            assert!(data.tracker_filter.contains(domain), "{domain} not in filter");
        }
    }

    #[test]
    fn wildcard_legitimate_domains_match_subdomains() {
        let brand = Brand {
            name: "paypal".to_string(),
            keywords: vec!["paypal".to_string()],
            legitimate_domains: vec!["paypal.com".to_string(), "*.paypal.com".to_string()],
            priority: 1,
        };
        assert!(brand.is_legitimate_domain("paypal.com"));
        assert!(brand.is_legitimate_domain("www.paypal.com"));
        assert!(brand.is_legitimate_domain("checkout.www.paypal.com"));
        assert!(!brand.is_legitimate_domain("paypal.com.evil.tk"));
        assert!(!brand.is_legitimate_domain("notpaypal.com"));
    }

    #[test]
    fn invalid_pattern_is_skipped_with_diagnostic() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut sources = RawSources::builtin();
        sources.suspicious_patterns = r#"[
            {"name": "broken", "pattern": "[unclosed", "score": 10},
            {"name": "fine", "pattern": "^https?://", "score": 5}
        ]"#
        .to_string();
        let data = ReputationData::from_sources(sources).unwrap();
        assert_eq!(data.suspicious_rules.len(), 1);
        assert_eq!(data.suspicious_rules[0].name, "fine");
        assert_eq!(data.diagnostics.len(), 1);
        assert_eq!(data.diagnostics[0].rule, "broken");
    }

    #[test]
    fn directory_overrides_replace_embedded_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("shorteners.json")).unwrap();
        write!(file, r#"["short.test"]"#).unwrap();

        let data = ReputationData::load_with_overrides(dir.path()).unwrap();
        assert!(data.shorteners.contains("short.test"));
        assert!(!data.shorteners.contains("bit.ly"));
        // Untouched datasets still come from the embedded defaults.
        assert!(!data.brands.is_empty());
    }

    #[test]
    fn trusted_domain_covers_subdomains_via_registrable_root() {
        let data = ReputationData::builtin().unwrap();
        assert!(data.is_trusted_domain("google.com"));
        assert!(data.is_trusted_domain("mail.google.com"));
        assert!(!data.is_trusted_domain("google.com.phish.tk"));
    }
}
