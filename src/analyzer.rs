//! The analysis coordinator.
//!
//! Owns the reputation data, the runtime settings, both result caches,
//! the whitelist and the counters, and fixes the detector invocation
//! order so aggregate flag lists are stable. Detectors stay pure; all
//! policy (feature toggles, whitelisting, caching) lives here.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use arc_swap::ArcSwap;
use log::{debug, warn};
use url::Url;

use crate::aggregator;
use crate::cache::ResultCache;
use crate::config::{CacheConfig, Settings, SettingsUpdate};
use crate::core::{AnalysisBreakdown, Flag, PageData, Recommendation, ThreatAssessment};
use crate::detectors;
use crate::reputation::ReputationData;
use crate::stats::{Stats, StatsSnapshot};
use crate::whitelist::Whitelist;

pub struct ThreatAnalyzer {
    data: Arc<ReputationData>,
    settings: ArcSwap<Settings>,
    url_cache: ResultCache,
    page_cache: ResultCache,
    whitelist: RwLock<Whitelist>,
    stats: Arc<Stats>,
}

impl ThreatAnalyzer {
    pub fn new(
        data: Arc<ReputationData>,
        settings: Settings,
        cache_config: &CacheConfig,
        whitelist: Whitelist,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            data,
            settings: ArcSwap::from_pointee(settings),
            url_cache: ResultCache::new(
                Duration::from_secs(cache_config.url_ttl_seconds),
                cache_config.url_capacity,
            ),
            page_cache: ResultCache::new(
                Duration::from_secs(cache_config.page_ttl_seconds),
                cache_config.page_capacity,
            ),
            whitelist: RwLock::new(whitelist),
            stats,
        }
    }

    /// Analyzes a URL through every URL-side detector. Results are cached
    /// by URL; unparsable URLs yield an uncached neutral assessment.
    pub fn analyze_url(&self, url: &str) -> Arc<ThreatAssessment> {
        if let Some(hit) = self.url_cache.get(url) {
            self.stats.record_cache_hit();
            debug!("URL cache hit for {url}");
            return hit;
        }

        let parsed = match Url::parse(url) {
            Ok(p) => p,
            Err(e) => return self.unparsable(url, &e.to_string()),
        };
        let host = match parsed.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return self.unparsable(url, "URL has no host"),
        };

        let analysis = self.run_url_detectors(url, &host);
        let assessment = aggregator::assess_url(url, &host, analysis);
        self.record_url_outcome(&assessment);
        self.url_cache.insert(url, assessment)
    }

    /// Analyzes collected page content on top of the URL assessment.
    /// Whitelisted hosts short-circuit to a neutral, uncached assessment.
    pub fn analyze_page(&self, page: &PageData) -> Arc<ThreatAssessment> {
        let parsed = match Url::parse(&page.url) {
            Ok(p) => p,
            Err(e) => return self.unparsable(&page.url, &e.to_string()),
        };
        let host = match parsed.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return self.unparsable(&page.url, "URL has no host"),
        };

        if self.is_whitelisted(&host) {
            debug!("Skipping page analysis for whitelisted host {host}");
            return Arc::new(ThreatAssessment::neutral(
                &page.url,
                &host,
                Some(Flag::new("whitelisted", format!("{host} is whitelisted"), 0)),
            ));
        }

        // Collected snapshots carry a capture timestamp; keying on it keeps
        // re-captures of a changing page from hitting a stale entry.
        let cache_key = format!("{}::{}", page.url, page.timestamp.unwrap_or(0));
        if let Some(hit) = self.page_cache.get(&cache_key) {
            self.stats.record_cache_hit();
            return hit;
        }

        let url_assessment = self.analyze_url(&page.url);
        let settings = self.settings.load();
        let mut analysis = url_assessment.analysis.clone();

        if settings.phishing_detection {
            analysis.login_forms = Some(detectors::login::check_forms(page, &parsed));
            analysis.brand_impersonation =
                Some(detectors::login::check_brand(page, &host, &self.data));
            analysis.urgency = Some(detectors::urgency::check(
                &page.title,
                &page.text_content,
                &self.data,
            ));
        }
        analysis.page_signals = Some(detectors::page_characteristics(page));
        analysis.page_content = Some(detectors::content::check_page(
            &page.title,
            &page.text_content,
            &self.data,
            &settings,
        ));

        let assessment = aggregator::assess_page(&url_assessment, analysis);
        self.record_page_outcome(&assessment, &url_assessment);
        self.page_cache.insert(&cache_key, assessment)
    }

    pub fn is_whitelisted(&self, host: &str) -> bool {
        match self.whitelist.read() {
            Ok(wl) => wl.contains(host),
            Err(poisoned) => poisoned.into_inner().contains(host),
        }
    }

    /// Adds a domain to the whitelist and drops cached page results so the
    /// exemption takes effect immediately.
    pub fn add_to_whitelist(&self, domain: &str) -> bool {
        let added = match self.whitelist.write() {
            Ok(mut wl) => wl.add(domain),
            Err(poisoned) => poisoned.into_inner().add(domain),
        };
        if added {
            self.page_cache.invalidate_all();
        }
        added
    }

    pub fn remove_from_whitelist(&self, domain: &str) -> bool {
        let removed = match self.whitelist.write() {
            Ok(mut wl) => wl.remove(domain),
            Err(poisoned) => poisoned.into_inner().remove(domain),
        };
        if removed {
            self.page_cache.invalidate_all();
        }
        removed
    }

    /// Applies a partial settings update atomically. Cached results were
    /// computed under the old settings, so both caches are dropped.
    pub fn update_settings(&self, update: &SettingsUpdate) {
        self.settings.rcu(|current| current.merged_with(update));
        self.url_cache.invalidate_all();
        self.page_cache.invalidate_all();
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn run_url_detectors(&self, url: &str, host: &str) -> AnalysisBreakdown {
        let settings = self.settings.load();
        let mut analysis = AnalysisBreakdown {
            malicious: Some(detectors::malicious::check(host, &self.data)),
            suspicious_patterns: Some(detectors::patterns::check(url, host, &self.data)),
            tld_risk: Some(detectors::tld::check(host, &self.data)),
            shortener: Some(detectors::shortener::check(host, &self.data)),
            tracker: Some(detectors::tracker::check(host, &self.data, &settings)),
            content: Some(detectors::content::check_url(url, host, &self.data, &settings)),
            ..Default::default()
        };
        if settings.phishing_detection {
            // `Url` punycodes non-ASCII hosts; the homograph check needs the
            // as-typed form to see the confusable characters.
            let unicode_host = Self::raw_host(url).unwrap_or_else(|| host.to_string());
            analysis.homograph = Some(detectors::homograph::check(&unicode_host, &self.data));
            analysis.typosquatting = Some(detectors::typosquat::check(host, &self.data));
        }
        analysis
    }

    fn record_url_outcome(&self, assessment: &ThreatAssessment) {
        self.stats.record_url_analyzed();
        self.record_common(assessment);
    }

    /// Counters the nested URL analysis already bumped are skipped here so
    /// one page assessment never counts a threat twice.
    fn record_page_outcome(&self, assessment: &ThreatAssessment, url: &ThreatAssessment) {
        self.stats.record_page_analyzed();
        let brand_hit = assessment
            .analysis
            .brand_impersonation
            .as_ref()
            .is_some_and(|r| r.detected);
        if brand_hit && !Self::url_phishing(url) {
            self.stats.record_phishing();
        }
        if assessment
            .analysis
            .page_content
            .as_ref()
            .is_some_and(|r| r.should_block)
        {
            self.stats.record_content_blocked();
        }
        if assessment.recommendation == Recommendation::Block
            && url.recommendation != Recommendation::Block
        {
            self.stats.record_threat_blocked();
        }
    }

    fn record_common(&self, assessment: &ThreatAssessment) {
        let a = &assessment.analysis;
        if assessment.recommendation == Recommendation::Block {
            self.stats.record_threat_blocked();
        }
        if Self::url_phishing(assessment) {
            self.stats.record_phishing();
        }
        if a.tracker.as_ref().is_some_and(|r| r.is_tracker) {
            self.stats.record_tracker();
        }
        if a.content.as_ref().is_some_and(|r| r.should_block) {
            self.stats.record_content_blocked();
        }
    }

    fn url_phishing(assessment: &ThreatAssessment) -> bool {
        let a = &assessment.analysis;
        a.homograph.as_ref().is_some_and(|r| r.detected)
            || a.typosquatting.as_ref().is_some_and(|r| r.detected)
            || a.malicious
                .as_ref()
                .is_some_and(|r| r.category.as_deref() == Some("phishing"))
    }

    /// The hostname exactly as it appears in the URL string, without the
    /// IDNA mapping `Url::host_str` applies. IPv6 literals are skipped.
    fn raw_host(url: &str) -> Option<String> {
        let after_scheme = url.split_once("://").map(|(_, rest)| rest)?;
        let authority = after_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(after_scheme);
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        if host_port.starts_with('[') {
            return None;
        }
        let host = host_port.split(':').next().unwrap_or(host_port);
        if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        }
    }

    fn unparsable(&self, url: &str, reason: &str) -> Arc<ThreatAssessment> {
        warn!("Could not analyze {url}: {reason}");
        Arc::new(ThreatAssessment::neutral(
            url,
            "",
            Some(Flag::new(
                "analysis_error",
                format!("URL could not be parsed: {reason}"),
                0,
            )),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ThreatLevel;
    use tempfile::TempDir;

    fn analyzer_in(dir: &TempDir) -> ThreatAnalyzer {
        let data = Arc::new(ReputationData::builtin().unwrap());
        let whitelist = Whitelist::load(&dir.path().join("whitelist.json")).unwrap();
        ThreatAnalyzer::new(
            data,
            Settings::default(),
            &CacheConfig::default(),
            whitelist,
            Arc::new(Stats::default()),
        )
    }

    #[test]
    fn clean_url_is_allowed() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let out = analyzer.analyze_url("https://example.com/about");
        assert_eq!(out.threat_score, 0);
        assert_eq!(out.threat_level, ThreatLevel::None);
        assert_eq!(out.recommendation, Recommendation::Allow);
        assert!(out.flags.is_empty());
    }

    #[test]
    fn second_lookup_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let first = analyzer.analyze_url("https://example.com/");
        let second = analyzer.analyze_url("https://example.com/");
        assert_eq!(first.timestamp, second.timestamp);
        let snap = analyzer.stats();
        assert_eq!(snap.urls_analyzed, 1);
        assert_eq!(snap.cache_hits, 1);
    }

    #[test]
    fn unparsable_url_is_neutral_and_uncached() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let out = analyzer.analyze_url("not a url");
        assert_eq!(out.threat_score, 0);
        assert_eq!(out.flags[0].kind, "analysis_error");
        assert_eq!(analyzer.stats().urls_analyzed, 0);

        analyzer.analyze_url("not a url");
        assert_eq!(analyzer.stats().cache_hits, 0);
    }

    #[test]
    fn disabling_phishing_detection_skips_lookalike_checks() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);

        let before = analyzer.analyze_url("https://paypai.com/");
        assert!(before
            .analysis
            .typosquatting
            .as_ref()
            .is_some_and(|r| r.detected));

        analyzer.update_settings(&SettingsUpdate {
            phishing_detection: Some(false),
            ..Default::default()
        });
        let after = analyzer.analyze_url("https://paypai.com/");
        assert!(after.analysis.typosquatting.is_none());
        assert!(after.threat_score < before.threat_score);
    }

    #[test]
    fn whitelisted_page_short_circuits() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        analyzer.add_to_whitelist("paypai.com");

        let page = PageData {
            url: "https://paypai.com/login".to_string(),
            ..Default::default()
        };
        let out = analyzer.analyze_page(&page);
        assert_eq!(out.threat_score, 0);
        assert_eq!(out.recommendation, Recommendation::Allow);
        assert_eq!(out.flags[0].kind, "whitelisted");
        assert_eq!(analyzer.stats().pages_analyzed, 0);

        analyzer.remove_from_whitelist("paypai.com");
        let out = analyzer.analyze_page(&page);
        assert!(out.threat_score > 0);
    }

    #[test]
    fn page_assessment_includes_page_side_reports() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let page = PageData {
            url: "https://example.com/".to_string(),
            title: "Sign in".to_string(),
            has_popup_login: true,
            ..Default::default()
        };
        let out = analyzer.analyze_page(&page);
        assert!(out.analysis.page_signals.is_some());
        assert!(out.analysis.login_forms.is_some());
        assert_eq!(out.threat_score, 10);
        assert_eq!(analyzer.stats().pages_analyzed, 1);
    }

    #[test]
    fn page_cache_keys_on_capture_timestamp() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let mut page = PageData {
            url: "https://example.com/".to_string(),
            timestamp: Some(1),
            ..Default::default()
        };
        analyzer.analyze_page(&page);
        analyzer.analyze_page(&page);
        assert_eq!(analyzer.stats().pages_analyzed, 1);

        page.timestamp = Some(2);
        analyzer.analyze_page(&page);
        assert_eq!(analyzer.stats().pages_analyzed, 2);
    }

    #[test]
    fn homograph_survives_idna_mapping() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        // Cyrillic "а": `Url` maps the host to punycode internally.
        let out = analyzer.analyze_url("https://аpple.com/");
        assert!(out
            .analysis
            .homograph
            .as_ref()
            .is_some_and(|r| r.detected));
        assert!(out.flags.iter().any(|f| f.kind == "homograph"));
    }

    #[test]
    fn page_of_a_blocked_url_counts_the_threat_once() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let page = PageData {
            url: "https://appleid-verify.net/".to_string(),
            ..Default::default()
        };
        let out = analyzer.analyze_page(&page);
        assert_eq!(out.recommendation, Recommendation::Block);

        let snap = analyzer.stats();
        assert_eq!(snap.threats_blocked, 1);
        assert_eq!(snap.phishing_detected, 1);
    }

    #[test]
    fn blocked_url_increments_the_block_counter() {
        let dir = TempDir::new().unwrap();
        let analyzer = analyzer_in(&dir);
        let out = analyzer.analyze_url("https://appleid-verify.net/");
        // Known-malicious listing scores 100 on its own.
        assert_eq!(out.recommendation, Recommendation::Block);
        assert_eq!(analyzer.stats().threats_blocked, 1);
        assert_eq!(analyzer.stats().phishing_detected, 1);
    }
}
