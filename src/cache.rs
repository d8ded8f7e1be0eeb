// Time-aware caching of finished assessments.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::core::ThreatAssessment;

/// A TTL-bounded cache of completed assessments, keyed by a hash of the
/// caller-supplied key (the URL for URL assessments, `url::timestamp` for
/// page assessments).
pub struct ResultCache {
    cache: Cache<String, Arc<ThreatAssessment>>,
}

impl ResultCache {
    /// Creates a new `ResultCache`.
    ///
    /// # Arguments
    /// * `ttl` - The time-to-live for an entry in the cache.
    /// * `max_capacity` - The maximum number of entries in the cache.
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self { cache }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ThreatAssessment>> {
        self.cache.get(&Self::generate_key(key))
    }

    pub fn insert(&self, key: &str, assessment: ThreatAssessment) -> Arc<ThreatAssessment> {
        let assessment = Arc::new(assessment);
        self.cache.insert(Self::generate_key(key), assessment.clone());
        metrics::gauge!("result_cache_entries").set(self.cache.entry_count() as f64);
        assessment
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        // moka updates its counters lazily; force pending work first.
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    fn generate_key(key: &str) -> String {
        blake3::hash(key.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ThreatAssessment;

    fn assessment(url: &str) -> ThreatAssessment {
        ThreatAssessment::neutral(url, "example.com", None)
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResultCache::new(Duration::from_secs(10), 100);
        assert!(cache.get("https://example.com/").is_none());

        cache.insert("https://example.com/", assessment("https://example.com/"));
        let hit = cache.get("https://example.com/").unwrap();
        assert_eq!(hit.url, "https://example.com/");
    }

    #[test]
    fn keys_do_not_collide() {
        let cache = ResultCache::new(Duration::from_secs(10), 100);
        cache.insert("https://a.example/", assessment("https://a.example/"));
        assert!(cache.get("https://b.example/").is_none());
    }

    #[test]
    fn entries_expire() {
        let cache = ResultCache::new(Duration::from_millis(20), 100);
        cache.insert("https://example.com/", assessment("https://example.com/"));
        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get("https://example.com/").is_none());
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let cache = ResultCache::new(Duration::from_secs(10), 100);
        cache.insert("https://example.com/", assessment("https://example.com/"));
        cache.invalidate_all();
        assert!(cache.get("https://example.com/").is_none());
        assert_eq!(cache.entry_count(), 0);
    }
}
