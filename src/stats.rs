//! Lifetime analysis counters with periodic JSON persistence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::interval;

/// Monotonic counters accumulated across the process lifetime. Loaded
/// from disk at startup so restarts do not reset totals.
#[derive(Debug, Default)]
pub struct Stats {
    urls_analyzed: AtomicU64,
    pages_analyzed: AtomicU64,
    threats_blocked: AtomicU64,
    phishing_detected: AtomicU64,
    content_blocked: AtomicU64,
    trackers_detected: AtomicU64,
    cache_hits: AtomicU64,
}

/// Point-in-time copy of the counters, also the on-disk format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatsSnapshot {
    pub urls_analyzed: u64,
    pub pages_analyzed: u64,
    pub threats_blocked: u64,
    pub phishing_detected: u64,
    pub content_blocked: u64,
    pub trackers_detected: u64,
    pub cache_hits: u64,
}

impl Stats {
    /// Loads persisted counters from `path`. Missing file starts at zero.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let snapshot = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("invalid stats file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatsSnapshot::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read stats {}", path.display()))
            }
        };
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn from_snapshot(s: &StatsSnapshot) -> Self {
        Self {
            urls_analyzed: AtomicU64::new(s.urls_analyzed),
            pages_analyzed: AtomicU64::new(s.pages_analyzed),
            threats_blocked: AtomicU64::new(s.threats_blocked),
            phishing_detected: AtomicU64::new(s.phishing_detected),
            content_blocked: AtomicU64::new(s.content_blocked),
            trackers_detected: AtomicU64::new(s.trackers_detected),
            cache_hits: AtomicU64::new(s.cache_hits),
        }
    }

    pub fn record_url_analyzed(&self) {
        self.urls_analyzed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("urls_analyzed").increment(1);
    }

    pub fn record_page_analyzed(&self) {
        self.pages_analyzed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pages_analyzed").increment(1);
    }

    pub fn record_threat_blocked(&self) {
        self.threats_blocked.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("threats_blocked").increment(1);
    }

    pub fn record_phishing(&self) {
        self.phishing_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_content_blocked(&self) {
        self.content_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tracker(&self) {
        self.trackers_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cache_hits").increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            urls_analyzed: self.urls_analyzed.load(Ordering::Relaxed),
            pages_analyzed: self.pages_analyzed.load(Ordering::Relaxed),
            threats_blocked: self.threats_blocked.load(Ordering::Relaxed),
            phishing_detected: self.phishing_detected.load(Ordering::Relaxed),
            content_blocked: self.content_blocked.load(Ordering::Relaxed),
            trackers_detected: self.trackers_detected.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    pub fn persist(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write stats {}", path.display()))
    }
}

/// Persists the counters every `period` until the shutdown signal flips,
/// then writes one final snapshot.
pub async fn run_persister(
    stats: Arc<Stats>,
    path: PathBuf,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = stats.persist(&path) {
                    error!("Failed to persist stats: {e:#}");
                } else {
                    debug!("Persisted stats to {}", path.display());
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    if let Err(e) = stats.persist(&path) {
                        error!("Failed to persist stats at shutdown: {e:#}");
                    }
                    info!("Stats persister stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn counters_survive_a_persist_load_cycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");

        let stats = Stats::default();
        stats.record_url_analyzed();
        stats.record_url_analyzed();
        stats.record_threat_blocked();
        stats.record_cache_hit();
        stats.persist(&path).unwrap();

        let reloaded = Stats::load(&path).unwrap();
        let snap = reloaded.snapshot();
        assert_eq!(snap.urls_analyzed, 2);
        assert_eq!(snap.threats_blocked, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.pages_analyzed, 0);
    }

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let stats = Stats::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn unknown_fields_in_old_files_are_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, r#"{"urlsZZZ": 1, "urls_analyzed": 7}"#).unwrap();
        // Unlisted counters default to zero, unknown keys are ignored.
        let stats = Stats::load(&path).unwrap();
        assert_eq!(stats.snapshot().urls_analyzed, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn persister_writes_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let stats = Arc::new(Stats::default());
        stats.record_page_analyzed();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_persister(
            stats.clone(),
            path.clone(),
            Duration::from_secs(60),
            rx,
        ));
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let reloaded = Stats::load(&path).unwrap();
        assert_eq!(reloaded.snapshot().pages_analyzed, 1);
    }
}
