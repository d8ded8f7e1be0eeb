//! ThreatWatch - URL and page threat scoring.
//!
//! Scores URLs (and optionally collected page snapshots) against the full
//! detector suite and prints one assessment per input.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use threatwatch::{
    analyzer::ThreatAnalyzer,
    cli::Cli,
    config::Config,
    core::PageData,
    formatting::{JsonFormatter, PlainTextFormatter, TextFormatter},
    reputation,
    stats::{self, Stats},
    whitelist::Whitelist,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment,
    // and CLI args.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("threatwatch.toml"));
    let config = Config::load(&config_path.display().to_string(), cli.clone()).unwrap_or_else(|err| {
        // Manually initialize logger for this specific error
        env_logger::init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("ThreatWatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    if let Some(dir) = &config.data_dir {
        info!("Data Overrides: {}", dir.display());
    } else {
        info!("Data Overrides: Not configured (embedded datasets)");
    }
    info!("URL Cache: {} entries, {}s TTL", config.cache.url_capacity, config.cache.url_ttl_seconds);
    info!(
        "Page Cache: {} entries, {}s TTL",
        config.cache.page_capacity, config.cache.page_ttl_seconds
    );
    info!("Phishing Detection: {}", config.settings.phishing_detection);
    info!("Tracker Detection: {}", config.settings.tracker_detection);
    info!("Content Filtering: {}", config.settings.content_filtering);
    info!("-------------------------------------------------------");

    let data = reputation::load(config.data_dir.as_deref())?;

    let whitelist_path = config
        .whitelist_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("whitelist.json"));
    let whitelist = Whitelist::load(&whitelist_path)?;

    let stats_handle = match &config.stats.path {
        Some(path) => Arc::new(Stats::load(path)?),
        None => Arc::new(Stats::default()),
    };

    let analyzer = ThreatAnalyzer::new(
        Arc::new(data),
        config.settings.clone(),
        &config.cache,
        whitelist,
        stats_handle.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let persister = config.stats.path.clone().map(|path| {
        tokio::spawn(stats::run_persister(
            stats_handle.clone(),
            path,
            Duration::from_secs(config.stats.persist_interval_seconds),
            shutdown_rx,
        ))
    });

    let formatter: Box<dyn TextFormatter> = if cli.json {
        Box::new(JsonFormatter)
    } else {
        Box::new(PlainTextFormatter)
    };

    if let Some(page_file) = &cli.page_file {
        let raw = std::fs::read_to_string(page_file)
            .with_context(|| format!("failed to read page file {}", page_file.display()))?;
        let page: PageData = serde_json::from_str(&raw)
            .with_context(|| format!("invalid page snapshot {}", page_file.display()))?;
        let assessment = analyzer.analyze_page(&page);
        println!("{}", formatter.format_batch(&[assessment.as_ref()]));
    } else {
        let urls = gather_urls(&cli)?;
        let assessments: Vec<_> = urls.iter().map(|u| analyzer.analyze_url(u)).collect();
        let refs: Vec<&threatwatch::ThreatAssessment> =
            assessments.iter().map(|a| a.as_ref()).collect();
        println!("{}", formatter.format_batch(&refs));
    }

    let snapshot = analyzer.stats();
    info!(
        "Analyzed {} URLs, {} pages ({} blocked)",
        snapshot.urls_analyzed, snapshot.pages_analyzed, snapshot.threats_blocked
    );

    if let Some(handle) = persister {
        let _ = shutdown_tx.send(true);
        handle.await?;
    }

    Ok(())
}

/// URLs from the command line, or stdin (one per line) when none are given.
fn gather_urls(cli: &Cli) -> Result<Vec<String>> {
    if !cli.urls.is_empty() {
        return Ok(cli.urls.clone());
    }
    let stdin = std::io::stdin();
    let mut urls = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            urls.push(trimmed.to_string());
        }
    }
    Ok(urls)
}
