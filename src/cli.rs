//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using
//! the `clap` crate. These arguments are parsed at startup and then merged
//! with the configuration from the `threatwatch.toml` file and environment
//! variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// A multi-signal URL and page threat scorer.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// URLs to analyze. When empty, URLs are read from stdin, one per line.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Analyze a collected page snapshot (JSON) instead of bare URLs.
    #[arg(long, value_name = "FILE")]
    pub page_file: Option<PathBuf>,

    /// Emit assessments as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,

    /// Directory of reference-data overrides.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to the whitelist file.
    #[arg(long, value_name = "FILE")]
    pub whitelist: Option<PathBuf>,

    /// The logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Disable the phishing-oriented detectors.
    #[arg(long)]
    pub no_phishing: bool,

    /// Disable tracker classification.
    #[arg(long)]
    pub no_trackers: bool,

    /// Disable content-category filtering.
    #[arg(long)]
    pub no_content_filter: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }
        if let Some(dir) = &self.data_dir {
            dict.insert("data_dir".into(), Value::from(dir.display().to_string()));
        }
        if let Some(path) = &self.whitelist {
            dict.insert(
                "whitelist_path".into(),
                Value::from(path.display().to_string()),
            );
        }

        // Absent flags must not override the file or environment layers, so
        // only the explicit disables are inserted.
        let mut settings = Dict::new();
        if self.no_phishing {
            settings.insert("phishing_detection".into(), Value::from(false));
        }
        if self.no_trackers {
            settings.insert("tracker_detection".into(), Value::from(false));
        }
        if self.no_content_filter {
            settings.insert("content_filtering".into(), Value::from(false));
        }
        if !settings.is_empty() {
            dict.insert("settings".into(), Value::from(settings));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
