//! ThreatWatch - A multi-signal URL and page threat scorer.
//!
//! This library scores URLs and collected page content against lookalike,
//! reputation, and content-heuristic detectors and aggregates the results
//! into a single clamped threat score with a recommendation.

pub mod aggregator;
pub mod analyzer;
pub mod bloom;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod detectors;
pub mod formatting;
pub mod lexical;
pub mod reputation;
pub mod stats;
pub mod whitelist;

// Re-export core types for convenience
pub use self::core::*;

pub use analyzer::ThreatAnalyzer;
