use colored::Colorize;
use serde::Serialize;

use crate::{
    batch::BatchReport,
    config::AssetSpec,
    fetcher::{FetchAttempt, FetchError, FetchOutcome},
    source::SourceList,
};

#[derive(Debug, Serialize)]
pub struct AttemptReport {
    pub locator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl From<&FetchAttempt> for AttemptReport {
    fn from(a: &FetchAttempt) -> Self {
        Self {
            locator: a.source.locator.clone(),
            label: a.source.label.clone(),
            status: a.status(),
            bytes: a.bytes,
            error: a.error().map(ToString::to_string),
            elapsed_ms: a.elapsed.as_millis(),
        }
    }
}

/// Machine-readable summary of one asset's fetch.
#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub asset: String,
    pub destination: String,
    pub success: bool,
    pub reused_existing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_file: Option<String>,
    pub attempts: Vec<AttemptReport>,
}

impl FetchReport {
    pub fn new(asset: &str, destination: &std::path::Path, result: &Result<FetchOutcome, FetchError>) -> Self {
        let (attempts, bytes_written, reused, error) = match result {
            Ok(o) => (o.attempts.as_slice(), Some(o.bytes_written), o.reused_existing, None),
            Err(e) => (e.attempts(), None, false, Some(e.to_string())),
        };
        Self {
            asset: asset.to_string(),
            destination: destination.display().to_string(),
            success: result.is_ok(),
            reused_existing: reused,
            bytes_written,
            error,
            stale_file: result.as_ref().err().and_then(FetchError::stale_file).map(|p| p.display().to_string()),
            attempts: attempts.iter().map(AttemptReport::from).collect(),
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> crate::Result<String> { Ok(serde_json::to_string_pretty(value)?) }

pub fn print_outcome(asset: &AssetSpec, result: &Result<FetchOutcome, FetchError>) {
    match result {
        Ok(o) if o.reused_existing => {
            println!("{} {} already present at {} ({} bytes)", "✓".green(), asset.name.bold(), o.destination.display(), o.bytes_written);
        }
        Ok(o) => {
            let from = o.source.as_ref().map(|s| s.to_string()).unwrap_or_default();
            println!("{} {} saved to {} ({} bytes)", "✓".green(), asset.name.bold(), o.destination.display(), o.bytes_written);
            println!("  from {}", from.dimmed());
        }
        Err(e) => {
            println!("{} {}: {}", "✗".red(), asset.name.bold(), e);
            for attempt in e.attempts() { print_attempt(attempt); }
            if matches!(e, FetchError::AllSourcesExhausted { .. }) { print_remediation(asset, e.stale_file()); }
        }
    }
}

fn print_attempt(attempt: &FetchAttempt) {
    let status = match attempt.status() {
        "accepted" => "accepted".green(),
        "rejected" => "rejected".yellow(),
        other => other.red(),
    };
    let detail = attempt.error().map(|e| e.to_string()).unwrap_or_default();
    println!("  {:>8}  {}  {}", status, attempt.source.locator, detail.dimmed());
}

fn print_remediation(asset: &AssetSpec, stale_file: Option<&std::path::Path>) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("Could not automatically download {}.", asset.name);
    println!("Download it manually and place it at {}", asset.destination.display());
    if let Some(path) = stale_file {
        println!("{} {} already exists but fails the size/format checks; it was left in place.", "!".yellow(), path.display());
    }
    if !asset.remediation.is_empty() {
        println!("\nKnown sources:");
        for (i, hint) in asset.remediation.iter().enumerate() {
            println!("  {}. {}", i + 1, hint);
        }
    }
    println!("{}", rule);
}

pub fn print_sources(asset: &AssetSpec, sources: &SourceList) {
    println!("{} ({} sources, accept > {} bytes) -> {}", asset.name.bold(), sources.len(), asset.min_bytes, asset.destination.display());
    for (i, source) in sources.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, source);
    }
}

pub fn print_batch(report: &BatchReport, assets: &[AssetSpec]) {
    for entry in &report.entries {
        if let Some(asset) = assets.iter().find(|a| a.name == entry.asset) {
            print_outcome(asset, &entry.result);
        }
    }
    println!("\n{} of {} assets downloaded", report.succeeded(), report.entries.len());
    let files = report.listing();
    if !files.is_empty() {
        println!("Files:");
        for (path, len) in files {
            println!("  - {}: {} bytes", path.display(), len);
        }
    }
}
