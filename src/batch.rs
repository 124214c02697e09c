use std::{collections::BTreeSet, fs, path::PathBuf};

use tracing::info;

use crate::{
    config::AssetSpec,
    fetcher::{AssetFetcher, FetchError, FetchOutcome},
    transport::Transport,
};

#[derive(Debug)]
pub struct BatchEntry {
    pub asset: String,
    pub destination: PathBuf,
    pub result: Result<FetchOutcome, FetchError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize { self.entries.iter().filter(|e| e.result.is_ok()).count() }

    pub fn failed(&self) -> usize { self.entries.len() - self.succeeded() }

    /// Whether the run counts as a success: any asset, or every asset with `require_all`.
    pub fn is_success(&self, require_all: bool) -> bool {
        match (require_all, self.succeeded()) {
            (_, 0) => false,
            (true, _) => self.failed() == 0,
            (false, _) => true,
        }
    }

    /// Process exit status for the run, `0` or [`FetchError::EXIT_EXHAUSTED`].
    pub fn exit_code(&self, require_all: bool) -> u8 {
        if self.is_success(require_all) { 0 } else { FetchError::EXIT_EXHAUSTED }
    }

    /// Regular files in every destination directory touched by the batch, sorted by path.
    pub fn listing(&self) -> Vec<(PathBuf, u64)> {
        let dirs: BTreeSet<PathBuf> = self
            .entries
            .iter()
            .map(|e| match e.destination.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            })
            .collect();
        let mut files = Vec::new();
        for dir in dirs {
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.filter_map(Result::ok) {
                if let Ok(meta) = entry.metadata() {
                    if meta.is_file() { files.push((entry.path(), meta.len())); }
                }
            }
        }
        files.sort();
        files
    }
}

/// Fetches each asset in turn with its own sources, policy and destination.
pub async fn fetch_all<T: Transport>(fetcher: &AssetFetcher<T>, assets: &[AssetSpec]) -> BatchReport {
    let mut report = BatchReport::default();
    for asset in assets {
        info!(asset = %asset.name, "fetching asset");
        let destination = asset.destination();
        let result = fetcher.fetch(&asset.source_list(), &destination, &asset.policy()).await;
        report.entries.push(BatchEntry { asset: asset.name.clone(), destination: asset.destination.clone(), result });
    }
    report
}
