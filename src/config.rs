use std::{collections::HashSet, path::{Path, PathBuf}, time::Duration};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{
    destination::Destination,
    fetcher::{FetchOptions, DEFAULT_ATTEMPT_DELAY, DEFAULT_TIMEOUT},
    policy::{AcceptancePolicy, MagicCheck},
    source::{GithubCandidate, Source, SourceList},
    transport::{http::DEFAULT_USER_AGENT, HttpTransportConfig},
    Result,
};

const EMBEDDED_MANIFEST: &str = include_str!("default_assets.toml");

pub const DEFAULT_MIN_BYTES: u64 = 500_000;

/// Run-wide knobs. Unset values fall back to the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub timeout_secs: Option<u64>,
    pub attempt_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub insecure_tls: Option<bool>,
    pub reuse_existing: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSpec {
    pub name: String,
    pub destination: PathBuf,
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub magic: Option<MagicCheck>,
    #[serde(default, rename = "source")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub github: Vec<GithubCandidate>,
    #[serde(default)]
    pub remediation: Vec<String>,
}

fn default_min_bytes() -> u64 { DEFAULT_MIN_BYTES }

impl AssetSpec {
    /// Direct sources first, then the expanded GitHub candidates.
    pub fn source_list(&self) -> SourceList {
        let mut list: SourceList = self.sources.iter().cloned().collect();
        list.extend_github(&self.github);
        list
    }

    pub fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy { min_bytes: self.min_bytes, content_types: self.content_types.clone(), magic: self.magic.clone() }
    }

    pub fn destination(&self) -> Destination { Destination::new(&self.destination) }

    /// Same asset, saved under `dir` with its original file name.
    pub fn relocated(&self, dir: &Path) -> Self {
        let mut spec = self.clone();
        if let Some(name) = self.destination.file_name() {
            spec.destination = dir.join(name);
        }
        spec
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "asset")]
    pub assets: Vec<AssetSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("loading {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn embedded() -> Result<Self> { Self::parse(EMBEDDED_MANIFEST).context("parsing built-in manifest") }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for asset in &self.assets {
            if asset.name.trim().is_empty() {
                bail!("asset with destination {} has an empty name", asset.destination.display());
            }
            if !names.insert(asset.name.as_str()) {
                bail!("duplicate asset name {:?}", asset.name);
            }
            if asset.destination.file_name().is_none() {
                bail!("asset {:?}: destination {} is not a file path", asset.name, asset.destination.display());
            }
        }
        Ok(())
    }

    /// The named asset, or the first one in the manifest.
    pub fn asset(&self, name: Option<&str>) -> Result<&AssetSpec> {
        match name {
            Some(name) => self
                .assets
                .iter()
                .find(|a| a.name == name)
                .with_context(|| format!("unknown asset {:?} (known: {})", name, self.asset_names().join(", "))),
            None => self.assets.first().context("manifest defines no assets"),
        }
    }

    pub fn asset_names(&self) -> Vec<&str> { self.assets.iter().map(|a| a.name.as_str()).collect() }

    pub fn fetch_options(&self) -> FetchOptions {
        let s = &self.settings;
        FetchOptions {
            timeout: s.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
            attempt_delay: s.attempt_delay_ms.map(Duration::from_millis).unwrap_or(DEFAULT_ATTEMPT_DELAY),
            reuse_existing: s.reuse_existing.unwrap_or(true),
        }
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            user_agent: self.settings.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            insecure_tls: self.settings.insecure_tls.unwrap_or(false),
            ..HttpTransportConfig::default()
        }
    }
}
