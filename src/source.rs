use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

/// One candidate location for an asset. Locators are opaque to the fetcher;
/// the transport decides how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(alias = "url")]
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Source {
    pub fn new(locator: impl Into<String>) -> Self { Self { locator: locator.into(), label: None } }

    pub fn labeled(locator: impl Into<String>, label: impl Into<String>) -> Self {
        Self { locator: locator.into(), label: Some(label.into()) }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} [{}]", self.locator, label),
            None => f.write_str(&self.locator),
        }
    }
}

/// A file inside a GitHub repository whose default branch is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubCandidate {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl GithubCandidate {
    /// Raw-content URLs for `master` and `main`, then the `github.com/.../raw/`
    /// redirect form for both branches.
    pub fn expand(&self) -> Vec<Source> {
        let (owner, repo) = (&self.owner, &self.repo);
        let path = self.path.trim_start_matches('/');
        let label = format!("{}/{}", owner, repo);
        ["master", "main"]
            .iter()
            .map(|branch| format!("https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{path}"))
            .chain(["master", "main"].iter().map(|branch| format!("https://github.com/{owner}/{repo}/raw/{branch}/{path}")))
            .map(|url| Source::labeled(url, label.clone()))
            .collect()
    }
}

/// Ordered, duplicate-free list of sources. Order is preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    sources: Vec<Source>,
}

impl SourceList {
    pub fn new() -> Self { Self::default() }

    /// Appends a source unless its locator is already present. Returns whether it was added.
    pub fn push(&mut self, source: Source) -> bool {
        if self.sources.iter().any(|s| s.locator == source.locator) {
            return false;
        }
        self.sources.push(source);
        true
    }

    pub fn extend_github(&mut self, candidates: &[GithubCandidate]) {
        for candidate in candidates {
            for source in candidate.expand() { self.push(source); }
        }
    }

    pub fn len(&self) -> usize { self.sources.len() }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, Source> { self.sources.iter() }

    pub fn as_slice(&self) -> &[Source] { &self.sources }
}

impl FromIterator<Source> for SourceList {
    fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
        let mut list = SourceList::new();
        let mut seen = HashSet::new();
        for source in iter {
            if seen.insert(source.locator.clone()) { list.sources.push(source); }
        }
        list
    }
}

impl<'a> IntoIterator for &'a SourceList {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter { self.sources.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_candidate_expands_branches_in_order() {
        let c = GithubCandidate { owner: "acme".into(), repo: "faces".into(), path: "/models/m.tflite".into() };
        let urls: Vec<String> = c.expand().into_iter().map(|s| s.locator).collect();
        assert_eq!(urls, vec![
            "https://raw.githubusercontent.com/acme/faces/master/models/m.tflite",
            "https://raw.githubusercontent.com/acme/faces/main/models/m.tflite",
            "https://github.com/acme/faces/raw/master/models/m.tflite",
            "https://github.com/acme/faces/raw/main/models/m.tflite",
        ]);
        assert!(c.expand().iter().all(|s| s.label.as_deref() == Some("acme/faces")));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let list: SourceList = vec![
            Source::labeled("http://a", "first"),
            Source::new("http://b"),
            Source::labeled("http://a", "second"),
        ].into_iter().collect();
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].label.as_deref(), Some("first"));

        let mut list = list;
        assert!(!list.push(Source::new("http://b")));
        assert!(list.push(Source::new("http://c")));
        assert_eq!(list.iter().map(|s| s.locator.as_str()).collect::<Vec<_>>(), ["http://a", "http://b", "http://c"]);
    }

    #[test]
    fn display_includes_label() {
        assert_eq!(Source::labeled("http://x", "mirror").to_string(), "http://x [mirror]");
        assert_eq!(Source::new("http://x").to_string(), "http://x");
    }
}
