use std::{io, path::{Path, PathBuf}, time::Duration};

use thiserror::Error;

use crate::{policy::Verdict, source::Source, transport::TransportError};

/// Why a single source did not produce the asset. Always recovered by moving
/// on to the next source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("{0}")]
    TransientSource(#[from] TransportError),
    #[error("payload too small: {observed} bytes, need more than {threshold}")]
    PayloadTooSmall { observed: u64, threshold: u64 },
    #[error("payload rejected: {0}")]
    ContentRejected(String),
}

impl AttemptError {
    pub fn from_verdict(verdict: Verdict) -> Option<Self> {
        match verdict {
            Verdict::Accepted => None,
            Verdict::TooSmall { observed, threshold } => Some(Self::PayloadTooSmall { observed, threshold }),
            Verdict::ContentType(ct) => Some(Self::ContentRejected(format!("unexpected content type {ct}"))),
            Verdict::MagicMismatch => Some(Self::ContentRejected("magic bytes do not match".into())),
        }
    }

    pub fn is_rejection(&self) -> bool { !matches!(self, Self::TransientSource(_)) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Accepted,
    Failed(AttemptError),
}

/// Diagnostic record of one try against one source.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub source: Source,
    pub outcome: AttemptOutcome,
    /// Payload length, when one was received.
    pub bytes: Option<u64>,
    pub elapsed: Duration,
}

impl FetchAttempt {
    pub fn is_accepted(&self) -> bool { self.outcome == AttemptOutcome::Accepted }

    pub fn error(&self) -> Option<&AttemptError> {
        match &self.outcome {
            AttemptOutcome::Failed(err) => Some(err),
            AttemptOutcome::Accepted => None,
        }
    }

    /// Short status word for summaries: `accepted`, `rejected` or `failed`.
    pub fn status(&self) -> &'static str {
        match &self.outcome {
            AttemptOutcome::Accepted => "accepted",
            AttemptOutcome::Failed(e) if e.is_rejection() => "rejected",
            AttemptOutcome::Failed(_) => "failed",
        }
    }
}

/// Terminal failure of a whole fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no sources available")]
    NoSourcesAvailable,
    #[error("all {} sources exhausted without an acceptable payload", attempts.len())]
    AllSourcesExhausted {
        attempts: Vec<FetchAttempt>,
        /// A file that was already at the destination, fails the policy, and was left untouched.
        stale_file: Option<PathBuf>,
    },
    #[error("could not write {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub const EXIT_EXHAUSTED: u8 = 1;
    pub const EXIT_NO_SOURCES: u8 = 2;
    pub const EXIT_OTHER: u8 = 3;

    pub fn exit_code(&self) -> u8 {
        match self {
            FetchError::AllSourcesExhausted { .. } => Self::EXIT_EXHAUSTED,
            FetchError::NoSourcesAvailable => Self::EXIT_NO_SOURCES,
            FetchError::Destination { .. } => Self::EXIT_OTHER,
        }
    }

    pub fn stale_file(&self) -> Option<&Path> {
        match self {
            FetchError::AllSourcesExhausted { stale_file, .. } => stale_file.as_deref(),
            _ => None,
        }
    }

    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            FetchError::AllSourcesExhausted { attempts, .. } => attempts,
            _ => &[],
        }
    }
}
