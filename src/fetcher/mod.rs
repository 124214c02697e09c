use std::{path::PathBuf, time::{Duration, Instant}};

use tracing::{debug, info, warn};

use crate::{
    destination::Destination,
    policy::AcceptancePolicy,
    source::{Source, SourceList},
    transport::{Transport, TransportError},
};

mod attempt;

pub use attempt::{AttemptError, AttemptOutcome, FetchAttempt, FetchError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ATTEMPT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound for a single attempt, not for the whole fetch.
    pub timeout: Duration,
    /// Pause between consecutive attempts.
    pub attempt_delay: Duration,
    /// Keep a destination that already passes the policy instead of downloading again.
    pub reuse_existing: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, attempt_delay: DEFAULT_ATTEMPT_DELAY, reuse_existing: true }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub destination: PathBuf,
    pub bytes_written: u64,
    /// The source that was accepted; `None` when an existing file was reused.
    pub source: Option<Source>,
    pub attempts: Vec<FetchAttempt>,
    pub reused_existing: bool,
}

/// Process exit status for a single fetch: `0` on success, otherwise the error's code.
pub fn exit_code(result: &Result<FetchOutcome, FetchError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}

/// Walks a source list in order and keeps the first payload the policy accepts.
///
/// Each source is tried exactly once per call. Attempts are sequential and the
/// first accepted payload ends the walk.
#[derive(Debug, Clone)]
pub struct AssetFetcher<T> {
    transport: T,
    options: FetchOptions,
}

impl<T: Transport> AssetFetcher<T> {
    pub fn new(transport: T) -> Self { Self { transport, options: FetchOptions::default() } }

    pub fn with_options(transport: T, options: FetchOptions) -> Self { Self { transport, options } }

    pub fn options(&self) -> &FetchOptions { &self.options }

    pub fn transport(&self) -> &T { &self.transport }

    pub async fn fetch(
        &self,
        sources: &SourceList,
        destination: &Destination,
        policy: &AcceptancePolicy,
    ) -> Result<FetchOutcome, FetchError> {
        if sources.is_empty() {
            warn!(destination = %destination.path().display(), "no sources configured");
            return Err(FetchError::NoSourcesAvailable);
        }
        if self.options.reuse_existing {
            if let Some(outcome) = self.reuse_existing(destination, policy)? {
                return Ok(outcome);
            }
        }

        let timeout = self.options.timeout;
        let total = sources.len();
        let mut attempts = Vec::with_capacity(total);
        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.options.attempt_delay.is_zero() {
                tokio::time::sleep(self.options.attempt_delay).await;
            }
            info!(attempt = index + 1, total, "trying {}", source);
            let started = Instant::now();
            let retrieved = match tokio::time::timeout(timeout, self.transport.retrieve(source, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };

            let payload = match retrieved {
                Ok(payload) => payload,
                Err(err) => {
                    match &err {
                        TransportError::NotFound => info!("not found, trying next source"),
                        other => warn!(error = %other, "failed, trying next source"),
                    }
                    attempts.push(FetchAttempt {
                        source: source.clone(),
                        outcome: AttemptOutcome::Failed(err.into()),
                        bytes: None,
                        elapsed: started.elapsed(),
                    });
                    continue;
                }
            };

            let observed = payload.len();
            info!(bytes = observed, "downloaded");
            let verdict = policy.evaluate(&payload.bytes, payload.content_type.as_deref());
            if let Some(rejection) = AttemptError::from_verdict(verdict) {
                warn!(reason = %rejection, "rejected, trying next source");
                attempts.push(FetchAttempt {
                    source: source.clone(),
                    outcome: AttemptOutcome::Failed(rejection),
                    bytes: Some(observed),
                    elapsed: started.elapsed(),
                });
                continue;
            }

            let bytes_written = destination.write_atomic(&payload.bytes).map_err(|e| {
                self.sweep(destination);
                FetchError::Destination { path: destination.path().to_path_buf(), source: e }
            })?;
            attempts.push(FetchAttempt {
                source: source.clone(),
                outcome: AttemptOutcome::Accepted,
                bytes: Some(observed),
                elapsed: started.elapsed(),
            });
            info!(bytes = bytes_written, path = %destination.path().display(), "accepted");
            return Ok(FetchOutcome {
                destination: destination.path().to_path_buf(),
                bytes_written,
                source: Some(source.clone()),
                attempts,
                reused_existing: false,
            });
        }

        self.sweep(destination);
        warn!(tried = attempts.len(), "all sources exhausted");
        let stale_file = self.stale_file(destination, policy);
        Err(FetchError::AllSourcesExhausted { attempts, stale_file })
    }

    /// A pre-existing destination that fails the policy survives exhaustion untouched.
    fn stale_file(&self, destination: &Destination, policy: &AcceptancePolicy) -> Option<PathBuf> {
        let bytes = destination.read_existing().ok().flatten()?;
        if policy.evaluate(&bytes, None).is_accepted() {
            return None;
        }
        warn!(
            path = %destination.path().display(),
            bytes = bytes.len(),
            "existing file fails the policy and was left in place"
        );
        Some(destination.path().to_path_buf())
    }

    fn reuse_existing(&self, destination: &Destination, policy: &AcceptancePolicy) -> Result<Option<FetchOutcome>, FetchError> {
        let existing = destination
            .read_existing()
            .map_err(|e| FetchError::Destination { path: destination.path().to_path_buf(), source: e })?;
        let Some(bytes) = existing else { return Ok(None) };
        // Content type is unknown for a file on disk; size and magic still apply.
        let verdict = policy.evaluate(&bytes, None);
        if !verdict.is_accepted() {
            debug!(?verdict, "existing file does not pass the policy, fetching again");
            return Ok(None);
        }
        info!(path = %destination.path().display(), bytes = bytes.len(), "already present, skipping download");
        Ok(Some(FetchOutcome {
            destination: destination.path().to_path_buf(),
            bytes_written: bytes.len() as u64,
            source: None,
            attempts: Vec::new(),
            reused_existing: true,
        }))
    }

    fn sweep(&self, destination: &Destination) {
        match destination.sweep_temporaries() {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, "removed stray temporary files"),
            Err(e) => warn!(error = %e, "could not clean up temporary files"),
        }
    }
}
