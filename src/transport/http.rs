use std::{error::Error as _, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    StatusCode,
};

use super::{Payload, Transport, TransportError};
use crate::source::Source;

/// Browser-like identification; some hosts reject requests without one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_ACCEPT: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    pub accept: String,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub insecure_tls: bool,
    pub show_progress: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            insecure_tls: false,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let accept = HeaderValue::from_str(&config.accept).with_context(|| format!("invalid Accept header {:?}", config.accept))?;
        headers.insert(ACCEPT, accept);
        if config.insecure_tls {
            tracing::warn!("TLS certificate verification is disabled; downloads can be tampered with in transit");
        }
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, show_progress: config.show_progress })
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match total {
            Some(len) => {
                let bar = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr());
                let style = ProgressStyle::with_template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            }
            None => {
                let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
                let style = ProgressStyle::with_template("  {spinner} {bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                bar.set_style(style);
                bar
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn retrieve(&self, source: &Source, timeout: Duration) -> Result<Payload, TransportError> {
        let mut resp = self
            .client
            .get(&source.locator)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let total = resp.content_length();
        let bar = self.progress_bar(total);
        let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        while let Some(chunk) = resp.chunk().await.map_err(|e| classify(e, timeout))? {
            bytes.extend_from_slice(&chunk);
            bar.inc(chunk.len() as u64);
        }
        bar.finish_and_clear();
        Ok(Payload { bytes, content_type })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }
    // reqwest's own message hides the cause ("error sending request"); append the chain.
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    TransportError::Network(message)
}
