use std::time::Duration;

use serde::Deserialize;

use crate::document::ACTIVITYSTREAMS_CONTEXT;
use crate::fetcher::ErrorPolicy;

/// Fetch failures that surface as errors during verification. Temporary
/// failures always surface, so they can never read as a lost proof.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofErrorPolicy {
    #[default]
    RaiseOnTemporary,
    RaiseOnAll,
}

impl From<ProofErrorPolicy> for ErrorPolicy {
    fn from(policy: ProofErrorPolicy) -> Self {
        match policy {
            ProofErrorPolicy::RaiseOnTemporary => ErrorPolicy::RaiseOnTemporary,
            ProofErrorPolicy::RaiseOnAll => ErrorPolicy::RaiseOnAll,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Upper bound on fetching a proof document. Elapsing is inconclusive.
    pub fetch_timeout_ms: u64,
    pub error_policy: ProofErrorPolicy,
    /// `@context` values the type check accepts.
    pub supported_contexts: Vec<String>,
    /// Sent by the HTTP fetcher, see `HttpFetcherConfig::from`.
    pub user_agent: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            error_policy: ProofErrorPolicy::RaiseOnTemporary,
            supported_contexts: vec![ACTIVITYSTREAMS_CONTEXT.to_owned()],
            user_agent: concat!("quote-approval/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl VerifierConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
