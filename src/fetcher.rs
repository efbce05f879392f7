//! Retrieval of remote proof documents.
//!
//! The engine asks a [`DocumentFetcher`] either to fetch a URI on behalf of an
//! account or to parse a body that arrived with an inbound activity. Failures
//! are classified as temporary or permanent and the caller's [`ErrorPolicy`]
//! decides which of them surface as errors rather than as an absent document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::VerifierConfig;
use crate::document::body_to_json;
use crate::error::FetchError;
use crate::resolver::Account;

const ACCEPT_HEADER: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying later: timeouts, connection errors, 5xx, 429.
    Temporary,
    /// The document is gone, forbidden or not a document at all.
    Permanent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Every failure reads as an absent document.
    Suppress,
    /// Temporary failures are errors, permanent ones an absent document.
    #[default]
    RaiseOnTemporary,
    /// Every failure is an error.
    RaiseOnAll,
}

impl ErrorPolicy {
    pub fn settle(
        self,
        class: FailureClass,
        uri: &str,
        reason: String,
    ) -> Result<Option<Value>, FetchError> {
        match (self, class) {
            (ErrorPolicy::Suppress, _) | (ErrorPolicy::RaiseOnTemporary, FailureClass::Permanent) => {
                debug!(uri = %uri, reason = %reason, "document unavailable");
                Ok(None)
            }
            (_, FailureClass::Temporary) => Err(FetchError::Temporary {
                uri: uri.to_owned(),
                reason,
            }),
            (ErrorPolicy::RaiseOnAll, FailureClass::Permanent) => Err(FetchError::Fatal {
                uri: uri.to_owned(),
                reason,
            }),
        }
    }
}

pub fn classify_status(status: StatusCode) -> FailureClass {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FailureClass::Temporary
    } else {
        FailureClass::Permanent
    }
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch and authenticate the document at `uri`, requesting it as
    /// `on_behalf_of` since proofs may be access controlled.
    async fn fetch(
        &self,
        uri: &str,
        on_behalf_of: &Account,
        policy: ErrorPolicy,
    ) -> Result<Option<Value>, FetchError>;

    /// Parse a pre-fetched body whose `id` must be `expected_id`.
    fn parse(&self, body: &[u8], expected_id: &str) -> Option<Value> {
        body_to_json(body, Some(expected_id))
    }
}

/// Authenticates outgoing requests as a given account.
pub trait RequestSigner: Send + Sync {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
        uri: &str,
        actor: &Account,
    ) -> anyhow::Result<reqwest::RequestBuilder>;
}

pub struct UnsignedRequests;

impl RequestSigner for UnsignedRequests {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
        _uri: &str,
        _actor: &Account,
    ) -> anyhow::Result<reqwest::RequestBuilder> {
        Ok(request)
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("quote-approval/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl From<&VerifierConfig> for HttpFetcherConfig {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            request_timeout: config.fetch_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

pub struct HttpFetcher<S = UnsignedRequests> {
    client: reqwest::Client,
    signer: S,
}

impl HttpFetcher<UnsignedRequests> {
    pub fn new(config: HttpFetcherConfig) -> anyhow::Result<Self> {
        Self::with_signer(config, UnsignedRequests)
    }
}

impl<S: RequestSigner> HttpFetcher<S> {
    pub fn with_signer(config: HttpFetcherConfig, signer: S) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { client, signer })
    }
}

fn is_json_content(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/activity+json")
                || mime.eq_ignore_ascii_case("application/ld+json")
                || mime.eq_ignore_ascii_case("application/json")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<S: RequestSigner> DocumentFetcher for HttpFetcher<S> {
    async fn fetch(
        &self,
        uri: &str,
        on_behalf_of: &Account,
        policy: ErrorPolicy,
    ) -> Result<Option<Value>, FetchError> {
        let request = self.client.get(uri).header(ACCEPT, ACCEPT_HEADER);
        let request = match self.signer.sign(request, uri, on_behalf_of) {
            Ok(request) => request,
            Err(err) => return policy.settle(FailureClass::Permanent, uri, err.to_string()),
        };

        let response = match request.send().await {
            Ok(response) => response,
            // timeouts, refused connections and resets alike
            Err(err) => return policy.settle(FailureClass::Temporary, uri, err.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return policy.settle(classify_status(status), uri, format!("HTTP {status}"));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if !is_json_content(content_type.as_deref()) {
            return policy.settle(
                FailureClass::Permanent,
                uri,
                format!("unexpected content type {content_type:?}"),
            );
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return policy.settle(FailureClass::Temporary, uri, err.to_string()),
        };

        match body_to_json(&body, Some(uri)) {
            Some(document) => Ok(Some(document)),
            None => policy.settle(
                FailureClass::Permanent,
                uri,
                "body is not a document with the requested id".to_owned(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::NOT_FOUND), FailureClass::Permanent);
        assert_eq!(classify_status(StatusCode::GONE), FailureClass::Permanent);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), FailureClass::Permanent);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), FailureClass::Temporary);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            FailureClass::Temporary
        );
    }

    #[test]
    fn raise_on_temporary_hides_permanent_failures() {
        let policy = ErrorPolicy::RaiseOnTemporary;
        let uri = "https://remote.example/proof/1";

        assert!(matches!(
            policy.settle(FailureClass::Permanent, uri, "HTTP 404".into()),
            Ok(None)
        ));
        assert!(matches!(
            policy.settle(FailureClass::Temporary, uri, "HTTP 503".into()),
            Err(FetchError::Temporary { .. })
        ));
    }

    #[test]
    fn raise_on_all_surfaces_permanent_failures() {
        let result = ErrorPolicy::RaiseOnAll.settle(
            FailureClass::Permanent,
            "https://remote.example/proof/1",
            "HTTP 410".into(),
        );

        assert!(matches!(result, Err(FetchError::Fatal { .. })));
    }

    #[test]
    fn suppress_never_errors() {
        let uri = "https://remote.example/proof/1";

        for class in [FailureClass::Temporary, FailureClass::Permanent] {
            assert!(matches!(
                ErrorPolicy::Suppress.settle(class, uri, "boom".into()),
                Ok(None)
            ));
        }
    }

    #[test]
    fn client_settings_follow_the_verifier_config() {
        let verifier = VerifierConfig {
            fetch_timeout_ms: 750,
            user_agent: "quotes-test/1".to_owned(),
            ..VerifierConfig::default()
        };
        let config = HttpFetcherConfig::from(&verifier);

        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert_eq!(config.user_agent, "quotes-test/1");
    }

    #[test]
    fn json_content_types() {
        assert!(is_json_content(Some("application/activity+json; charset=utf-8")));
        assert!(is_json_content(Some(
            "application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\""
        )));
        assert!(!is_json_content(Some("text/html")));
        assert!(!is_json_content(None));
    }

    #[test]
    fn default_parse_checks_the_document_id() {
        let fetcher = HttpFetcher::new(HttpFetcherConfig::default()).unwrap();
        let body = br#"{"id": "https://remote.example/proof/1"}"#;

        assert!(fetcher.parse(body, "https://remote.example/proof/1").is_some());
        assert!(fetcher.parse(body, "https://remote.example/proof/2").is_none());
    }
}
