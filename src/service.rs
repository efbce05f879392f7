//! Service layer API for quote verification.
//!
//! [`VerifyQuoteService::verify`] decides whether a quote is authorized and is
//! the only way a quote changes state. It reads the stored quote once, walks
//! the checks below without touching storage, and writes the result at most
//! once at the end:
//!
//! 1. fast-track rules (self quote, active mention)
//! 2. no approval uri: nothing more to check
//! 3. obtain the proof, from the pre-fetched body or a fetch on behalf of the
//!    quoting account
//! 4. proof absent: stays pending, or is revoked if it had been accepted
//! 5. envelope checks: issuer authority, type, quoting post
//! 6. opportunistic import of the quoted post, then fast-track again
//! 7. target checks: quoted post, quoted author
//!
//! Failed checks are inconclusive and leave the state alone; the only
//! rejection is revocation in step 4. Callers retry inconclusive quotes later.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::VerifierConfig;
use crate::document::ProofDocument;
use crate::error::{FetchError, VerifyError};
use crate::fast_track::try_fast_track;
use crate::fetcher::DocumentFetcher;
use crate::matcher::{ExpectedTarget, Mismatch, QuoteMatcher};
use crate::policy::FastTrackRule;
use crate::quote::Quote;
use crate::resolver::{Entity, EntityKind, IdentityResolver};
use crate::store::QuoteStore;
use crate::transition::TransitionReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(TransitionReason),
    Rejected(TransitionReason),
    Indeterminate(Inconclusive),
}

/// Why verification could neither confirm nor deny the quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconclusive {
    NoApprovalUri,
    ProofUnavailable,
    TimedOut,
    TemporaryFailure(String),
    Mismatch(Mismatch),
}

#[derive(Debug, Clone)]
pub struct Verification {
    /// The quote as stored after verification.
    pub quote: Quote,
    pub outcome: Outcome,
    /// Whether verification wrote anything back.
    pub persisted: bool,
}

enum ProofLookup {
    Found(ProofDocument),
    Absent,
    Deferred(Inconclusive),
}

pub struct VerifyQuoteService<R, F> {
    store: QuoteStore,
    resolver: Arc<R>,
    fetcher: Arc<F>,
    config: VerifierConfig,
}

fn fast_track_reason(rule: FastTrackRule, after_import: bool) -> TransitionReason {
    match (rule, after_import) {
        (FastTrackRule::SelfQuote, false) => TransitionReason::SelfQuote,
        (FastTrackRule::Mentioned, false) => TransitionReason::Mentioned,
        (FastTrackRule::SelfQuote, true) => TransitionReason::ImportedSelfQuote,
        (FastTrackRule::Mentioned, true) => TransitionReason::ImportedMention,
    }
}

impl<R, F> VerifyQuoteService<R, F>
where
    R: IdentityResolver,
    F: DocumentFetcher,
{
    pub fn new(store: QuoteStore, resolver: Arc<R>, fetcher: Arc<F>, config: VerifierConfig) -> Self {
        Self {
            store,
            resolver,
            fetcher,
            config,
        }
    }

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    /// Verify the stored quote `quote_id`.
    ///
    /// Safe to call repeatedly for the same quote, but not concurrently: the
    /// caller serializes calls per quote.
    #[tracing::instrument(skip_all, fields(quote_id = %quote_id))]
    pub async fn verify(
        &self,
        quote_id: &str,
        expected_quoted_uri: Option<&str>,
        prefetched_body: Option<&[u8]>,
    ) -> Result<Verification, VerifyError> {
        let mut quote = self
            .store
            .load(quote_id)?
            .ok_or_else(|| VerifyError::QuoteNotFound(quote_id.to_owned()))?;
        let loaded = quote.clone();

        let outcome = self
            .evaluate(&mut quote, expected_quoted_uri, prefetched_body)
            .await?;

        match &outcome {
            Outcome::Accepted(reason) => {
                if quote.accept(reason.clone()) {
                    info!(?reason, "quote accepted");
                }
            }
            Outcome::Rejected(reason) => {
                if quote.reject(reason.clone()) {
                    info!(?reason, "quote rejected");
                }
            }
            Outcome::Indeterminate(why) => debug!(?why, "verification inconclusive"),
        }

        let persisted = quote != loaded;
        if persisted {
            self.store.save(&quote)?;
        }

        Ok(Verification {
            quote,
            outcome,
            persisted,
        })
    }

    async fn evaluate(
        &self,
        quote: &mut Quote,
        expected_quoted_uri: Option<&str>,
        prefetched_body: Option<&[u8]>,
    ) -> Result<Outcome, VerifyError> {
        if let Some(rule) = try_fast_track(quote, self.resolver.as_ref()) {
            return Ok(Outcome::Accepted(fast_track_reason(rule, false)));
        }

        let Some(approval_uri) = quote.approval_uri().map(str::to_owned) else {
            if quote.quoted_status_id().is_none() {
                return Err(VerifyError::NoAuthorizationPath(quote.id().to_owned()));
            }
            return Ok(Outcome::Indeterminate(Inconclusive::NoApprovalUri));
        };

        let document = match self.load_proof(quote, &approval_uri, prefetched_body).await? {
            ProofLookup::Found(document) => document,
            ProofLookup::Deferred(why) => return Ok(Outcome::Indeterminate(why)),
            // the proof may not be dereferenceable yet, only an accepted
            // quote losing its proof is rejected
            ProofLookup::Absent if quote.is_pending() => {
                return Ok(Outcome::Indeterminate(Inconclusive::ProofUnavailable));
            }
            ProofLookup::Absent => return Ok(Outcome::Rejected(TransitionReason::Revoked)),
        };

        let quoting_status =
            self.resolver
                .status(quote.status_id())
                .ok_or_else(|| VerifyError::MissingEntity {
                    kind: "status",
                    id: quote.status_id().to_owned(),
                })?;
        let quoting_uri = self.resolver.status_uri(&quoting_status);

        let matcher = QuoteMatcher::new(&self.config.supported_contexts);
        if let Err(mismatch) = matcher.check_envelope(&approval_uri, &document, &quoting_uri) {
            return Ok(Outcome::Indeterminate(Inconclusive::Mismatch(mismatch)));
        }

        if self
            .import_quoted_status(quote, &document, expected_quoted_uri)
            .await
        {
            if let Some(rule) = try_fast_track(quote, self.resolver.as_ref()) {
                return Ok(Outcome::Accepted(fast_track_reason(rule, true)));
            }
        }

        let target = self.expected_target(quote);
        let target = target.as_ref().map(|(status_uri, author_uri)| ExpectedTarget {
            status_uri,
            author_uri,
        });
        if let Err(mismatch) = matcher.check_target(&document, target) {
            return Ok(Outcome::Indeterminate(Inconclusive::Mismatch(mismatch)));
        }

        Ok(Outcome::Accepted(TransitionReason::Proof {
            digest: document.digest()?,
        }))
    }

    async fn load_proof(
        &self,
        quote: &Quote,
        approval_uri: &str,
        prefetched_body: Option<&[u8]>,
    ) -> Result<ProofLookup, VerifyError> {
        let raw = match prefetched_body {
            Some(body) => self.fetcher.parse(body, approval_uri),
            None => {
                let account = self.resolver.account(quote.account_id()).ok_or_else(|| {
                    VerifyError::MissingEntity {
                        kind: "account",
                        id: quote.account_id().to_owned(),
                    }
                })?;
                let fetch = self
                    .fetcher
                    .fetch(approval_uri, &account, self.config.error_policy.into());

                match tokio::time::timeout(self.config.fetch_timeout(), fetch).await {
                    Err(_) => {
                        warn!(uri = %approval_uri, "timed out fetching approval proof");
                        return Ok(ProofLookup::Deferred(Inconclusive::TimedOut));
                    }
                    Ok(Err(FetchError::Temporary { reason, .. })) => {
                        warn!(uri = %approval_uri, %reason, "temporary failure fetching approval proof");
                        return Ok(ProofLookup::Deferred(Inconclusive::TemporaryFailure(reason)));
                    }
                    Ok(Err(err)) => return Err(err.into()),
                    Ok(Ok(raw)) => raw,
                }
            }
        };

        Ok(match raw.and_then(ProofDocument::new) {
            Some(document) => ProofLookup::Found(document),
            None => ProofLookup::Absent,
        })
    }

    /// Attach the quoted post from `expected_quoted_uri` when it isn't known
    /// yet. Returns whether something was attached. Failures are logged and
    /// otherwise ignored.
    async fn import_quoted_status(
        &self,
        quote: &mut Quote,
        document: &ProofDocument,
        expected_quoted_uri: Option<&str>,
    ) -> bool {
        let Some(uri) = expected_quoted_uri else {
            return false;
        };
        if quote.quoted_status_id().is_some() || document.interaction_target() == Some(uri) {
            return false;
        }

        match self.resolver.resolve_uri(uri, EntityKind::Status).await {
            Ok(Some(Entity::Status(status))) => {
                debug!(uri = %uri, status_id = %status.id, "attached quoted status");
                quote.attach_quoted_status(status.id, status.account_id);
                true
            }
            Ok(_) => {
                debug!(uri = %uri, "quoted status could not be resolved");
                false
            }
            Err(err) => {
                warn!(uri = %uri, error = %err, "failed to import quoted status");
                false
            }
        }
    }

    /// Canonical URIs of the quoted post and its author, when both are local.
    fn expected_target(&self, quote: &Quote) -> Option<(String, String)> {
        let status = self.resolver.status(quote.quoted_status_id()?)?;
        let author_id = quote
            .quoted_account_id()
            .map(str::to_owned)
            .unwrap_or_else(|| status.account_id.clone());
        let author = self.resolver.account(&author_id)?;

        Some((
            self.resolver.status_uri(&status),
            self.resolver.account_uri(&author),
        ))
    }
}
