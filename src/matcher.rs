//! Structural matching of a proof document against the quote it should authorize.
//!
//! Matching runs in two stages because the quoted post may only become known
//! locally between them (see the import step in [`crate::service`]):
//! [`QuoteMatcher::check_envelope`] validates who issued the proof and what it
//! is about, [`QuoteMatcher::check_target`] validates what it authorizes.

use crate::document::{ProofDocument, QUOTE_AUTHORIZATION_TYPE, same_authority};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    #[error("proof attributed to {attributed_to:?} is not hosted with {approval_uri}")]
    ForeignAuthority {
        approval_uri: String,
        attributed_to: Option<String>,
    },
    #[error("proof does not declare a supported @context")]
    UnsupportedContext,
    #[error("proof is not a QuoteAuthorization")]
    WrongType,
    #[error("proof authorizes {found:?}, not the quoting post {expected}")]
    QuotingPost {
        expected: String,
        found: Option<String>,
    },
    #[error("quoted post is not known locally")]
    UnresolvedTarget,
    #[error("proof targets {found:?}, not the quoted post {expected}")]
    Target {
        expected: String,
        found: Option<String>,
    },
    #[error("proof is attributed to {found:?}, not the quoted author {expected}")]
    Author {
        expected: String,
        found: Option<String>,
    },
}

/// The quoted post as the proof should name it.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedTarget<'a> {
    pub status_uri: &'a str,
    pub author_uri: &'a str,
}

pub struct QuoteMatcher<'a> {
    supported_contexts: &'a [String],
}

impl<'a> QuoteMatcher<'a> {
    pub fn new(supported_contexts: &'a [String]) -> Self {
        Self { supported_contexts }
    }

    /// Authority, type and quoting post checks, in that order.
    pub fn check_envelope(
        &self,
        approval_uri: &str,
        document: &ProofDocument,
        quoting_status_uri: &str,
    ) -> Result<(), Mismatch> {
        let attributed_to = document.attributed_to();
        if !attributed_to.is_some_and(|author| same_authority(approval_uri, author)) {
            return Err(Mismatch::ForeignAuthority {
                approval_uri: approval_uri.to_owned(),
                attributed_to: attributed_to.map(str::to_owned),
            });
        }

        if !document.has_supported_context(self.supported_contexts) {
            return Err(Mismatch::UnsupportedContext);
        }
        if !document.declares_type(QUOTE_AUTHORIZATION_TYPE) {
            return Err(Mismatch::WrongType);
        }

        let interacting_object = document.interacting_object();
        if interacting_object != Some(quoting_status_uri) {
            return Err(Mismatch::QuotingPost {
                expected: quoting_status_uri.to_owned(),
                found: interacting_object.map(str::to_owned),
            });
        }

        Ok(())
    }

    /// Quoted post and quoted author checks. `target` is `None` while the
    /// quoted post is unknown locally.
    pub fn check_target(
        &self,
        document: &ProofDocument,
        target: Option<ExpectedTarget<'_>>,
    ) -> Result<(), Mismatch> {
        let target = target.ok_or(Mismatch::UnresolvedTarget)?;

        let interaction_target = document.interaction_target();
        if interaction_target != Some(target.status_uri) {
            return Err(Mismatch::Target {
                expected: target.status_uri.to_owned(),
                found: interaction_target.map(str::to_owned),
            });
        }

        let attributed_to = document.attributed_to();
        if attributed_to != Some(target.author_uri) {
            return Err(Mismatch::Author {
                expected: target.author_uri.to_owned(),
                found: attributed_to.map(str::to_owned),
            });
        }

        Ok(())
    }
}
