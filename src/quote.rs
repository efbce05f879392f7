//! Quote records and their approval state
use super::error::QuoteError;
use super::transition::{Transition, TransitionReason};
use super::utils;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum QuoteState {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
}

impl QuoteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteState::Pending => "pending",
            QuoteState::Accepted => "accepted",
            QuoteState::Rejected => "rejected",
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// A claim that the quoting post `status_id` quotes `quoted_status_id`.
///
/// State only moves through [`crate::service::VerifyQuoteService`]; the
/// mutators are crate-private.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    #[n(0)]
    id: String, // bech32 encoded uuid7
    #[n(1)]
    status_id: String,
    #[n(2)]
    account_id: String,
    #[n(3)]
    quoted_status_id: Option<String>,
    #[n(4)]
    quoted_account_id: Option<String>,
    #[n(5)]
    approval_uri: Option<String>,
    #[n(6)]
    state: QuoteState,
    #[n(7)]
    created_at: TimeStamp<Utc>,
    #[n(8)]
    updated_at: TimeStamp<Utc>,
    #[n(9)]
    transitions: Vec<Transition>,
}

impl Quote {
    /// Start a draft, finalised with [`QuoteDraft::finalise`]
    pub fn draft() -> QuoteDraft {
        QuoteDraft {
            status_id: None,
            account_id: None,
            quoted_status_id: None,
            quoted_account_id: None,
            approval_uri: None,
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn status_id(&self) -> &str {
        &self.status_id
    }
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
    pub fn quoted_status_id(&self) -> Option<&str> {
        self.quoted_status_id.as_deref()
    }
    pub fn quoted_account_id(&self) -> Option<&str> {
        self.quoted_account_id.as_deref()
    }
    pub fn approval_uri(&self) -> Option<&str> {
        self.approval_uri.as_deref()
    }
    pub fn state(&self) -> QuoteState {
        self.state
    }
    pub fn is_pending(&self) -> bool {
        self.state == QuoteState::Pending
    }
    pub fn created_at(&self) -> &TimeStamp<Utc> {
        &self.created_at
    }
    pub fn updated_at(&self) -> &TimeStamp<Utc> {
        &self.updated_at
    }
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub(crate) fn attach_quoted_status(&mut self, status_id: String, account_id: String) {
        self.quoted_status_id = Some(status_id);
        self.quoted_account_id = Some(account_id);
        self.updated_at = TimeStamp::new();
    }

    /// Returns false when the quote was already accepted.
    pub(crate) fn accept(&mut self, reason: TransitionReason) -> bool {
        self.transition(QuoteState::Accepted, reason)
    }

    /// Returns false when the quote was already rejected.
    pub(crate) fn reject(&mut self, reason: TransitionReason) -> bool {
        self.transition(QuoteState::Rejected, reason)
    }

    fn transition(&mut self, state: QuoteState, reason: TransitionReason) -> bool {
        if self.state == state {
            return false;
        }

        let at = TimeStamp::new();
        self.transitions
            .push(Transition::new(state, reason, at.clone()));
        self.state = state;
        self.updated_at = at;
        true
    }
}

// Used for constructing quotes at ingestion or local creation
#[derive(Debug)]
pub struct QuoteDraft {
    status_id: Option<String>,
    account_id: Option<String>,
    quoted_status_id: Option<String>,
    quoted_account_id: Option<String>,
    approval_uri: Option<String>,
}

impl QuoteDraft {
    /// The quoting post and its author
    pub fn quoting(mut self, status_id: &str, account_id: &str) -> Self {
        self.status_id = Some(status_id.to_owned());
        self.account_id = Some(account_id.to_owned());
        self
    }
    /// The quoted post and its author, when already known locally
    pub fn quoted(mut self, status_id: &str, account_id: &str) -> Self {
        self.quoted_status_id = Some(status_id.to_owned());
        self.quoted_account_id = Some(account_id.to_owned());
        self
    }
    pub fn set_approval_uri(mut self, uri: &str) -> Self {
        self.approval_uri = Some(uri.to_owned());
        self
    }
    // Checks fields and returns a pending quote with a fresh id
    pub fn finalise(self) -> anyhow::Result<Quote> {
        let Some(status_id) = self.status_id else {
            return Err(QuoteError::MissingQuotingStatus.into());
        };
        let Some(account_id) = self.account_id else {
            return Err(QuoteError::MissingQuotingAccount.into());
        };
        if self.approval_uri.is_none() && self.quoted_status_id.is_none() {
            return Err(QuoteError::NoAuthorizationPath.into());
        }
        if let Some(uri) = &self.approval_uri {
            match url::Url::parse(uri) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => return Err(QuoteError::InvalidApprovalUri(uri.clone()).into()),
            }
        }

        let now = TimeStamp::new();
        Ok(Quote {
            id: utils::new_uuid_to_bech32("quote_")?,
            status_id,
            account_id,
            quoted_status_id: self.quoted_status_id,
            quoted_account_id: self.quoted_account_id,
            approval_uri: self.approval_uri,
            state: QuoteState::Pending,
            created_at: now.clone(),
            updated_at: now,
            transitions: vec![],
        })
    }
}
