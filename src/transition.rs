//! Append-only ledger of state transitions recorded on each quote
use super::quote::{QuoteState, TimeStamp};
use chrono::Utc;

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct Transition {
    #[n(0)]
    pub state: QuoteState,
    #[n(1)]
    pub reason: TransitionReason,
    #[n(2)]
    pub at: TimeStamp<Utc>,
}

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub enum TransitionReason {
    #[n(0)]
    SelfQuote,
    #[n(1)]
    Mentioned,
    #[n(2)]
    ImportedSelfQuote,
    #[n(3)]
    ImportedMention,
    #[n(4)]
    Proof {
        #[n(0)]
        digest: String, // sha256 of the proof document
    },
    #[n(5)]
    Revoked,
}

impl Transition {
    pub fn new(state: QuoteState, reason: TransitionReason, at: TimeStamp<Utc>) -> Self {
        Self { state, reason, at }
    }
}
