//! Quote approval policies attached to quoted posts

use serde::{Deserialize, Serialize};

/// Locally decidable grounds for authorizing a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastTrackRule {
    SelfQuote,
    Mentioned,
}

/// What the engine knows locally about the quoting account's relation to
/// the quoted post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteRelation {
    pub is_author: bool,
    pub is_actively_mentioned: bool,
}

/// Who the quoted post's author allows to quote it.
///
/// Stored as an integer column on the status, see [`QuoteApprovalPolicy::code`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteApprovalPolicy {
    #[default]
    Public,
    Followers,
    MentionedOnly,
    Nobody,
}

impl QuoteApprovalPolicy {
    pub fn code(&self) -> i32 {
        match self {
            QuoteApprovalPolicy::Public => 0,
            QuoteApprovalPolicy::Followers => 1,
            QuoteApprovalPolicy::MentionedOnly => 2,
            QuoteApprovalPolicy::Nobody => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(QuoteApprovalPolicy::Public),
            1 => Some(QuoteApprovalPolicy::Followers),
            2 => Some(QuoteApprovalPolicy::MentionedOnly),
            3 => Some(QuoteApprovalPolicy::Nobody),
            _ => None,
        }
    }

    /// The rule, if any, under which this policy lets the quote through
    /// without a remote proof. Rules are tried in order, first match wins.
    ///
    /// Authors may always quote themselves and mentioned accounts may always
    /// quote the post mentioning them, whatever the policy says.
    pub fn grants(&self, relation: &QuoteRelation) -> Option<FastTrackRule> {
        let rules: &[FastTrackRule] = match self {
            QuoteApprovalPolicy::Public
            | QuoteApprovalPolicy::Followers
            | QuoteApprovalPolicy::MentionedOnly
            | QuoteApprovalPolicy::Nobody => &[FastTrackRule::SelfQuote, FastTrackRule::Mentioned],
        };

        rules.iter().copied().find(|rule| match rule {
            FastTrackRule::SelfQuote => relation.is_author,
            FastTrackRule::Mentioned => relation.is_actively_mentioned,
        })
    }
}
