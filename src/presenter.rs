//! REST projection of a quote
use serde::Serialize;

use crate::quote::{Quote, QuoteState};
use crate::resolver::{Account, IdentityResolver, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub id: String,
    pub uri: String,
    pub content: String,
    pub account: Option<AccountView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteView {
    pub state: QuoteState,
    /// `null` while the quoted post is unknown locally
    pub quoted_status: Option<StatusView>,
}

fn account_view<R: IdentityResolver + ?Sized>(account: &Account, resolver: &R) -> AccountView {
    AccountView {
        id: account.id.clone(),
        username: account.username.clone(),
        acct: account.acct(),
        uri: resolver.account_uri(account),
    }
}

fn status_view<R: IdentityResolver + ?Sized>(status: &Status, resolver: &R) -> StatusView {
    StatusView {
        id: status.id.clone(),
        uri: resolver.status_uri(status),
        content: status.content.clone(),
        account: resolver
            .account(&status.account_id)
            .map(|account| account_view(&account, resolver)),
    }
}

pub fn present<R: IdentityResolver + ?Sized>(quote: &Quote, resolver: &R) -> QuoteView {
    QuoteView {
        state: quote.state(),
        quoted_status: quote
            .quoted_status_id()
            .and_then(|id| resolver.status(id))
            .map(|status| status_view(&status, resolver)),
    }
}
