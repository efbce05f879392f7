//! Identity resolution between canonical URIs and local entities.
//!
//! The engine never builds URIs or looks up posts itself; it goes through an
//! [`IdentityResolver`]. [`InMemoryDirectory`] is a complete implementation
//! backed by hash maps, used by the demo and the test-suite.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::policy::{QuoteApprovalPolicy, QuoteRelation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub username: String,
    /// `None` for local accounts.
    pub domain: Option<String>,
    /// Canonical URI as published by the origin server, remote accounts only.
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub account_id: String,
    pub silent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: String,
    pub account_id: String,
    /// Canonical URI as published by the origin server, remote statuses only.
    pub uri: Option<String>,
    pub content: String,
    pub mentions: Vec<Mention>,
    pub quote_approval_policy: Option<QuoteApprovalPolicy>,
}

impl Account {
    pub fn local(id: &str, username: &str) -> Self {
        Self {
            id: id.to_owned(),
            username: username.to_owned(),
            domain: None,
            uri: None,
        }
    }

    pub fn remote(id: &str, username: &str, domain: &str, uri: &str) -> Self {
        Self {
            id: id.to_owned(),
            username: username.to_owned(),
            domain: Some(domain.to_owned()),
            uri: Some(uri.to_owned()),
        }
    }

    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    /// `username` for local accounts, `username@domain` otherwise
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.username, domain),
            None => self.username.clone(),
        }
    }
}

impl Status {
    pub fn new(id: &str, account_id: &str, content: &str) -> Self {
        Self {
            id: id.to_owned(),
            account_id: account_id.to_owned(),
            uri: None,
            content: content.to_owned(),
            mentions: vec![],
            quote_approval_policy: None,
        }
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_owned());
        self
    }

    pub fn mentioning(mut self, account_id: &str, silent: bool) -> Self {
        self.mentions.push(Mention {
            account_id: account_id.to_owned(),
            silent,
        });
        self
    }

    pub fn with_policy(mut self, policy: QuoteApprovalPolicy) -> Self {
        self.quote_approval_policy = Some(policy);
        self
    }

    /// Silent mentions don't count.
    pub fn actively_mentions(&self, account_id: &str) -> bool {
        self.mentions
            .iter()
            .any(|mention| !mention.silent && mention.account_id == account_id)
    }

    pub fn relation_to(&self, account_id: &str) -> QuoteRelation {
        QuoteRelation {
            is_author: self.account_id == account_id,
            is_actively_mentioned: self.actively_mentions(account_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Status,
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Status(Status),
    Account(Account),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Local lookup by id.
    fn status(&self, id: &str) -> Option<Status>;

    /// Local lookup by id.
    fn account(&self, id: &str) -> Option<Account>;

    /// Canonical URI used for cross-server equality.
    fn status_uri(&self, status: &Status) -> String;

    /// Canonical URI used for cross-server equality.
    fn account_uri(&self, account: &Account) -> String;

    /// Map a canonical URI to a local entity of the expected kind, importing
    /// it when the implementation is able to.
    async fn resolve_uri(&self, uri: &str, kind: EntityKind) -> anyhow::Result<Option<Entity>>;
}

#[derive(Default)]
struct Entries {
    accounts: HashMap<String, Account>,
    statuses: HashMap<String, Status>,
    // remote posts that resolve_uri may import, keyed by canonical uri
    importable: HashMap<String, (Status, Account)>,
}

pub struct InMemoryDirectory {
    local_domain: String,
    entries: RwLock<Entries>,
}

impl InMemoryDirectory {
    pub fn new(local_domain: &str) -> Self {
        Self {
            local_domain: local_domain.to_owned(),
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn local_domain(&self) -> &str {
        &self.local_domain
    }

    pub fn insert_account(&self, account: Account) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.accounts.insert(account.id.clone(), account);
    }

    pub fn insert_status(&self, status: Status) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.statuses.insert(status.id.clone(), status);
    }

    /// Make a remote post available to `resolve_uri` without it being local yet.
    pub fn stage_remote_status(&self, status: Status, author: Account) {
        let uri = self.status_uri(&status);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.importable.insert(uri, (status, author));
    }

    fn find_local(&self, uri: &str, kind: EntityKind) -> Option<Entity> {
        // snapshot first, status_uri takes the lock again
        match kind {
            EntityKind::Status => {
                let statuses: Vec<Status> = {
                    let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
                    entries.statuses.values().cloned().collect()
                };
                statuses
                    .into_iter()
                    .find(|status| self.status_uri(status) == uri)
                    .map(Entity::Status)
            }
            EntityKind::Account => {
                let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
                entries
                    .accounts
                    .values()
                    .find(|account| self.account_uri(account) == uri)
                    .cloned()
                    .map(Entity::Account)
            }
        }
    }

    fn import(&self, uri: &str) -> Option<Status> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let (status, author) = entries.importable.remove(uri)?;
        entries
            .accounts
            .entry(author.id.clone())
            .or_insert(author);
        entries.statuses.insert(status.id.clone(), status.clone());
        Some(status)
    }
}

#[async_trait]
impl IdentityResolver for InMemoryDirectory {
    fn status(&self, id: &str) -> Option<Status> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.statuses.get(id).cloned()
    }

    fn account(&self, id: &str) -> Option<Account> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.accounts.get(id).cloned()
    }

    fn status_uri(&self, status: &Status) -> String {
        if let Some(uri) = &status.uri {
            return uri.clone();
        }

        let username = self
            .account(&status.account_id)
            .map(|account| account.username)
            .unwrap_or_else(|| status.account_id.clone());
        format!(
            "https://{}/users/{}/statuses/{}",
            self.local_domain, username, status.id
        )
    }

    fn account_uri(&self, account: &Account) -> String {
        match &account.uri {
            Some(uri) => uri.clone(),
            None => format!("https://{}/users/{}", self.local_domain, account.username),
        }
    }

    async fn resolve_uri(&self, uri: &str, kind: EntityKind) -> anyhow::Result<Option<Entity>> {
        if let Some(entity) = self.find_local(uri, kind) {
            return Ok(Some(entity));
        }
        if kind == EntityKind::Status {
            if let Some(status) = self.import(uri) {
                debug!(uri = %uri, status_id = %status.id, "imported remote status");
                return Ok(Some(Entity::Status(status)));
            }
        }
        Ok(None)
    }
}
