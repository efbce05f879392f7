//! Shared fixtures: a scripted fetcher and a populated directory over a temp db
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quote_approval::{
    config::VerifierConfig,
    error::FetchError,
    fetcher::{DocumentFetcher, ErrorPolicy, FailureClass},
    quote::Quote,
    resolver::{Account, InMemoryDirectory, Status},
    service::VerifyQuoteService,
    store::QuoteStore,
};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const APPROVAL_URI: &str = "https://remote/proof/1";
pub const QUOTING_URI: &str = "https://local/posts/5";
pub const QUOTED_URI: &str = "https://remote/posts/9";
pub const BOB_URI: &str = "https://remote/users/bob";

#[derive(Clone)]
pub enum Scripted {
    Document(Value),
    Missing,
    Temporary,
    Fatal,
    Hang,
}

/// Answers fetches from a script and counts them.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    fetches: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn respond(&self, uri: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(uri.to_owned(), response);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        uri: &str,
        _on_behalf_of: &Account,
        policy: ErrorPolicy,
    ) -> Result<Option<Value>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .unwrap_or(Scripted::Missing);

        match response {
            Scripted::Document(document) => Ok(Some(document)),
            Scripted::Missing => policy.settle(FailureClass::Permanent, uri, "HTTP 404".into()),
            Scripted::Temporary => policy.settle(FailureClass::Temporary, uri, "HTTP 503".into()),
            Scripted::Fatal => Err(FetchError::Fatal {
                uri: uri.to_owned(),
                reason: "host is gone".into(),
            }),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
        }
    }
}

/// The proof from the reference scenario: bob authorizes local post 5
/// quoting remote post 9. The scenario's document omits `@context`; it is
/// added here because the type check only accepts a supported context.
pub fn proof() -> Value {
    json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": APPROVAL_URI,
        "type": "QuoteAuthorization",
        "attributedTo": BOB_URI,
        "interactingObject": QUOTING_URI,
        "interactionTarget": QUOTED_URI,
    })
}

pub fn proof_with(field: &str, value: Value) -> Value {
    let mut document = proof();
    document[field] = value;
    document
}

pub struct Fixture {
    _temp_dir: TempDir,
    pub directory: Arc<InMemoryDirectory>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub service: VerifyQuoteService<InMemoryDirectory, ScriptedFetcher>,
}

impl Fixture {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(VerifierConfig {
            fetch_timeout_ms: 200,
            ..VerifierConfig::default()
        })
    }

    /// alice is local and authored post 5 (`QUOTING_URI`), bob is on `remote`.
    pub fn with_config(config: VerifierConfig) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let db = sled::open(temp_dir.path().join("quotes.db"))?;
        let store = QuoteStore::open(Arc::new(db))?;

        let directory = Arc::new(InMemoryDirectory::new("local"));
        directory.insert_account(Account::local("alice", "alice"));
        directory.insert_account(Account::remote("bob", "bob", "remote", BOB_URI));
        directory.insert_status(Status::new("5", "alice", "look at this").with_uri(QUOTING_URI));

        let fetcher = Arc::new(ScriptedFetcher::default());
        let service = VerifyQuoteService::new(store, directory.clone(), fetcher.clone(), config);

        Ok(Self {
            _temp_dir: temp_dir,
            directory,
            fetcher,
            service,
        })
    }

    /// Make bob's post 9 local.
    pub fn add_quoted_status(&self) {
        self.directory
            .insert_status(Status::new("9", "bob", "quoted post").with_uri(QUOTED_URI));
    }

    /// Store a pending quote of post 9 by alice's post 5.
    pub fn pending_quote(&self, quoted_known: bool) -> anyhow::Result<Quote> {
        let mut draft = Quote::draft()
            .quoting("5", "alice")
            .set_approval_uri(APPROVAL_URI);
        if quoted_known {
            draft = draft.quoted("9", "bob");
        }
        let quote = draft.finalise()?;
        self.service.store().insert(&quote)?;
        Ok(quote)
    }
}
