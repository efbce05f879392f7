//! Verify a remote quote authorization delivered alongside an activity.
//!
//! Run with `RUST_LOG=debug cargo run --example verify_quote`.

use std::sync::Arc;

use quote_approval::{
    config::VerifierConfig,
    fetcher::{HttpFetcher, HttpFetcherConfig},
    presenter::present,
    quote::Quote,
    resolver::{Account, InMemoryDirectory, Status},
    service::VerifyQuoteService,
    store::QuoteStore,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The db is created on temp for simplified cleanup.
    let temp_dir = tempfile::tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("quotes.db"))?);
    let store = QuoteStore::open(db)?;

    let directory = Arc::new(InMemoryDirectory::new("local.example"));
    directory.insert_account(Account::local("alice", "alice"));
    directory.insert_account(Account::remote(
        "bob",
        "bob",
        "remote.example",
        "https://remote.example/users/bob",
    ));
    directory.insert_status(Status::new("5", "alice", "this is worth reading"));
    directory.insert_status(
        Status::new("9", "bob", "a thought").with_uri("https://remote.example/posts/9"),
    );

    let config = VerifierConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(HttpFetcherConfig::from(&config))?);
    let service = VerifyQuoteService::new(store, directory.clone(), fetcher, config);

    let quote = Quote::draft()
        .quoting("5", "alice")
        .quoted("9", "bob")
        .set_approval_uri("https://remote.example/quote_authorizations/1")
        .finalise()?;
    service.store().insert(&quote)?;
    println!("before: {}", serde_json::to_string(&present(&quote, directory.as_ref()))?);

    // the authorization bob's server sent along with the Accept activity
    let body = serde_json::to_vec(&json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": "https://remote.example/quote_authorizations/1",
        "type": "QuoteAuthorization",
        "attributedTo": "https://remote.example/users/bob",
        "interactingObject": "https://local.example/users/alice/statuses/5",
        "interactionTarget": "https://remote.example/posts/9",
    }))?;

    let verification = service
        .verify(quote.id(), Some("https://remote.example/posts/9"), Some(&body))
        .await?;
    println!("outcome: {:?}", verification.outcome);
    println!(
        "after: {}",
        serde_json::to_string_pretty(&present(&verification.quote, directory.as_ref()))?
    );

    service.store().flush()?;
    Ok(())
}
