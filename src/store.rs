//! sled-backed persistence for quote records
use crate::quote::{Quote, QuoteState};
use std::sync::Arc;

const QUOTES_TREE: &str = "quotes";

#[derive(Clone)]
pub struct QuoteStore {
    quotes: sled::Tree,
}

impl QuoteStore {
    pub fn open(instance: Arc<sled::Db>) -> anyhow::Result<Self> {
        let quotes = instance.open_tree(QUOTES_TREE)?;
        Ok(Self { quotes })
    }

    /// Insert a new quote, failing if its id is taken
    pub fn insert(&self, quote: &Quote) -> anyhow::Result<()> {
        let encoded = minicbor::to_vec(quote)?;
        let previous = self.quotes.compare_and_swap(
            quote.id().as_bytes(),
            None as Option<&[u8]>,
            Some(encoded),
        )?;

        if previous.is_err() {
            return Err(anyhow::anyhow!("Quote {} already exists", quote.id()));
        }
        Ok(())
    }

    pub fn load(&self, quote_id: &str) -> anyhow::Result<Option<Quote>> {
        match self.quotes.get(quote_id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the stored record; last writer wins
    pub fn save(&self, quote: &Quote) -> anyhow::Result<()> {
        self.quotes
            .insert(quote.id().as_bytes(), minicbor::to_vec(quote)?)?;
        Ok(())
    }

    /// Quotes currently in `state`, e.g. pending ones for a periodic re-check
    pub fn list_by_state(&self, state: QuoteState) -> anyhow::Result<Vec<Quote>> {
        let mut quotes = vec![];
        for entry in self.quotes.iter() {
            let (_, bytes) = entry?;
            let quote: Quote = minicbor::decode(&bytes)?;
            if quote.state() == state {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.quotes.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> anyhow::Result<(tempfile::TempDir, QuoteStore)> {
        let temp_dir = tempdir()?;
        let db = sled::open(temp_dir.path().join("quotes.db"))?;
        Ok((temp_dir, QuoteStore::open(Arc::new(db))?))
    }

    fn quote() -> Quote {
        Quote::draft()
            .quoting("5", "alice")
            .set_approval_uri("https://remote.example/proof/1")
            .finalise()
            .unwrap()
    }

    #[test]
    fn insert_then_load() -> anyhow::Result<()> {
        let (_dir, store) = store()?;
        let quote = quote();

        store.insert(&quote)?;

        assert_eq!(store.load(quote.id())?, Some(quote));
        assert_eq!(store.load("quote_missing")?, None);
        Ok(())
    }

    #[test]
    fn duplicate_insert_fails() -> anyhow::Result<()> {
        let (_dir, store) = store()?;
        let quote = quote();

        store.insert(&quote)?;
        assert!(store.insert(&quote).is_err());
        Ok(())
    }

    #[test]
    fn list_by_state_filters() -> anyhow::Result<()> {
        let (_dir, store) = store()?;
        let pending = quote();
        let mut accepted = quote();
        accepted.accept(crate::transition::TransitionReason::SelfQuote);

        store.insert(&pending)?;
        store.insert(&accepted)?;

        let listed = store.list_by_state(QuoteState::Pending)?;
        assert_eq!(listed, vec![pending]);
        assert_eq!(store.list_by_state(QuoteState::Accepted)?.len(), 1);
        assert!(store.list_by_state(QuoteState::Rejected)?.is_empty());
        Ok(())
    }
}
