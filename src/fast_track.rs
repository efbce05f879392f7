//! Locally decidable acceptance that skips the remote proof entirely.
use crate::policy::FastTrackRule;
use crate::quote::Quote;
use crate::resolver::IdentityResolver;
use tracing::debug;

/// The rule under which `quote` can be accepted without fetching anything,
/// evaluated from local relationships only.
///
/// Nothing can be decided until the quoted post is attached. A self quote
/// needs only the attached author, the mention rule needs the post itself.
pub fn try_fast_track<R>(quote: &Quote, resolver: &R) -> Option<FastTrackRule>
where
    R: IdentityResolver + ?Sized,
{
    let quoted_status_id = quote.quoted_status_id()?;
    if quote.quoted_account_id() == Some(quote.account_id()) {
        debug!(quote_id = %quote.id(), rule = ?FastTrackRule::SelfQuote, "quote fast-tracked");
        return Some(FastTrackRule::SelfQuote);
    }

    let Some(quoted_status) = resolver.status(quoted_status_id) else {
        debug!(quote_id = %quote.id(), status_id = %quoted_status_id, "quoted status missing locally");
        return None;
    };

    let mut relation = quoted_status.relation_to(quote.account_id());
    if let Some(quoted_account_id) = quote.quoted_account_id() {
        relation.is_author = quoted_account_id == quote.account_id();
    }

    let rule = quoted_status
        .quote_approval_policy
        .unwrap_or_default()
        .grants(&relation);
    if let Some(rule) = rule {
        debug!(quote_id = %quote.id(), ?rule, "quote fast-tracked");
    }
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::QuoteApprovalPolicy;
    use crate::resolver::{Account, InMemoryDirectory, Status};

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new("local.example");
        directory.insert_account(Account::local("alice", "alice"));
        directory.insert_account(Account::local("bob", "bob"));
        directory.insert_status(Status::new("5", "alice", "quoting"));
        directory
    }

    #[test]
    fn unresolved_target_never_fast_tracks() {
        let directory = directory();
        let quote = Quote::draft()
            .quoting("5", "alice")
            .set_approval_uri("https://remote.example/proof/1")
            .finalise()
            .unwrap();

        assert_eq!(try_fast_track(&quote, &directory), None);
    }

    #[test]
    fn self_quote() {
        let directory = directory();
        directory.insert_status(Status::new("7", "alice", "my own post"));
        let quote = Quote::draft()
            .quoting("5", "alice")
            .quoted("7", "alice")
            .finalise()
            .unwrap();

        assert_eq!(
            try_fast_track(&quote, &directory),
            Some(FastTrackRule::SelfQuote)
        );
    }

    #[test]
    fn active_mention_even_under_nobody_policy() {
        let directory = directory();
        directory.insert_status(
            Status::new("9", "bob", "hey @alice")
                .mentioning("alice", false)
                .with_policy(QuoteApprovalPolicy::Nobody),
        );
        let quote = Quote::draft()
            .quoting("5", "alice")
            .quoted("9", "bob")
            .finalise()
            .unwrap();

        assert_eq!(
            try_fast_track(&quote, &directory),
            Some(FastTrackRule::Mentioned)
        );
    }

    #[test]
    fn silent_mention_does_not_fast_track() {
        let directory = directory();
        directory.insert_status(Status::new("9", "bob", "hey").mentioning("alice", true));
        let quote = Quote::draft()
            .quoting("5", "alice")
            .quoted("9", "bob")
            .finalise()
            .unwrap();

        assert_eq!(try_fast_track(&quote, &directory), None);
    }

    #[test]
    fn self_quote_of_a_post_unknown_locally() {
        let directory = directory();
        let quote = Quote::draft()
            .quoting("5", "alice")
            .quoted("404", "alice")
            .finalise()
            .unwrap();

        assert_eq!(
            try_fast_track(&quote, &directory),
            Some(FastTrackRule::SelfQuote)
        );
    }

    #[test]
    fn mention_needs_the_quoted_post() {
        let directory = directory();
        let quote = Quote::draft()
            .quoting("5", "alice")
            .quoted("404", "bob")
            .finalise()
            .unwrap();

        assert_eq!(try_fast_track(&quote, &directory), None);
    }
}
