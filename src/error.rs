#[derive(thiserror::Error, Debug)]
pub enum QuoteError {
    #[error("Quote is missing its quoting post")]
    MissingQuotingStatus,
    #[error("Quote is missing the quoting account")]
    MissingQuotingAccount,
    #[error("Quote has neither an approval uri nor a quoted post to fast-track against")]
    NoAuthorizationPath,
    #[error("Approval uri is not an absolute http(s) uri: {0}")]
    InvalidApprovalUri(String),
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("temporary failure fetching {uri}: {reason}")]
    Temporary { uri: String, reason: String },
    #[error("failed to fetch {uri}: {reason}")]
    Fatal { uri: String, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("Quote {0} does not exist")]
    QuoteNotFound(String),
    #[error("Quote {0} has no approval uri and no quoted post")]
    NoAuthorizationPath(String),
    #[error("{kind} {id} referenced by quote is not known locally")]
    MissingEntity { kind: &'static str, id: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
