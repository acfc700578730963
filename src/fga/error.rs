use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FgaError {
    /// The HTTP request to the authorization store failed.
    #[error("authorization store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The authorization store answered with a non-success status.
    #[error("authorization store returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The store returned a tuple this bridge cannot interpret.
    #[error("malformed tuple in authorization store: {0}")]
    MalformedTuple(String),
}

pub type FgaResult<T> = Result<T, FgaError>;
