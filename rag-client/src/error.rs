use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-2xx reply; `body` is the raw response text.
    #[error("{status} | {body}")]
    Api { status: StatusCode, body: String },

    #[error("{0}")]
    Usage(String),
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io {
            path: "<stdout>".into(),
            source: e,
        }
    }
}
