use std::io;

use thiserror::Error;

/// Errors raised while collecting counters or talking to a remote agent.
///
/// None of these are fatal to the agent: the sampler downgrades them to a
/// defaulted field and the server keeps serving.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed {table}: {detail}")]
    Parse { table: &'static str, detail: String },

    #[error("{0} is not available on this host")]
    Unavailable(&'static str),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse(table: &'static str, detail: impl Into<String>) -> Self {
        Error::Parse {
            table,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
