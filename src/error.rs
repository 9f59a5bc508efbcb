use std::fmt;

/// Why a page fetch did not produce a usable page.
///
/// None of these are fatal: the engine rolls back and the same page can be
/// requested again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, timeout, or a non-success HTTP status.
    Network(String),
    /// The response body could not be decoded.
    Decode(String),
    /// The server's page is inconsistent with its declared total.
    InvalidPage(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::InvalidPage(_) => "invalid page",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
            Self::InvalidPage(msg) => write!(f, "inconsistent page: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}
