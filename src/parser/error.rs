use thiserror::Error;

/// Longest scheme echoed back in an [`ParseError::UnsupportedProtocol`].
const SCHEME_ECHO_LIMIT: usize = 16;

/// Reasons a single share link could not be turned into a node.
///
/// These are local to one link: callers log and skip, never abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),
}

impl ParseError {
    pub(crate) fn unsupported(link: &str) -> Self {
        let scheme = link.split("://").next().unwrap_or_default();
        let scheme: String = scheme.chars().take(SCHEME_ECHO_LIMIT).collect();
        ParseError::UnsupportedProtocol(scheme)
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ParseError::MalformedPayload(msg.into())
    }

    pub(crate) fn missing(msg: impl Into<String>) -> Self {
        ParseError::MissingCredential(msg.into())
    }
}
