//! Error types for SASL mechanisms.

/// Result type alias for SASL operations.
pub type Result<T> = std::result::Result<T, SaslError>;

/// SASL mechanism errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaslError {
    /// The mechanism would expose credentials on an unencrypted channel.
    #[error("{0} requires an encrypted connection")]
    Unencrypted(String),

    /// Credentials were issued for a different server.
    #[error("wrong host name: expected {expected}, connected to {actual}")]
    WrongHost {
        /// Host the credentials belong to.
        expected: String,
        /// Server name of the current session.
        actual: String,
    },

    /// The server sent a challenge the mechanism cannot answer.
    #[error("unexpected server challenge for {mechanism}: {challenge}")]
    UnexpectedChallenge {
        /// Mechanism name.
        mechanism: String,
        /// Challenge text, lossily decoded.
        challenge: String,
    },

    /// The server rejected the credentials during the exchange.
    #[error("authentication rejected: {0}")]
    Rejected(String),
}

impl SaslError {
    pub(crate) fn unexpected(mechanism: &str, challenge: &[u8]) -> Self {
        Self::UnexpectedChallenge {
            mechanism: mechanism.to_string(),
            challenge: String::from_utf8_lossy(challenge).into_owned(),
        }
    }
}
