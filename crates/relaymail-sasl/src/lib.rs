//! # relaymail-sasl
//!
//! SASL mechanisms for SMTP AUTH (RFC 4954).
//!
//! A [`Mechanism`] is a short-lived object driving one authentication
//! attempt. The SMTP session calls [`Mechanism::start`] with a
//! [`ServerCapabilities`] snapshot, sends the initial response, and then
//! feeds every server challenge to [`Mechanism::next`] until the mechanism
//! reports that it is done.
//!
//! Implements:
//! - PLAIN (RFC 4616) - username/password, encrypted channels only
//! - LOGIN (draft-murchison-sasl-login) - legacy prompt based exchange
//! - CRAM-MD5 (RFC 2195) - keyed challenge-response
//! - XOAUTH2 (Google/Microsoft proprietary) - `OAuth2` bearer token
//!
//! ## Example
//!
//! ```
//! use relaymail_sasl::{CramMd5, Mechanism, Plain, select_mechanism};
//!
//! let advertised = vec!["CRAM-MD5".to_string(), "LOGIN".to_string()];
//! let candidates: Vec<Box<dyn Mechanism>> = vec![
//!     Box::new(Plain::new("", "user", "secret", "smtp.example.com")),
//!     Box::new(CramMd5::new("user", "secret")),
//! ];
//!
//! let chosen = select_mechanism(&advertised, candidates).unwrap();
//! assert_eq!(chosen.name(), "CRAM-MD5");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cram_md5;
mod error;
mod login;
mod plain;
mod select;
mod xoauth2;

pub use cram_md5::CramMd5;
pub use error::{Result, SaslError};
pub use login::Login;
pub use plain::Plain;
pub use select::select_mechanism;
pub use xoauth2::{OAuthError, XOAuth2};

/// What the server told us about itself, captured when an attempt starts.
///
/// Mechanisms use this to refuse running under insufficient security, for
/// example sending a cleartext password over an unencrypted channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCapabilities {
    /// Server name the client connected to.
    pub server_name: String,
    /// Whether the channel is currently encrypted.
    pub encrypted: bool,
    /// Mechanism names from the `AUTH` extension, in advertised order.
    pub mechanisms: Vec<String>,
}

impl ServerCapabilities {
    /// Returns true if the server advertised the named mechanism.
    ///
    /// Mechanism names are compared case-insensitively.
    #[must_use]
    pub fn advertises(&self, mechanism: &str) -> bool {
        self.mechanisms
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mechanism))
    }
}

/// Result of [`Mechanism::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Start {
    /// Mechanism name sent with the AUTH command.
    pub mechanism: String,
    /// Initial client response, not yet base64 encoded.
    ///
    /// `None` sends `AUTH <mechanism>` with no argument.
    pub initial_response: Option<Vec<u8>>,
}

/// A SASL authentication mechanism.
pub trait Mechanism: Send {
    /// SASL name, as it appears in the server's `AUTH` extension.
    fn name(&self) -> &str;

    /// Whether credentials stay safe from a passive eavesdropper without
    /// transport encryption.
    fn resists_eavesdropping(&self) -> bool {
        false
    }

    /// Begins an attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the mechanism refuses to run against this server,
    /// for example because the channel is not encrypted.
    fn start(&mut self, server: &ServerCapabilities) -> Result<Start>;

    /// Answers a server message.
    ///
    /// `more` is true when the server sent a continuation challenge and
    /// expects another response. Returning `Ok(None)` ends the exchange.
    ///
    /// # Errors
    ///
    /// Returns an error to abort the exchange.
    fn next(&mut self, challenge: &[u8], more: bool) -> Result<Option<Vec<u8>>>;
}

impl std::fmt::Debug for dyn Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mechanism")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
