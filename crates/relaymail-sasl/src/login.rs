//! LOGIN mechanism.
//!
//! Obsolete, but still the only password mechanism some providers offer.

use crate::plain::require_secure_channel;
use crate::{Mechanism, Result, SaslError, ServerCapabilities, Start};

const USERNAME_PROMPTS: [&str; 3] = ["username:", "username", "user name"];
const PASSWORD_PROMPTS: [&str; 2] = ["password:", "password"];

/// LOGIN authentication.
#[derive(Clone)]
pub struct Login {
    username: String,
    password: String,
    host: String,
}

impl Login {
    /// Creates a LOGIN mechanism for credentials issued by `host`.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Mechanism for Login {
    fn name(&self) -> &'static str {
        "LOGIN"
    }

    fn start(&mut self, server: &ServerCapabilities) -> Result<Start> {
        require_secure_channel(self.name(), &self.host, server)?;

        Ok(Start {
            mechanism: self.name().to_string(),
            initial_response: None,
        })
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }

        let prompt = String::from_utf8_lossy(challenge).trim().to_ascii_lowercase();
        if USERNAME_PROMPTS.contains(&prompt.as_str()) {
            return Ok(Some(self.username.clone().into_bytes()));
        }
        if PASSWORD_PROMPTS.contains(&prompt.as_str()) {
            return Ok(Some(self.password.clone().into_bytes()));
        }

        Err(SaslError::unexpected(self.name(), challenge))
    }
}
