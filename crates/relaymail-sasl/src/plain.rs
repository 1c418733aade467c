//! PLAIN mechanism (RFC 4616).

use crate::{Mechanism, Result, SaslError, ServerCapabilities, Start};

/// PLAIN authentication.
///
/// Sends `authzid\0username\0password` as the initial response. The password
/// travels in the clear, so the mechanism only starts on an encrypted
/// channel to the host the credentials were issued for.
#[derive(Clone)]
pub struct Plain {
    identity: String,
    username: String,
    password: String,
    host: String,
}

impl Plain {
    /// Creates a PLAIN mechanism.
    ///
    /// `identity` is the authorization identity; leave it empty to act as
    /// `username`.
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

impl std::fmt::Debug for Plain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plain")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Refuses cleartext credentials on an unencrypted channel or for a server
/// other than `host`.
pub(crate) fn require_secure_channel(
    mechanism: &str,
    host: &str,
    server: &ServerCapabilities,
) -> Result<()> {
    if !server.encrypted {
        return Err(SaslError::Unencrypted(mechanism.to_string()));
    }
    if server.server_name != host {
        return Err(SaslError::WrongHost {
            expected: host.to_string(),
            actual: server.server_name.clone(),
        });
    }
    Ok(())
}

impl Mechanism for Plain {
    fn name(&self) -> &'static str {
        "PLAIN"
    }

    fn start(&mut self, server: &ServerCapabilities) -> Result<Start> {
        require_secure_channel(self.name(), &self.host, server)?;

        let response = format!("{}\0{}\0{}", self.identity, self.username, self.password);
        Ok(Start {
            mechanism: self.name().to_string(),
            initial_response: Some(response.into_bytes()),
        })
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if more {
            return Err(SaslError::unexpected(self.name(), challenge));
        }
        Ok(None)
    }
}
