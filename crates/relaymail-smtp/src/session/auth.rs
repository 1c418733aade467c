//! SMTP AUTH (RFC 4954) challenge-response loop.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relaymail_sasl::{Mechanism, ServerCapabilities};

use super::{Session, SessionState};
use crate::command::Command;
use crate::connection::Upgrade;
use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

impl<S: Upgrade> Session<S> {
    /// Authenticates with the given mechanism.
    ///
    /// Server challenges (334) are base64 decoded and handed to the
    /// mechanism together with `more = true`; the final 235 text is handed
    /// over with `more = false`. The exchange ends when the mechanism has
    /// nothing more to send.
    ///
    /// On failure the exchange is cancelled with `*`, the session sends QUIT
    /// and the connection is closed. Transport errors close the session
    /// without further traffic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server did not advertise AUTH,
    /// [`Error::Auth`] if the mechanism refused, or the SMTP error for a
    /// rejection such as 535.
    pub async fn auth(&mut self, mut mechanism: Box<dyn Mechanism>) -> Result<()> {
        self.require(&[SessionState::Ready], "AUTH")?;
        if self.authenticated {
            return Err(Error::InvalidState("already authenticated".to_string()));
        }
        if !self.extensions.contains("AUTH") {
            return Err(Error::NotSupported("AUTH".to_string()));
        }

        let server = ServerCapabilities {
            server_name: self.server_name.clone(),
            encrypted: self.encrypted,
            mechanisms: self.auth_mechanisms.clone(),
        };
        let start = match mechanism.start(&server) {
            Ok(start) => start,
            Err(e) => {
                tracing::warn!(?e, mechanism = mechanism.name(), "mechanism refused to start");
                self.abort().await;
                return Err(e.into());
            }
        };

        let name = start.mechanism.clone();
        let cmd = Command::Auth {
            mechanism: start.mechanism,
            initial_response: start.initial_response.map(|r| STANDARD.encode(r)),
        };

        match self.exchange(mechanism.as_mut(), cmd).await {
            Ok(()) => {
                self.authenticated = true;
                tracing::info!(mechanism = %name, "authenticated");
                Ok(())
            }
            Err(e) if e.is_io() => Err(e),
            Err(e) => {
                tracing::warn!(?e, mechanism = %name, "authentication failed");
                self.cancel_auth().await;
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, mechanism: &mut dyn Mechanism, first: Command) -> Result<()> {
        let mut reply = self.command(&first).await?;
        loop {
            match Self::step(mechanism, reply)? {
                None => return Ok(()),
                Some(response) => {
                    let cmd = Command::AuthResponse(STANDARD.encode(response));
                    reply = self.command(&cmd).await?;
                }
            }
        }
    }

    fn step(mechanism: &mut dyn Mechanism, reply: Reply) -> Result<Option<Vec<u8>>> {
        let code = reply.code;
        let (payload, more) = match code {
            ReplyCode::AUTH_CONTINUE => (STANDARD.decode(reply.message_text().trim())?, true),
            ReplyCode::AUTH_SUCCESS => (reply.message_text().into_bytes(), false),
            _ => return Err(reply.into_error()),
        };
        Ok(mechanism.next(&payload, more)?)
    }

    /// Sends `*` to cancel the exchange, then gives up on the session.
    async fn cancel_auth(&mut self) {
        if self.conn.is_none() {
            return;
        }
        match self.command(&Command::AuthCancel).await {
            Ok(reply) if reply.code == ReplyCode::PARAMETER_ERROR => {}
            Ok(reply) => {
                tracing::debug!(code = reply.code.as_u16(), "unexpected reply to AUTH cancel");
            }
            Err(e) => tracing::debug!(?e, "AUTH cancel failed"),
        }
        self.abort().await;
    }

    /// Best-effort QUIT, then close.
    async fn abort(&mut self) {
        if self.conn.is_some()
            && let Err(e) = self.quit().await
        {
            tracing::debug!(?e, "QUIT failed during abort");
        }
        self.close().await;
    }
}
