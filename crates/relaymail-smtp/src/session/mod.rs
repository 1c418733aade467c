//! SMTP protocol session.
//!
//! A [`Session`] owns one connection to a relay from the opening 220 to
//! QUIT. Commands are only accepted in the states where RFC 5321 allows
//! them; anything else fails with [`Error::InvalidState`] before a byte is
//! written.
//!
//! ```text
//! open ──→ Ready ── mail ──→ Mail ── rcpt ──→ Rcpt ── data ──→ Data
//!            ↑                 │                │                │
//!            └──── reset ──────┴────────────────┘    body close ─┘
//!
//! quit / close / I/O error ──→ Closed
//! ```

mod auth;
mod body;

pub use body::BodyWriter;

use crate::command::Command;
use crate::connection::{Connection, TlsParameters, Upgrade};
use crate::error::{Error, Result};
use crate::transcript::Transcript;
use crate::types::{Address, Extensions, Reply, ReplyCode};

/// Client name sent with EHLO/HELO unless configured otherwise.
pub const DEFAULT_CLIENT_NAME: &str = "localhost";

/// Position in the SMTP dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Greeted, no transaction in progress.
    Ready,
    /// MAIL accepted.
    Mail,
    /// At least one RCPT accepted.
    Rcpt,
    /// DATA accepted, body being written.
    Data,
    /// Connection released.
    Closed,
}

/// An SMTP client session over a stream `S`.
#[derive(Debug)]
pub struct Session<S: Upgrade> {
    conn: Option<Connection<S>>,
    transcript: Transcript,
    server_name: String,
    client_name: String,
    encrypted: bool,
    authenticated: bool,
    extensions: Extensions,
    auth_mechanisms: Vec<String>,
    state: SessionState,
}

impl<S: Upgrade> Session<S> {
    /// Opens a session: reads the 220 greeting and sends EHLO (or HELO).
    ///
    /// `server_name` is the relay's host name, used for TLS verification and
    /// by authentication mechanisms.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not greet with 220 or rejects
    /// both EHLO and HELO. The connection is shut down in that case.
    pub async fn open(stream: S, server_name: &str) -> Result<Self> {
        Self::open_with(stream, server_name, DEFAULT_CLIENT_NAME, Transcript::new()).await
    }

    /// Like [`Session::open`], with an explicit client name and a transcript
    /// the caller keeps a handle to.
    ///
    /// # Errors
    ///
    /// Fails without touching the stream if `client_name` is empty or
    /// contains a line break. Otherwise see [`Session::open`].
    pub async fn open_with(
        stream: S,
        server_name: &str,
        client_name: &str,
        transcript: Transcript,
    ) -> Result<Self> {
        if client_name.is_empty() || client_name.contains(['\r', '\n']) {
            return Err(Error::InvalidClientName(client_name.to_string()));
        }

        let encrypted = stream.is_encrypted();
        if let Some(addr) = stream.peer_addr() {
            transcript.note(&format!("Connected to: {addr}"));
        }

        let mut session = Self {
            conn: Some(Connection::new(stream, transcript.clone())),
            transcript,
            server_name: server_name.to_string(),
            client_name: client_name.to_string(),
            encrypted,
            authenticated: false,
            extensions: Extensions::new(),
            auth_mechanisms: Vec::new(),
            state: SessionState::Closed,
        };

        if let Err(e) = session.handshake().await {
            tracing::warn!(?e, server = %session.server_name, "session setup failed");
            session.close().await;
            return Err(e);
        }

        Ok(session)
    }

    async fn handshake(&mut self) -> Result<()> {
        let conn = self.connection()?;
        let greeting = conn.read_reply().await;
        self.check_io(greeting)?.expect(ReplyCode::SERVICE_READY)?;
        self.greet().await
    }

    /// Sends EHLO, falling back to HELO if the server rejects it.
    async fn greet(&mut self) -> Result<()> {
        let ehlo = Command::Ehlo {
            hostname: self.client_name.clone(),
        };
        match self.command(&ehlo).await?.expect(ReplyCode::OK) {
            Ok(reply) => {
                self.extensions = Extensions::from_ehlo(&reply.message);
                self.auth_mechanisms = self.extensions.auth_mechanisms();
            }
            Err(e) => {
                tracing::debug!(?e, "EHLO rejected, trying HELO");
                self.helo().await?;
            }
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn helo(&mut self) -> Result<()> {
        let helo = Command::Helo {
            hostname: self.client_name.clone(),
        };
        self.command(&helo).await?.expect(ReplyCode::OK)?;
        self.extensions = Extensions::new();
        self.auth_mechanisms.clear();
        Ok(())
    }

    /// Upgrades the connection with STARTTLS and greets again.
    ///
    /// Extensions learned before the upgrade are replaced by the ones the
    /// server advertises over the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if STARTTLS was not advertised, an
    /// SMTP error if the server refuses, or a TLS error if the handshake
    /// fails. After a failed handshake the session is closed.
    pub async fn starttls(&mut self, tls: &TlsParameters) -> Result<()> {
        self.require(&[SessionState::Ready], "STARTTLS")?;
        if self.encrypted {
            return Err(Error::InvalidState("already encrypted".to_string()));
        }
        if !self.extensions.contains("STARTTLS") {
            return Err(Error::NotSupported("STARTTLS".to_string()));
        }

        self.command(&Command::StartTls)
            .await?
            .expect(ReplyCode::SERVICE_READY)?;

        let conn = self
            .conn
            .take()
            .ok_or_else(|| Error::InvalidState("connection closed".to_string()))?;
        self.state = SessionState::Closed;

        let (stream, transcript) = conn.into_parts();
        let stream = stream.upgrade(tls).await?;

        self.conn = Some(Connection::new(stream, transcript));
        self.encrypted = true;
        self.state = SessionState::Ready;
        tracing::info!(server = %self.server_name, "TLS established");

        self.greet().await
    }

    /// Asks the server to verify an address with VRFY.
    ///
    /// Success means the server confirmed the address. An error only means
    /// the server declined to confirm it; many servers never do.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 250.
    pub async fn verify(&mut self, address: &str) -> Result<()> {
        self.require(
            &[SessionState::Ready, SessionState::Mail, SessionState::Rcpt],
            "VRFY",
        )?;
        if address.is_empty() || address.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        let cmd = Command::Vrfy {
            address: address.to_string(),
        };
        self.command(&cmd).await?.expect(ReplyCode::OK)?;
        Ok(())
    }

    /// Looks up an extension advertised in the last EHLO reply.
    ///
    /// Returns the parameter string (empty if the server gave none).
    #[must_use]
    pub fn extension(&self, keyword: &str) -> Option<&str> {
        self.extensions.get(keyword)
    }

    /// Maximum message size from the `SIZE` extension.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.max_message_size()
    }

    /// Starts a mail transaction with MAIL FROM.
    ///
    /// Adds `BODY=8BITMIME` when the server advertised 8BITMIME.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 250.
    pub async fn mail(&mut self, from: &Address) -> Result<()> {
        self.require(&[SessionState::Ready], "MAIL")?;

        let cmd = Command::MailFrom {
            from: from.clone(),
            eight_bit_mime: self.extensions.contains("8BITMIME"),
        };
        self.command(&cmd).await?.expect(ReplyCode::OK)?;
        self.state = SessionState::Mail;
        Ok(())
    }

    /// Adds a recipient with RCPT TO.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server replies with a 25x code, or
    /// without sending anything if `to` is the null reverse-path.
    pub async fn rcpt(&mut self, to: &Address) -> Result<()> {
        self.require(&[SessionState::Mail, SessionState::Rcpt], "RCPT")?;
        if to.is_null() {
            return Err(Error::InvalidAddress("null path as recipient".into()));
        }

        let cmd = Command::RcptTo { to: to.clone() };
        self.command(&cmd).await?.expect_family(25)?;
        self.state = SessionState::Rcpt;
        Ok(())
    }

    /// Sends DATA and returns a writer for the message body.
    ///
    /// The transaction completes when [`BodyWriter::close`] succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 354.
    pub async fn data(&mut self) -> Result<BodyWriter<'_, S>> {
        self.require(&[SessionState::Rcpt], "DATA")?;

        self.command(&Command::Data)
            .await?
            .expect(ReplyCode::START_DATA)?;
        self.state = SessionState::Data;
        Ok(BodyWriter::new(self))
    }

    /// Aborts the current transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 250.
    pub async fn reset(&mut self) -> Result<()> {
        self.require(
            &[SessionState::Ready, SessionState::Mail, SessionState::Rcpt],
            "RSET",
        )?;

        self.command(&Command::Rset).await?.expect(ReplyCode::OK)?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 250.
    pub async fn noop(&mut self) -> Result<()> {
        self.require(
            &[SessionState::Ready, SessionState::Mail, SessionState::Rcpt],
            "NOOP",
        )?;

        self.command(&Command::Noop).await?.expect(ReplyCode::OK)?;
        Ok(())
    }

    /// Sends QUIT and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not reply 221. The connection
    /// stays open then; use [`Session::close`] to release it.
    pub async fn quit(&mut self) -> Result<()> {
        self.require(
            &[SessionState::Ready, SessionState::Mail, SessionState::Rcpt],
            "QUIT",
        )?;

        self.command(&Command::Quit)
            .await?
            .expect(ReplyCode::CLOSING)?;
        self.close().await;
        Ok(())
    }

    /// Shuts the connection down without QUIT.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take()
            && let Err(e) = conn.shutdown().await
        {
            tracing::debug!(?e, "shutdown failed");
        }
        self.state = SessionState::Closed;
    }

    /// Current dialogue state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if the channel is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Returns true after a successful AUTH exchange.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Host name of the relay.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Name this client greets with.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Extensions from the last greeting.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mechanism names from the `AUTH` extension, in advertised order.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[String] {
        &self.auth_mechanisms
    }

    /// Transcript handle; clones observe the live session.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Gets a reference to the underlying stream, if still open.
    #[must_use]
    pub fn get_ref(&self) -> Option<&S> {
        self.conn.as_ref().map(Connection::get_ref)
    }

    fn require(&self, allowed: &[SessionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{operation} not allowed in {:?} state",
                self.state
            )))
        }
    }

    fn connection(&mut self) -> Result<&mut Connection<S>> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::InvalidState("connection closed".to_string()))
    }

    /// Drops the connection on transport failure; nothing more can be said
    /// on a stream that failed mid-line.
    fn check_io<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && e.is_io()
        {
            self.conn = None;
            self.state = SessionState::Closed;
        }
        result
    }

    async fn command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::debug!(command = cmd.verb(), "sending");
        let result = self.connection()?.command(cmd).await;
        let reply = self.check_io(result)?;
        if !reply.is_success() && !reply.code.is_intermediate() {
            tracing::warn!(
                command = cmd.verb(),
                code = reply.code.as_u16(),
                "command rejected"
            );
        }
        Ok(reply)
    }
}
