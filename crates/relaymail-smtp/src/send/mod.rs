//! One-shot message delivery through a relay.
//!
//! [`send_mail`] and [`send_mail_tls`] dial the relay, negotiate encryption,
//! authenticate when the relay asks for it and run a single mail
//! transaction. Whatever happens, the caller gets the session transcript
//! back together with the first error.

mod config;

pub use config::{Config, ConfigBuilder, Security};

use relaymail_sasl::{Mechanism, select_mechanism};

use crate::connection::{Upgrade, connect, connect_tls};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transcript::Transcript;
use crate::types::Address;

/// Sender and recipients of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    from: Address,
    to: Vec<Address>,
}

impl Envelope {
    /// Creates an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no recipients or one of them is the
    /// null path. The sender may be [`Address::null`].
    pub fn new(from: Address, to: Vec<Address>) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidAddress("no recipients".to_string()));
        }
        if to.iter().any(Address::is_null) {
            return Err(Error::InvalidAddress("null path as recipient".to_string()));
        }
        Ok(Self { from, to })
    }

    /// Envelope sender.
    #[must_use]
    pub const fn sender(&self) -> &Address {
        &self.from
    }

    /// Envelope recipients.
    #[must_use]
    pub fn recipients(&self) -> &[Address] {
        &self.to
    }
}

/// Outcome of a delivery attempt.
#[derive(Debug)]
pub struct Delivery {
    /// Session transcript with credential exchanges redacted.
    pub transcript: Vec<u8>,
    /// First error encountered, if any.
    pub result: Result<()>,
}

impl Delivery {
    /// Returns true if the relay accepted the message.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Transcript as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn transcript_text(&self) -> String {
        String::from_utf8_lossy(&self.transcript).into_owned()
    }
}

/// Sends a message over plain TCP, upgrading with STARTTLS when offered.
///
/// Among `mechanisms`, one that resists eavesdropping is preferred when the
/// relay advertises it; see [`select_mechanism`].
pub async fn send_mail(
    config: &Config,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
) -> Delivery {
    match connect(&config.host, config.port).await {
        Ok(stream) => run(stream, config, true, mechanisms, envelope, body).await,
        Err(e) => dial_failed(e),
    }
}

/// Sends a message over implicit TLS.
pub async fn send_mail_tls(
    config: &Config,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
) -> Delivery {
    let stream = match config.tls_parameters() {
        Ok(tls) => connect_tls(&config.host, config.port, &tls).await,
        Err(e) => Err(e),
    };
    match stream {
        Ok(stream) => run(stream, config, false, mechanisms, envelope, body).await,
        Err(e) => dial_failed(e),
    }
}

/// Sends a message using the security mode from `config`.
pub async fn send(
    config: &Config,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
) -> Delivery {
    match config.security {
        Security::StartTls => send_mail(config, mechanisms, envelope, body).await,
        Security::Implicit => send_mail_tls(config, mechanisms, envelope, body).await,
    }
}

/// Delivers over an already connected stream.
///
/// STARTTLS is negotiated when `config.security` is [`Security::StartTls`]
/// and the stream is not yet encrypted.
pub async fn deliver<S: Upgrade>(
    stream: S,
    config: &Config,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
) -> Delivery {
    let starttls = config.security == Security::StartTls;
    run(stream, config, starttls, mechanisms, envelope, body).await
}

fn dial_failed(e: Error) -> Delivery {
    tracing::warn!(?e, "could not connect to relay");
    Delivery {
        transcript: Vec::new(),
        result: Err(e),
    }
}

async fn run<S: Upgrade>(
    stream: S,
    config: &Config,
    starttls: bool,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
) -> Delivery {
    let transcript = Transcript::new();
    let result = drive(
        stream,
        config,
        starttls,
        mechanisms,
        envelope,
        body,
        transcript.clone(),
    )
    .await;

    match &result {
        Ok(()) => tracing::info!(recipients = envelope.to.len(), "message delivered"),
        Err(e) => tracing::warn!(?e, "delivery failed"),
    }

    Delivery {
        transcript: transcript.into_bytes(),
        result,
    }
}

async fn drive<S: Upgrade>(
    stream: S,
    config: &Config,
    starttls: bool,
    mechanisms: Vec<Box<dyn Mechanism>>,
    envelope: &Envelope,
    body: &[u8],
    transcript: Transcript,
) -> Result<()> {
    let mut session =
        Session::open_with(stream, &config.host, &config.client_name, transcript).await?;

    if starttls && !session.is_encrypted() && session.extension("STARTTLS").is_some() {
        let tls = config.tls_parameters()?;
        session.starttls(&tls).await?;
    }

    if session.extension("AUTH").is_some() {
        match select_mechanism(session.auth_mechanisms(), mechanisms) {
            Some(mechanism) => session.auth(mechanism).await?,
            None => tracing::debug!("no usable authentication mechanism"),
        }
    }

    if let Err(e) = transact(&mut session, envelope, body).await {
        if !e.is_io()
            && let Err(quit) = session.quit().await
        {
            tracing::debug!(?quit, "QUIT after failed transaction");
        }
        session.close().await;
        return Err(e);
    }

    let quit = session.quit().await;
    if quit.is_err() {
        session.close().await;
    }
    quit
}

async fn transact<S: Upgrade>(
    session: &mut Session<S>,
    envelope: &Envelope,
    body: &[u8],
) -> Result<()> {
    session.mail(&envelope.from).await?;
    for rcpt in &envelope.to {
        session.rcpt(rcpt).await?;
    }

    let mut writer = session.data().await?;
    writer.write(body).await?;
    writer.close().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_envelope_requires_recipient() {
        let err = Envelope::new(addr("a@example.com"), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));

        let envelope =
            Envelope::new(addr("a@example.com"), vec![addr("b@example.com")]).unwrap();
        assert_eq!(envelope.sender().as_str(), "a@example.com");
        assert_eq!(envelope.recipients().len(), 1);

        let bounce = Envelope::new(Address::null(), vec![addr("b@example.com")]).unwrap();
        assert!(bounce.sender().is_null());
        assert!(Envelope::new(addr("a@example.com"), vec![Address::null()]).is_err());
    }

    #[tokio::test]
    async fn test_dial_failure_has_empty_transcript() {
        let config = Config::builder("127.0.0.1").port(1).build();
        let envelope =
            Envelope::new(addr("a@example.com"), vec![addr("b@example.com")]).unwrap();

        let delivery = send_mail(&config, Vec::new(), &envelope, b"hi").await;
        assert!(!delivery.is_success());
        assert!(delivery.transcript.is_empty());
    }
}
