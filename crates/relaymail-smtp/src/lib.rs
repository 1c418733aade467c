//! # relaymail-smtp
//!
//! An SMTP submission client implementing RFC 5321, with STARTTLS (RFC 3207),
//! SASL authentication (RFC 4954) and a session transcript that never
//! records credentials.
//!
//! ## Features
//!
//! - **Session state machine**: EHLO with HELO fallback, STARTTLS, VRFY, MAIL,
//!   RCPT, DATA, RSET, NOOP and QUIT, checked against the dialogue state
//! - **Pluggable authentication**: any [`relaymail_sasl::Mechanism`]; CRAM-MD5
//!   is preferred over cleartext mechanisms when the relay offers it
//! - **TLS**: implicit TLS (port 465) and STARTTLS via rustls
//! - **Transcript**: every line exchanged, tagged `C:`/`S:`, with the AUTH
//!   exchange replaced by a placeholder
//!
//! ## Quick Start
//!
//! ```no_run
//! use relaymail_sasl::{CramMd5, Mechanism, Plain};
//! use relaymail_smtp::{Address, Config, Envelope, send_mail};
//!
//! #[tokio::main]
//! async fn main() -> relaymail_smtp::Result<()> {
//!     let config = Config::new("smtp.example.com");
//!     let mechanisms: Vec<Box<dyn Mechanism>> = vec![
//!         Box::new(Plain::new("", "user", "secret", "smtp.example.com")),
//!         Box::new(CramMd5::new("user", "secret")),
//!     ];
//!     let envelope = Envelope::new(
//!         Address::new("sender@example.com")?,
//!         vec![Address::new("recipient@example.com")?],
//!     )?;
//!
//!     let delivery = send_mail(
//!         &config,
//!         mechanisms,
//!         &envelope,
//!         b"Subject: Test\r\n\r\nHello, World!\r\n",
//!     )
//!     .await;
//!
//!     println!("{}", delivery.transcript_text());
//!     delivery.result
//! }
//! ```
//!
//! For finer control drive a [`Session`] directly over any stream that
//! implements [`connection::Upgrade`].
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Streams, TLS and the line codec
//! - [`parser`]: Reply parser
//! - [`send`]: One-shot delivery
//! - [`session`]: Protocol session and AUTH loop
//! - [`transcript`]: Redacting session log
//! - [`types`]: Addresses, extensions, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod send;
pub mod session;
pub mod transcript;
pub mod types;

pub use connection::{SmtpStream, TlsParameters, Upgrade};
pub use error::{Error, Result};
pub use send::{
    Config, ConfigBuilder, Delivery, Envelope, Security, deliver, send, send_mail, send_mail_tls,
};
pub use session::{BodyWriter, Session, SessionState};
pub use transcript::{REDACTED_LINE, Transcribed, Transcript};
pub use types::{Address, Extensions, Reply, ReplyCode};
