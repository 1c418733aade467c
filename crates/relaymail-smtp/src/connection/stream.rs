//! Byte streams for SMTP connections.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::error::{Error, Result};

/// TLS settings for an implicit-TLS connection or a STARTTLS upgrade.
#[derive(Debug, Clone)]
pub struct TlsParameters {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
}

impl TlsParameters {
    /// Verifies the peer as `host` against the bundled web PKI roots.
    pub fn new(host: &str) -> Result<Self> {
        Self::with_config(default_client_config(), host)
    }

    /// Uses a caller-built rustls configuration, e.g. with a private CA.
    pub fn with_config(config: Arc<ClientConfig>, host: &str) -> Result<Self> {
        let server_name = ServerName::try_from(host.to_string())?;
        Ok(Self {
            config,
            server_name,
        })
    }

    /// Expected peer identity.
    #[must_use]
    pub const fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }

    async fn handshake(&self, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
        let connector = TlsConnector::from(Arc::clone(&self.config));
        Ok(connector.connect(self.server_name.clone(), tcp).await?)
    }
}

/// A byte stream the session can drive and, on STARTTLS, encrypt in place.
pub trait Upgrade: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Returns true if traffic is already encrypted.
    fn is_encrypted(&self) -> bool;

    /// Remote address, if the stream is a socket.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Performs the TLS handshake over this stream.
    fn upgrade(self, tls: &TlsParameters) -> impl Future<Output = Result<Self>> + Send;
}

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Plain(TcpStream),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Upgrade for SmtpStream {
    fn is_encrypted(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Plain(tcp) => tcp.peer_addr().ok(),
            Self::Tls(tls) => tls.get_ref().0.peer_addr().ok(),
        }
    }

    async fn upgrade(self, tls: &TlsParameters) -> Result<Self> {
        match self {
            Self::Plain(tcp) => Ok(Self::Tls(Box::new(tls.handshake(tcp).await?))),
            Self::Tls(_) => Err(Error::InvalidState("Stream is already TLS".to_string())),
        }
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to an SMTP server over plain TCP.
pub async fn connect(host: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    tracing::debug!(host, port, "connected");
    Ok(SmtpStream::Plain(tcp))
}

/// Connects to an SMTP server over TLS (implicit TLS, usually port 465).
pub async fn connect_tls(host: &str, port: u16, tls: &TlsParameters) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    let stream = tls.handshake(tcp).await?;
    tracing::debug!(host, port, "connected with TLS");
    Ok(SmtpStream::Tls(Box::new(stream)))
}

/// Creates a TLS client configuration trusting the web PKI roots.
#[must_use]
pub fn default_client_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}
