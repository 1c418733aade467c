//! SMTP transport: byte streams, TLS and the line codec.

mod codec;
mod stream;

pub use codec::{Connection, DotStuffer};
pub use stream::{
    SmtpStream, TlsParameters, Upgrade, connect, connect_tls, default_client_config,
};
