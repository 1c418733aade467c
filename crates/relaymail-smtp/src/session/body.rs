//! Message body sink opened by DATA.

use super::{Session, SessionState};
use crate::connection::{DotStuffer, Upgrade};
use crate::error::Result;
use crate::types::ReplyCode;

/// Writer for the message body of one transaction.
///
/// Bytes are dot-stuffed and line endings normalized to CRLF as they are
/// written. Dropping the writer without [`BodyWriter::close`] leaves the
/// session in the `Data` state; only `close` ends the transaction.
#[derive(Debug)]
pub struct BodyWriter<'a, S: Upgrade> {
    session: &'a mut Session<S>,
    stuffer: DotStuffer,
}

impl<'a, S: Upgrade> BodyWriter<'a, S> {
    pub(super) const fn new(session: &'a mut Session<S>) -> Self {
        Self {
            session,
            stuffer: DotStuffer::new(),
        }
    }

    /// Writes a chunk of the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let encoded = self.stuffer.encode(data);
        let result = self.session.connection()?.write_raw(&encoded).await;
        self.session.check_io(result)
    }

    /// Terminates the body and waits for the server to accept the message.
    ///
    /// The session returns to `Ready` whatever the server answers.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server replies 250.
    pub async fn close(self) -> Result<()> {
        let tail = self.stuffer.finish();
        let session = self.session;

        let conn = session.connection()?;
        let result = match conn.write_raw(&tail).await {
            Ok(()) => conn.read_reply().await,
            Err(e) => Err(e),
        };
        let reply = session.check_io(result)?;
        session.state = SessionState::Ready;

        if reply.code != ReplyCode::OK {
            tracing::warn!(code = reply.code.as_u16(), "message rejected");
        }
        reply.expect(ReplyCode::OK)?;
        Ok(())
    }
}
