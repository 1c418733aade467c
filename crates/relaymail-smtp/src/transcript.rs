//! Session transcript with credential redaction.
//!
//! [`Transcribed`] sits between the line codec and the byte stream and
//! appends every chunk it sees to a shared [`Transcript`], tagged `C: ` for
//! client output and `S: ` for server output. While an AUTH exchange is
//! outstanding each chunk is replaced by [`REDACTED_LINE`].
//!
//! The AUTH window opens on a write starting with `AUTH` and closes on a read
//! starting with `235` or `535`. The closing reply is itself logged in full.
//! Each read and write is assumed to carry one complete protocol line; a
//! status prefix split across two reads is not detected.
//!
//! Detection looks only at the leading bytes of a chunk and knows nothing
//! of the dialogue state. A message body chunk that starts with `AUTH`
//! (an `AUTHOR:` header, say) opens the window too, and everything after
//! it stays redacted until the server happens to send a `235` or `535`.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Placeholder recorded instead of raw bytes during AUTH.
pub const REDACTED_LINE: &[u8] = b"raw log disabled during AUTH\r\n";

/// Tag for bytes written by the client.
const CLIENT_TAG: &[u8] = b"C: ";

/// Tag for bytes read from the server.
const SERVER_TAG: &[u8] = b"S: ";

const AUTH_COMMAND: &[u8] = b"AUTH";
const AUTH_SUCCEEDED: &[u8] = b"235";
const AUTH_FAILED: &[u8] = b"535";

/// Append-only session log.
///
/// Cloning yields another handle to the same log, so a caller can keep one
/// and inspect it while the session is still running.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a free-form line, e.g. the peer address.
    pub fn note(&self, line: &str) {
        self.append(&[line.as_bytes(), b"\r\n"]);
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Number of bytes recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Takes the recorded bytes, copying them if other handles are alive.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match Arc::try_unwrap(self.bytes) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }

    /// Appends all parts under a single lock so concurrent readers and
    /// writers never interleave within one entry.
    fn append(&self, parts: &[&[u8]]) {
        let mut bytes = self.lock();
        for part in parts {
            bytes.extend_from_slice(part);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // a panic while appending cannot leave the buffer inconsistent
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream decorator that records traffic into a [`Transcript`].
#[derive(Debug)]
pub struct Transcribed<S> {
    inner: S,
    transcript: Transcript,
    auth_in_progress: bool,
}

impl<S> Transcribed<S> {
    /// Wraps `inner`, recording into `transcript`.
    pub const fn new(inner: S, transcript: Transcript) -> Self {
        Self {
            inner,
            transcript,
            auth_in_progress: false,
        }
    }

    /// Returns the transcript handle.
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns true while an AUTH exchange is being redacted.
    pub const fn auth_in_progress(&self) -> bool {
        self.auth_in_progress
    }

    /// Gets a reference to the underlying stream.
    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwraps the decorator, returning the stream and the transcript.
    pub fn into_parts(self) -> (S, Transcript) {
        (self.inner, self.transcript)
    }

    fn record_outbound(&mut self, sent: &[u8]) {
        if sent.is_empty() {
            return;
        }
        if sent.starts_with(AUTH_COMMAND) {
            self.auth_in_progress = true;
        }
        self.record(CLIENT_TAG, sent);
    }

    fn record_inbound(&mut self, received: &[u8]) {
        if received.is_empty() {
            return;
        }
        if received.starts_with(AUTH_SUCCEEDED) || received.starts_with(AUTH_FAILED) {
            self.auth_in_progress = false;
        }
        self.record(SERVER_TAG, received);
    }

    fn record(&self, tag: &[u8], data: &[u8]) {
        if self.auth_in_progress {
            self.transcript.append(&[REDACTED_LINE]);
        } else {
            self.transcript.append(&[tag, data]);
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Transcribed<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.record_inbound(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Transcribed<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.record_outbound(&buf[..written]);
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_test::io::Builder;

    async fn read_once<S: AsyncRead + Unpin>(stream: &mut S) -> Vec<u8> {
        let mut buf = vec![0u8; 512];
        let n = stream.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_tags_each_direction() {
        let mock = Builder::new()
            .read(b"220 mx.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .build();
        let transcript = Transcript::new();
        let mut stream = Transcribed::new(mock, transcript.clone());

        read_once(&mut stream).await;
        stream.write_all(b"EHLO localhost\r\n").await.unwrap();

        assert_eq!(
            transcript.snapshot(),
            b"S: 220 mx.example.com ESMTP\r\nC: EHLO localhost\r\n"
        );
    }

    #[tokio::test]
    async fn test_auth_window_redacted_until_success() {
        let mock = Builder::new()
            .write(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .read(b"235 Authenticated\r\n")
            .build();
        let transcript = Transcript::new();
        let mut stream = Transcribed::new(mock, transcript.clone());

        stream
            .write_all(b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n")
            .await
            .unwrap();
        read_once(&mut stream).await;
        read_once(&mut stream).await;

        let mut expected = Vec::new();
        expected.extend_from_slice(REDACTED_LINE);
        expected.extend_from_slice(REDACTED_LINE);
        expected.extend_from_slice(b"S: 235 Authenticated\r\n");
        assert_eq!(transcript.snapshot(), expected);
        assert!(!stream.auth_in_progress());
    }

    #[tokio::test]
    async fn test_auth_window_redacts_client_continuations() {
        let mock = Builder::new()
            .write(b"AUTH CRAM-MD5\r\n")
            .read(b"334 PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+\r\n")
            .write(b"dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw\r\n")
            .read(b"535 5.7.8 Authentication credentials invalid\r\n")
            .write(b"QUIT\r\n")
            .build();
        let transcript = Transcript::new();
        let mut stream = Transcribed::new(mock, transcript.clone());

        stream.write_all(b"AUTH CRAM-MD5\r\n").await.unwrap();
        read_once(&mut stream).await;
        stream
            .write_all(b"dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw\r\n")
            .await
            .unwrap();
        read_once(&mut stream).await;
        stream.write_all(b"QUIT\r\n").await.unwrap();

        let log = String::from_utf8(transcript.snapshot()).unwrap();
        assert_eq!(log.matches("raw log disabled during AUTH").count(), 3);
        assert!(log.contains("S: 535 5.7.8 Authentication credentials invalid\r\n"));
        assert!(log.ends_with("C: QUIT\r\n"));
        assert!(!log.contains("dGltIGI5"));
    }

    #[tokio::test]
    async fn test_body_starting_with_auth_opens_window() {
        let mock = Builder::new()
            .write(b"DATA\r\n")
            .read(b"354 go\r\n")
            .write(b"AUTHOR: someone\r\n\r\nhi\r\n.\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .build();
        let transcript = Transcript::new();
        let mut stream = Transcribed::new(mock, transcript.clone());

        stream.write_all(b"DATA\r\n").await.unwrap();
        read_once(&mut stream).await;
        stream
            .write_all(b"AUTHOR: someone\r\n\r\nhi\r\n.\r\n")
            .await
            .unwrap();
        read_once(&mut stream).await;
        stream.write_all(b"QUIT\r\n").await.unwrap();

        assert!(stream.auth_in_progress());
        let log = String::from_utf8(transcript.snapshot()).unwrap();
        assert!(log.starts_with("C: DATA\r\nS: 354 go\r\n"));
        assert_eq!(log.matches("raw log disabled during AUTH").count(), 3);
        assert!(!log.contains("250 queued"));
    }

    #[tokio::test]
    async fn test_empty_read_records_nothing() {
        let mock = Builder::new().build();
        let transcript = Transcript::new();
        let mut stream = Transcribed::new(mock, transcript.clone());

        assert!(read_once(&mut stream).await.is_empty());
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_note_and_into_bytes() {
        let transcript = Transcript::new();
        let observer = transcript.clone();
        transcript.note("Connected to: 192.0.2.1:25");

        assert_eq!(observer.len(), 28);
        assert_eq!(transcript.into_bytes(), b"Connected to: 192.0.2.1:25\r\n");
        assert_eq!(observer.into_bytes(), b"Connected to: 192.0.2.1:25\r\n");
    }

    #[tokio::test]
    async fn test_concurrent_reader_and_writer() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let transcript = Transcript::new();
        let (mut reader, mut writer) =
            tokio::io::split(Transcribed::new(client, transcript.clone()));

        let write_task = tokio::spawn(async move {
            for i in 0..100 {
                writer
                    .write_all(format!("NOOP {i}\r\n").as_bytes())
                    .await
                    .unwrap();
            }
        });

        let mut outgoing = Vec::new();
        for i in 0..100 {
            outgoing.extend_from_slice(format!("250 ok {i}\r\n").as_bytes());
        }
        server.write_all(&outgoing).await.unwrap();

        let mut received = Vec::new();
        let mut buf = vec![0u8; 8192];
        while received.len() < outgoing.len() {
            let n = reader.read(&mut buf).await.unwrap();
            received.extend_from_slice(&buf[..n]);
        }
        write_task.await.unwrap();

        let log = String::from_utf8(transcript.snapshot()).unwrap();
        for i in 0..100 {
            assert!(log.contains(&format!("C: NOOP {i}\r\n")));
        }
        assert_eq!(log.matches("250 ok ").count(), 100);
    }
}
