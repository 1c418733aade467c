//! Line codec for SMTP.
//!
//! Commands go out as single CRLF-terminated lines, replies come back as one
//! or more lines sharing a status code. Message bodies are dot-stuffed on the
//! way out by [`DotStuffer`].

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Result;
use crate::command::Command;
use crate::parser::{is_last_reply_line, parse_reply};
use crate::transcript::{Transcribed, Transcript};
use crate::types::Reply;

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum reply line length; RFC 5321 allows 512, servers exceed it.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Maximum number of lines in one reply.
const MAX_REPLY_LINES: usize = 1024;

/// Transcribed, buffered SMTP connection.
#[derive(Debug)]
pub struct Connection<S> {
    reader: BufReader<Transcribed<S>>,
    write_buffer: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream`, recording all traffic into `transcript`.
    pub fn new(stream: S, transcript: Transcript) -> Self {
        Self {
            reader: BufReader::with_capacity(
                DEFAULT_BUFFER_SIZE,
                Transcribed::new(stream, transcript),
            ),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Sends a command and reads its reply.
    pub async fn command(&mut self, cmd: &Command) -> Result<Reply> {
        self.send(cmd).await?;
        self.read_reply().await
    }

    /// Writes a command line.
    pub async fn send(&mut self, cmd: &Command) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(&cmd.serialize());

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Writes raw bytes (message body data).
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Reads one complete, possibly multi-line, reply.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(crate::Error::Protocol("reply has too many lines".to_string()));
            }
        }

        parse_reply(&lines)
    }

    /// Reads a single line with the line terminator removed.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(crate::Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(crate::Error::Protocol("line too long".to_string()));
            }
        }

        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Shuts down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref().get_ref()
    }

    /// Returns the transcript handle.
    pub fn transcript(&self) -> &Transcript {
        self.reader.get_ref().transcript()
    }

    /// Unwraps the connection, returning the stream and the transcript.
    ///
    /// Any buffered, unread data is lost.
    pub fn into_parts(self) -> (S, Transcript) {
        self.reader.into_inner().into_parts()
    }
}

/// Incremental dot-stuffing encoder for message bodies.
///
/// Doubles a `.` at the start of every line and turns bare LF into CRLF.
/// Chunk boundaries may fall anywhere, including between CR and LF.
#[derive(Debug, Clone)]
pub struct DotStuffer {
    at_line_start: bool,
    prev_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DotStuffer {
    /// Creates an encoder positioned at the start of a line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at_line_start: true,
            prev_cr: false,
        }
    }

    /// Encodes one chunk of body data.
    #[must_use]
    pub fn encode(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(chunk.len() + chunk.len() / 64 + 2);
        for &b in chunk {
            if b == b'\n' {
                if !self.prev_cr {
                    out.push(b'\r');
                }
                out.push(b'\n');
                self.at_line_start = true;
                self.prev_cr = false;
                continue;
            }
            if self.at_line_start && b == b'.' {
                out.push(b'.');
            }
            out.push(b);
            self.at_line_start = false;
            self.prev_cr = b == b'\r';
        }
        out
    }

    /// Terminates the body: completes the last line and adds `.\r\n`.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5);
        if !self.at_line_start {
            if !self.prev_cr {
                out.push(b'\r');
            }
            out.push(b'\n');
        }
        out.extend_from_slice(b".\r\n");
        out
    }
}
