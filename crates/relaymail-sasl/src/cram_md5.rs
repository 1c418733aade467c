//! CRAM-MD5 mechanism (RFC 2195).

use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use md5::Md5;

use crate::{Mechanism, Result, SaslError, ServerCapabilities, Start};

type HmacMd5 = Hmac<Md5>;

/// CRAM-MD5 authentication.
///
/// The server sends a challenge and the client answers with
/// `username HEX(HMAC-MD5(secret, challenge))`; the secret itself never
/// crosses the wire.
#[derive(Clone)]
pub struct CramMd5 {
    username: String,
    secret: String,
}

impl CramMd5 {
    /// Creates a CRAM-MD5 mechanism.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    fn digest(&self, challenge: &[u8]) -> Result<String> {
        let mut mac = HmacMd5::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SaslError::Rejected(format!("CRAM-MD5 key: {e}")))?;
        mac.update(challenge);

        let code = mac.finalize().into_bytes();
        let mut hex = String::with_capacity(code.len() * 2);
        for byte in code {
            let _ = write!(hex, "{byte:02x}");
        }
        Ok(hex)
    }
}

impl std::fmt::Debug for CramMd5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CramMd5")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Mechanism for CramMd5 {
    fn name(&self) -> &'static str {
        "CRAM-MD5"
    }

    fn resists_eavesdropping(&self) -> bool {
        true
    }

    fn start(&mut self, _server: &ServerCapabilities) -> Result<Start> {
        Ok(Start {
            mechanism: self.name().to_string(),
            initial_response: None,
        })
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }
        let response = format!("{} {}", self.username, self.digest(challenge)?);
        Ok(Some(response.into_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cram_md5_known_answer() {
        let mut cram = CramMd5::new("alice", "wonderland");
        let response = cram
            .next(b"<17893.1320679123@tesseract.susam.in>", true)
            .unwrap()
            .unwrap();

        assert_eq!(response, b"alice 64b2a43c1f6ed6806a980914e23e75f0");
    }

    #[test]
    fn test_cram_md5_rfc2195_example() {
        let mut cram = CramMd5::new("tim", "tanstaaftanstaaf");
        let response = cram
            .next(b"<1896.697170952@postoffice.reston.mci.net>", true)
            .unwrap()
            .unwrap();

        assert_eq!(response, b"tim b913a602c7eda7a495b4e6e7334d3890");
    }

    #[test]
    fn test_cram_md5_starts_without_initial_response() {
        let mut cram = CramMd5::new("alice", "wonderland");
        let server = ServerCapabilities {
            server_name: "mx.example.com".to_string(),
            encrypted: false,
            mechanisms: vec!["CRAM-MD5".to_string()],
        };

        let start = cram.start(&server).unwrap();
        assert_eq!(start.mechanism, "CRAM-MD5");
        assert!(start.initial_response.is_none());
    }

    #[test]
    fn test_cram_md5_done_after_success() {
        let mut cram = CramMd5::new("alice", "wonderland");
        assert_eq!(cram.next(b"2.7.0 Accepted", false).unwrap(), None);
    }
}
