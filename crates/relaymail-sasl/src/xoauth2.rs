//! XOAUTH2 mechanism (Google/Microsoft proprietary).

use crate::{Mechanism, Result, SaslError, ServerCapabilities, Start};

/// XOAUTH2 authentication with an `OAuth2` bearer token.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`
///
/// When the token is refused the server answers with a continuation carrying
/// a JSON error document. The client must reply with an empty line, after
/// which the server sends the final 535.
#[derive(Clone)]
pub struct XOAuth2 {
    user: String,
    token: String,
}

impl XOAuth2 {
    /// Creates an XOAUTH2 mechanism.
    #[must_use]
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for XOAuth2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XOAuth2")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Mechanism for XOAuth2 {
    fn name(&self) -> &'static str {
        "XOAUTH2"
    }

    fn start(&mut self, server: &ServerCapabilities) -> Result<Start> {
        if !server.encrypted {
            return Err(SaslError::Unencrypted(self.name().to_string()));
        }

        let response = format!("user={}\x01auth=Bearer {}\x01\x01", self.user, self.token);
        Ok(Start {
            mechanism: self.name().to_string(),
            initial_response: Some(response.into_bytes()),
        })
    }

    fn next(&mut self, challenge: &[u8], more: bool) -> Result<Option<Vec<u8>>> {
        if !more {
            return Ok(None);
        }

        match parse_oauth_error(challenge) {
            Ok(error) => tracing::warn!(
                status = %error.status,
                schemes = %error.schemes,
                "XOAUTH2 token rejected"
            ),
            Err(e) => tracing::warn!(%e, "XOAUTH2 challenge is not an error document"),
        }

        Ok(Some(Vec::new()))
    }
}

/// `OAuth2` error response from server.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthError {
    /// HTTP status code.
    pub status: String,
    /// Authentication schemes supported.
    pub schemes: String,
    /// `OAuth2` scope required.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Parses the JSON error a server sends as an XOAUTH2 challenge.
fn parse_oauth_error(challenge: &[u8]) -> std::result::Result<OAuthError, serde_json::Error> {
    serde_json::from_slice(challenge)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server(encrypted: bool) -> ServerCapabilities {
        ServerCapabilities {
            server_name: "smtp.gmail.com".to_string(),
            encrypted,
            mechanisms: vec!["XOAUTH2".to_string()],
        }
    }

    #[test]
    fn test_xoauth2_format() {
        let mut xoauth2 = XOAuth2::new("test@test.com", "abc");
        let start = xoauth2.start(&server(true)).unwrap();

        assert_eq!(start.mechanism, "XOAUTH2");
        assert_eq!(
            start.initial_response.unwrap(),
            b"user=test@test.com\x01auth=Bearer abc\x01\x01"
        );
    }

    #[test]
    fn test_xoauth2_refuses_unencrypted() {
        let mut xoauth2 = XOAuth2::new("test@test.com", "abc");
        assert!(xoauth2.start(&server(false)).is_err());
    }

    #[test]
    fn test_xoauth2_answers_error_with_empty_line() {
        let mut xoauth2 = XOAuth2::new("test@test.com", "abc");
        let challenge = br#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;

        assert_eq!(xoauth2.next(challenge, true).unwrap(), Some(Vec::new()));
        assert_eq!(xoauth2.next(b"Accepted", false).unwrap(), None);
    }

    #[test]
    fn test_parse_oauth_error() {
        let json = br#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        let error = parse_oauth_error(json).unwrap();

        assert_eq!(error.status, "401");
        assert_eq!(error.schemes, "bearer");
        assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
    }
}
