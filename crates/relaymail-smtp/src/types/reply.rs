//! SMTP reply types.

use crate::error::Error;

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines, without the code prefix.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Requires exactly `expected`, turning anything else into an
    /// [`Error::SmtpError`] carrying the actual code and text.
    ///
    /// # Errors
    ///
    /// Returns an error if the code differs.
    pub fn expect(self, expected: ReplyCode) -> crate::Result<Self> {
        if self.code == expected {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Requires a code whose first two digits match `family` (e.g. 25 accepts
    /// 250 through 259).
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the family.
    pub fn expect_family(self, family: u16) -> crate::Result<Self> {
        if self.code.as_u16() / 10 == family {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Converts the reply into an error value.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.message_text())
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Reply codes the client checks for
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 501 Syntax error in parameters or arguments (acknowledges AUTH abort)
    pub const PARAMETER_ERROR: Self = Self(501);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reply(code: u16, text: &str) -> Reply {
        Reply::new(ReplyCode::new(code), vec![text.to_string()])
    }

    #[test]
    fn success_and_intermediate() {
        assert!(ReplyCode::OK.is_success());
        assert!(ReplyCode::CLOSING.is_success());
        assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
        assert!(ReplyCode::START_DATA.is_intermediate());
        assert!(!ReplyCode::AUTH_FAILED.is_success());
    }

    #[test]
    fn expect_exact_code() {
        assert!(reply(250, "OK").expect(ReplyCode::OK).is_ok());

        let err = reply(251, "Forwarding").expect(ReplyCode::OK).unwrap_err();
        assert_eq!(err.code(), Some(251));
    }

    #[test]
    fn expect_family_accepts_25x() {
        assert!(reply(250, "OK").expect_family(25).is_ok());
        assert!(reply(251, "User not local; will forward").expect_family(25).is_ok());
        assert!(reply(252, "Cannot VRFY").expect_family(25).is_ok());
    }

    #[test]
    fn expect_family_rejects_others() {
        let err = reply(550, "No such user").expect_family(25).unwrap_err();
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "SMTP error 550: No such user");

        assert!(reply(220, "ready").expect_family(25).is_err());
        assert!(reply(450, "busy").expect_family(25).is_err());
    }

    #[test]
    fn message_text_multiple_lines() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["smtp.example.com".to_string(), "8BITMIME".to_string()],
        );
        assert_eq!(reply.message_text(), "smtp.example.com\n8BITMIME");
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", ReplyCode::OK), "250");
    }
}
