//! SMTP command builder.

use crate::types::Address;

/// SMTP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Basic greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// SASL mechanism name
        mechanism: String,
        /// Base64 initial response; `Some("")` is sent as `=`
        initial_response: Option<String>,
    },
    /// Raw base64 line answering an AUTH challenge
    AuthResponse(String),
    /// `*` - Cancel an AUTH exchange
    AuthCancel,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// Append `BODY=8BITMIME`
        eight_bit_mime: bool,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// VRFY - Verify address
    Vrfy {
        /// Address or user name to verify
        address: String,
    },
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Helo { hostname } => {
                buf.extend_from_slice(b"HELO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_bytes());
                match initial_response.as_deref() {
                    Some("") => buf.extend_from_slice(b" ="),
                    Some(resp) => {
                        buf.push(b' ');
                        buf.extend_from_slice(resp.as_bytes());
                    }
                    None => {}
                }
            }
            Self::AuthResponse(resp) => buf.extend_from_slice(resp.as_bytes()),
            Self::AuthCancel => buf.push(b'*'),
            Self::MailFrom {
                from,
                eight_bit_mime,
            } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_str().as_bytes());
                buf.push(b'>');
                if *eight_bit_mime {
                    buf.extend_from_slice(b" BODY=8BITMIME");
                }
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::Data => buf.extend_from_slice(b"DATA"),
            Self::Rset => buf.extend_from_slice(b"RSET"),
            Self::Vrfy { address } => {
                buf.extend_from_slice(b"VRFY ");
                buf.extend_from_slice(address.as_bytes());
            }
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Quit => buf.extend_from_slice(b"QUIT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Command verb for logging. Never includes arguments, so credentials
    /// and addresses stay out of log output.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::AuthResponse(_) => "AUTH-RESPONSE",
            Self::AuthCancel => "AUTH-CANCEL",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Vrfy { .. } => "VRFY",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_greeting_commands() {
        let ehlo = Command::Ehlo {
            hostname: "localhost".to_string(),
        };
        let helo = Command::Helo {
            hostname: "localhost".to_string(),
        };
        assert_eq!(ehlo.serialize(), b"EHLO localhost\r\n");
        assert_eq!(helo.serialize(), b"HELO localhost\r\n");
    }

    #[test]
    fn test_auth_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: "PLAIN".to_string(),
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_auth_without_initial_response() {
        let cmd = Command::Auth {
            mechanism: "CRAM-MD5".to_string(),
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH CRAM-MD5\r\n");
    }

    #[test]
    fn test_auth_empty_initial_response() {
        let cmd = Command::Auth {
            mechanism: "EXTERNAL".to_string(),
            initial_response: Some(String::new()),
        };
        assert_eq!(cmd.serialize(), b"AUTH EXTERNAL =\r\n");
    }

    #[test]
    fn test_auth_continuation_and_cancel() {
        assert_eq!(
            Command::AuthResponse("dGltIGI5MTM=".to_string()).serialize(),
            b"dGltIGI5MTM=\r\n"
        );
        assert_eq!(Command::AuthResponse(String::new()).serialize(), b"\r\n");
        assert_eq!(Command::AuthCancel.serialize(), b"*\r\n");
    }

    #[test]
    fn test_mail_from() {
        let plain = Command::MailFrom {
            from: addr("a@b"),
            eight_bit_mime: false,
        };
        let eight_bit = Command::MailFrom {
            from: addr("a@b"),
            eight_bit_mime: true,
        };
        assert_eq!(plain.serialize(), b"MAIL FROM:<a@b>\r\n");
        assert_eq!(eight_bit.serialize(), b"MAIL FROM:<a@b> BODY=8BITMIME\r\n");

        let bounce = Command::MailFrom {
            from: Address::null(),
            eight_bit_mime: false,
        };
        assert_eq!(bounce.serialize(), b"MAIL FROM:<>\r\n");
    }

    #[test]
    fn test_transaction_commands() {
        let rcpt = Command::RcptTo {
            to: addr("recipient@example.com"),
        };
        assert_eq!(rcpt.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
    }

    #[test]
    fn test_vrfy() {
        let cmd = Command::Vrfy {
            address: "postmaster@example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"VRFY postmaster@example.com\r\n");
    }

    #[test]
    fn test_debug_hides_arguments() {
        let cmd = Command::Auth {
            mechanism: "PLAIN".to_string(),
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(format!("{cmd:?}"), "AUTH");
    }
}
