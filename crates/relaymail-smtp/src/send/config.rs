//! Delivery configuration.

use crate::connection::TlsParameters;
use crate::error::Result;
use crate::session::DEFAULT_CLIENT_NAME;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Start with plaintext, upgrade with STARTTLS when offered (port 587).
    #[default]
    StartTls,
    /// TLS from the start (port 465).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }
}

/// Relay connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay hostname, also the expected TLS peer identity.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Name sent with EHLO/HELO.
    pub client_name: String,
    /// TLS settings; `None` verifies `host` against the web PKI roots.
    pub tls: Option<TlsParameters>,
}

impl Config {
    /// Creates a configuration for STARTTLS submission on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// TLS parameters for this relay.
    ///
    /// # Errors
    ///
    /// Returns an error if no parameters were configured and `host` is not
    /// a valid DNS name.
    pub fn tls_parameters(&self) -> Result<TlsParameters> {
        match &self.tls {
            Some(tls) => Ok(tls.clone()),
            None => TlsParameters::new(&self.host),
        }
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    client_name: String,
    tls: Option<TlsParameters>,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            tls: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the name sent with EHLO/HELO.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Sets custom TLS parameters, e.g. for a private CA.
    #[must_use]
    pub fn tls(mut self, tls: TlsParameters) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            client_name: self.client_name,
            tls: self.tls,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::Implicit.default_port(), 465);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.client_name, "localhost");
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("smtp.example.com")
            .security(Security::Implicit)
            .client_name("relay.example.org")
            .build();

        assert_eq!(config.port, 465);
        assert_eq!(config.client_name, "relay.example.org");
    }

    #[test]
    fn test_config_builder_explicit_port() {
        let config = Config::builder("smtp.example.com").port(2525).build();
        assert_eq!(config.port, 2525);
        assert_eq!(config.security, Security::StartTls);
    }

    #[test]
    fn test_tls_parameters_default_to_host() {
        let config = Config::new("smtp.example.com");
        assert!(config.tls_parameters().is_ok());

        let config = Config::new("bad host name");
        assert!(config.tls_parameters().is_err());
    }
}
