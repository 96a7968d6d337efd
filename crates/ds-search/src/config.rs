//! Connection configuration.
//!
//! ## Security Notes
//!
//! - The bind password is redacted from `Debug` output and never serialized.
//! - Certificate verification is an explicit setting ([`TlsVerification`]).
//!   It defaults to [`TlsVerification::Never`] for compatibility with legacy
//!   deployments that use self-signed certificates; a warning is logged each
//!   time TLS is negotiated without verification.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};
use crate::params::Flag;

/// Default server URI: the OpenLDAP local socket.
pub const DEFAULT_SERVER_URI: &str = "ldapi://%2Fvar%2Frun%2Fldapi";

// ============================================================================
// Bind Mode
// ============================================================================

/// How the session authenticates after connecting.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum BindMode {
    /// No bind operation at all.
    Anonymous,

    /// Simple bind with a DN and password.
    Simple {
        /// Bind DN.
        dn: String,
        /// Bind password.
        password: String,
    },

    /// SASL EXTERNAL bind with an empty authorization identity.
    ///
    /// Relies on transport-level identity, e.g. peer credentials on a
    /// local socket or a TLS client certificate.
    #[default]
    External,
}

impl BindMode {
    /// Picks the bind mode from optional credentials.
    ///
    /// A non-empty DN yields [`BindMode::Simple`], anything else
    /// [`BindMode::External`].
    #[must_use]
    pub fn from_credentials(bind_dn: Option<String>, bind_pw: Option<String>) -> Self {
        match bind_dn.filter(|dn| !dn.trim().is_empty()) {
            Some(dn) => Self::Simple {
                dn,
                password: bind_pw.unwrap_or_default(),
            },
            None => Self::External,
        }
    }

    /// Returns the mechanism name used in logs.
    #[must_use]
    pub const fn mechanism(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Simple { .. } => "simple",
            Self::External => "sasl-external",
        }
    }

    /// Returns the bind DN for simple binds.
    #[must_use]
    pub fn dn(&self) -> Option<&str> {
        match self {
            Self::Simple { dn, .. } => Some(dn),
            _ => None,
        }
    }
}

impl fmt::Debug for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Simple { dn, .. } => f
                .debug_struct("Simple")
                .field("dn", dn)
                .field("password", &"***REDACTED***")
                .finish(),
            Self::External => f.write_str("External"),
        }
    }
}

// ============================================================================
// TLS Verification
// ============================================================================

/// Server certificate verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsVerification {
    /// Reject certificates that do not validate.
    Required,
    /// Accept any certificate.
    #[default]
    Never,
}

impl TlsVerification {
    /// Maps the `validate_certs` switch to a policy.
    #[must_use]
    pub const fn from_validate_certs(validate: bool) -> Self {
        if validate {
            Self::Required
        } else {
            Self::Never
        }
    }

    /// Returns true if certificates are verified.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

// ============================================================================
// Connection Configuration
// ============================================================================

/// Directory server connection settings.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Server URI (`ldap://`, `ldaps://` or `ldapi://`).
    pub server_uri: String,

    /// Upgrade a plain connection with StartTLS before binding.
    pub start_tls: bool,

    /// Authentication mode.
    pub bind: BindMode,

    /// Certificate verification policy.
    pub tls_verification: TlsVerification,

    /// Timeout for establishing the connection.
    pub connect_timeout: Option<Duration>,

    /// Timeout for the search operation.
    pub search_timeout: Option<Duration>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server_uri", &self.server_uri)
            .field("start_tls", &self.start_tls)
            .field("bind", &self.bind)
            .field("tls_verification", &self.tls_verification)
            .field("connect_timeout", &self.connect_timeout)
            .field("search_timeout", &self.search_timeout)
            .finish()
    }
}

/// URI scheme of the server endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriScheme {
    /// Plain LDAP over TCP.
    Ldap,
    /// LDAP over TLS from connection start.
    Ldaps,
    /// LDAP over a Unix domain socket.
    Ldapi,
}

impl UriScheme {
    /// Parses the scheme of a server URI.
    pub fn of(uri: &str) -> SearchResult<Self> {
        let lower = uri.to_ascii_lowercase();
        let (scheme, rest) = if let Some(rest) = lower.strip_prefix("ldaps://") {
            (Self::Ldaps, rest)
        } else if let Some(rest) = lower.strip_prefix("ldapi://") {
            (Self::Ldapi, rest)
        } else if let Some(rest) = lower.strip_prefix("ldap://") {
            (Self::Ldap, rest)
        } else {
            return Err(SearchError::config(format!(
                "unsupported server URI '{uri}': expected ldap://, ldaps:// or ldapi://"
            )));
        };

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(SearchError::config(format!(
                "server URI '{uri}' is missing a host or socket path"
            )));
        }

        Ok(scheme)
    }
}

impl ConnectionConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }

    /// Returns the URI scheme.
    pub fn scheme(&self) -> SearchResult<UriScheme> {
        UriScheme::of(&self.server_uri)
    }

    /// Returns true if the session will be encrypted.
    #[must_use]
    pub fn uses_tls(&self) -> bool {
        self.start_tls || matches!(self.scheme(), Ok(UriScheme::Ldaps))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SearchResult<()> {
        let scheme = self.scheme()?;

        if self.start_tls {
            match scheme {
                UriScheme::Ldaps => {
                    return Err(SearchError::config(
                        "start_tls cannot be combined with an ldaps:// URI",
                    ));
                }
                UriScheme::Ldapi => {
                    return Err(SearchError::config(
                        "start_tls cannot be used over an ldapi:// socket",
                    ));
                }
                UriScheme::Ldap => {}
            }
        }

        if let BindMode::Simple { dn, .. } = &self.bind {
            if dn.trim().is_empty() {
                return Err(SearchError::config("bind_dn cannot be empty"));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    server_uri: Option<String>,
    start_tls: bool,
    bind: BindMode,
    tls_verification: TlsVerification,
    connect_timeout: Option<Duration>,
    search_timeout: Option<Duration>,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URI.
    #[must_use]
    pub fn server_uri(mut self, uri: impl Into<String>) -> Self {
        self.server_uri = Some(uri.into());
        self
    }

    /// Enables StartTLS.
    #[must_use]
    pub const fn start_tls(mut self, enabled: bool) -> Self {
        self.start_tls = enabled;
        self
    }

    /// Sets the bind mode.
    #[must_use]
    pub fn bind(mut self, bind: BindMode) -> Self {
        self.bind = bind;
        self
    }

    /// Uses a simple bind with the given credentials.
    #[must_use]
    pub fn simple_bind(mut self, dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind = BindMode::Simple {
            dn: dn.into(),
            password: password.into(),
        };
        self
    }

    /// Sets the certificate verification policy.
    #[must_use]
    pub const fn tls_verification(mut self, verification: TlsVerification) -> Self {
        self.tls_verification = verification;
        self
    }

    /// Applies the same timeout to connecting and searching.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self.search_timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the search timeout.
    #[must_use]
    pub const fn search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URI scheme is unsupported, the URI has no
    /// host, StartTLS is requested on an `ldaps://` or `ldapi://` URI, or
    /// a simple bind has an empty DN.
    pub fn build(self) -> SearchResult<ConnectionConfig> {
        let config = ConnectionConfig {
            server_uri: self
                .server_uri
                .unwrap_or_else(|| DEFAULT_SERVER_URI.to_string()),
            start_tls: self.start_tls,
            bind: self.bind,
            tls_verification: self.tls_verification,
            connect_timeout: self.connect_timeout,
            search_timeout: self.search_timeout,
        };

        config.validate()?;

        Ok(config)
    }
}

// ============================================================================
// Declarative Connection Parameters
// ============================================================================

/// Connection half of the declarative invocation parameters.
///
/// Every field is optional so that a caller's values can be layered over
/// defaults with [`ConnectionParameters::merge`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Directory endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_uri: Option<String>,

    /// Upgrade with StartTLS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_tls: Option<Flag>,

    /// Simple bind DN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Simple bind password.
    #[serde(default, skip_serializing)]
    pub bind_pw: Option<String>,

    /// Verify the server certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_certs: Option<Flag>,

    /// SASL mechanism used without a bind DN: `external` or `none`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_class: Option<String>,

    /// Timeout in seconds for connecting and searching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("server_uri", &self.server_uri)
            .field("start_tls", &self.start_tls)
            .field("bind_dn", &self.bind_dn)
            .field("bind_pw", &self.bind_pw.as_ref().map(|_| "***REDACTED***"))
            .field("validate_certs", &self.validate_certs)
            .field("sasl_class", &self.sasl_class)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionParameters {
    /// Fills every unset field from `defaults`.
    #[must_use]
    pub fn merge(self, defaults: Self) -> Self {
        Self {
            server_uri: self.server_uri.or(defaults.server_uri),
            start_tls: self.start_tls.or(defaults.start_tls),
            bind_dn: self.bind_dn.or(defaults.bind_dn),
            bind_pw: self.bind_pw.or(defaults.bind_pw),
            validate_certs: self.validate_certs.or(defaults.validate_certs),
            sasl_class: self.sasl_class.or(defaults.sasl_class),
            timeout: self.timeout.or(defaults.timeout),
        }
    }

    /// Resolves the parameters into a validated [`ConnectionConfig`].
    pub fn resolve(self) -> SearchResult<ConnectionConfig> {
        let start_tls = match &self.start_tls {
            Some(flag) => flag.coerce("start_tls")?,
            None => false,
        };
        let validate_certs = match &self.validate_certs {
            Some(flag) => flag.coerce("validate_certs")?,
            None => false,
        };

        let bind = match BindMode::from_credentials(self.bind_dn, self.bind_pw) {
            BindMode::External => parse_sasl_class(self.sasl_class.as_deref())?,
            simple => simple,
        };

        let mut builder = ConnectionConfig::builder()
            .start_tls(start_tls)
            .bind(bind)
            .tls_verification(TlsVerification::from_validate_certs(validate_certs));

        if let Some(uri) = self.server_uri.filter(|uri| !uri.trim().is_empty()) {
            builder = builder.server_uri(uri);
        }

        match self.timeout {
            Some(0) => {
                return Err(SearchError::invalid_parameter(
                    "timeout",
                    "must be a positive number of seconds",
                ));
            }
            Some(secs) => builder = builder.timeout(Duration::from_secs(secs)),
            None => {}
        }

        builder.build()
    }
}

fn parse_sasl_class(value: Option<&str>) -> SearchResult<BindMode> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("external") => Ok(BindMode::External),
        Some("none") | Some("anonymous") => Ok(BindMode::Anonymous),
        Some(other) => Err(SearchError::invalid_parameter(
            "sasl_class",
            format!("unsupported mechanism '{other}': expected external or none"),
        )),
    }
}
