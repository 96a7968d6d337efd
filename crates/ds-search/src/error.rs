//! Search error types.
//!
//! ## Security Note
//!
//! Error messages must not leak the bind password. Diagnostics carried by
//! these errors come from the directory server or the transport, never from
//! the connection credentials.

use thiserror::Error;

/// LDAP result code for `noSuchObject`.
pub const NO_SUCH_OBJECT: u32 = 32;

/// Errors produced while validating, connecting or searching.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Scope token is not one of the accepted values.
    #[error("invalid scope '{0}': expected one of base, onelevel, subordinate, children")]
    InvalidScope(String),

    /// Attribute selector is not a string or a list of strings.
    #[error("invalid attribute list: {0}")]
    InvalidAttributeList(String),

    /// Any other invalid input parameter.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name as given by the caller.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Invalid connection configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting, upgrading to TLS or binding failed.
    #[error("{message}")]
    Connection {
        /// What was being attempted.
        message: String,
        /// Diagnostic from the server or transport.
        diagnostic: Option<String>,
    },

    /// The search base does not exist on the server.
    #[error("search base not found: {0}")]
    SearchBaseNotFound(String),

    /// Any other directory protocol failure.
    #[error("search failed: {diagnostic}")]
    Protocol {
        /// LDAP result code, when the server returned one.
        code: Option<u32>,
        /// Original diagnostic text.
        diagnostic: String,
    },

    /// The operation exceeded the configured timeout.
    #[error("LDAP operation timed out")]
    Timeout,
}

impl SearchError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error carrying the underlying diagnostic.
    #[must_use]
    pub fn connection(message: impl Into<String>, diagnostic: impl ToString) -> Self {
        Self::Connection {
            message: message.into(),
            diagnostic: Some(diagnostic.to_string()),
        }
    }

    /// Creates a protocol error from an LDAP result code and its text.
    #[must_use]
    pub fn protocol(code: u32, diagnostic: impl Into<String>) -> Self {
        Self::Protocol {
            code: Some(code),
            diagnostic: diagnostic.into(),
        }
    }

    /// Checks if the error was raised before any network activity.
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidScope(_)
                | Self::InvalidAttributeList(_)
                | Self::InvalidParameter { .. }
                | Self::Configuration(_)
        )
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }

    /// Returns the LDAP result code, if any.
    #[must_use]
    pub const fn result_code(&self) -> Option<u32> {
        match self {
            Self::Protocol { code, .. } => *code,
            Self::SearchBaseNotFound(_) => Some(NO_SUCH_OBJECT),
            _ => None,
        }
    }

    /// Returns the underlying server or transport diagnostic, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Connection { diagnostic, .. } => diagnostic.as_deref(),
            Self::Protocol { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }

    /// Classifies a transport error raised by `ldap3`.
    ///
    /// Non-zero result codes keep their code and the server's text;
    /// everything else keeps the transport's message.
    pub(crate) fn from_ldap3(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => Self::protocol(result.rc, result.text),
            ldap3::LdapError::Timeout { .. } => Self::Timeout,
            other => Self::Protocol {
                code: None,
                diagnostic: other.to_string(),
            },
        }
    }
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
