//! Directory connection management.
//!
//! One [`ConnectionProvider`] owns at most one bound session for the
//! lifetime of an invocation. The session is opened on first use and reused
//! afterwards; there is no pooling and no reconnection.

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, SearchOptions};
use tracing::{debug, info, instrument, warn};

use crate::config::{BindMode, ConnectionConfig};
use crate::error::{SearchError, SearchResult};
use crate::params::SearchRequest;
use crate::record::DirectoryEntry;

// ============================================================================
// Seams
// ============================================================================

/// A bound session able to run one search.
#[allow(async_fn_in_trait)]
pub trait DirectorySession {
    /// Runs the search and returns the raw entries in server order.
    ///
    /// Failures carry the server's result code when there is one.
    async fn search(&mut self, request: &SearchRequest) -> SearchResult<Vec<DirectoryEntry>>;
}

/// Something that hands out a bound session.
#[allow(async_fn_in_trait)]
pub trait SessionFactory {
    /// Session type.
    type Session: DirectorySession;

    /// Returns the session, opening it on the first call.
    async fn connect(&mut self) -> SearchResult<&mut Self::Session>;
}

// ============================================================================
// Connection Provider
// ============================================================================

/// Lazily opens and caches one bound LDAP session.
pub struct ConnectionProvider {
    config: ConnectionConfig,
    session: Option<LdapSession>,
}

impl ConnectionProvider {
    /// Creates a provider; nothing is opened yet.
    pub fn new(config: ConnectionConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session: None,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns true once a session has been opened.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the bound session, opening it on the first call.
    pub async fn get_connection(&mut self) -> SearchResult<&mut LdapSession> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.open().await?,
        };
        Ok(self.session.insert(session))
    }

    /// Unbinds the session, if one was opened.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.ldap.unbind().await {
                warn!(error = %e, "LDAP unbind failed");
            }
        }
    }

    /// Connects, optionally upgrades with StartTLS, and binds.
    #[instrument(skip(self), fields(uri = %self.config.server_uri, bind = self.config.bind.mechanism()))]
    async fn open(&self) -> SearchResult<LdapSession> {
        let config = &self.config;

        let mut settings = LdapConnSettings::new()
            .set_starttls(config.start_tls)
            .set_no_tls_verify(!config.tls_verification.is_required());
        if let Some(timeout) = config.connect_timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        if config.uses_tls() && !config.tls_verification.is_required() {
            warn!("TLS server certificate will not be verified");
        }

        debug!(start_tls = config.start_tls, "Connecting to LDAP server");

        // With StartTLS enabled the upgrade happens inside the connect call,
        // before any bind.
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.server_uri)
            .await
            .map_err(|e| {
                if matches!(e, ldap3::LdapError::Timeout { .. }) {
                    return SearchError::Timeout;
                }
                let what = if config.start_tls {
                    "failed to connect and start TLS"
                } else {
                    "failed to connect"
                };
                SearchError::connection(format!("{what} to {}", config.server_uri), e)
            })?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let Some(timeout) = config.connect_timeout {
            ldap.with_timeout(timeout);
        }
        bind(&mut ldap, &config.bind).await?;

        info!(uri = %config.server_uri, "LDAP connection established");

        Ok(LdapSession {
            ldap,
            search_timeout: config.search_timeout,
        })
    }
}

impl SessionFactory for ConnectionProvider {
    type Session = LdapSession;

    async fn connect(&mut self) -> SearchResult<&mut LdapSession> {
        self.get_connection().await
    }
}

/// Performs the bind step.
///
/// ## Security
///
/// The password is passed to the server only; it is never logged and
/// never part of the returned error.
async fn bind(ldap: &mut Ldap, mode: &BindMode) -> SearchResult<()> {
    let result = match mode {
        BindMode::Anonymous => return Ok(()),
        BindMode::Simple { dn, password } => {
            debug!(bind_dn = %dn, "Performing simple bind");
            ldap.simple_bind(dn, password).await
        }
        BindMode::External => {
            debug!("Performing SASL EXTERNAL bind");
            ldap.sasl_external_bind().await
        }
    };

    let what = match mode.dn() {
        Some(dn) => format!("LDAP bind failed for {dn}"),
        None => format!("LDAP {} bind failed", mode.mechanism()),
    };

    result
        .and_then(ldap3::LdapResult::success)
        .map_err(|e| bind_error(&what, e))?;

    Ok(())
}

/// Classifies a failed bind; non-zero result codes keep the server's text.
fn bind_error(what: &str, err: ldap3::LdapError) -> SearchError {
    match err {
        ldap3::LdapError::Timeout { .. } => SearchError::Timeout,
        ldap3::LdapError::LdapResult { result } => SearchError::Connection {
            message: format!("{what} (result code {})", result.rc),
            diagnostic: Some(result.text),
        },
        other => SearchError::connection(what, other),
    }
}

// ============================================================================
// LDAP Session
// ============================================================================

/// A bound `ldap3` session.
pub struct LdapSession {
    ldap: Ldap,
    search_timeout: Option<std::time::Duration>,
}

impl DirectorySession for LdapSession {
    #[instrument(skip(self, request), fields(base = %request.base_dn, scope = ?request.scope))]
    async fn search(&mut self, request: &SearchRequest) -> SearchResult<Vec<DirectoryEntry>> {
        let ldap = &mut self.ldap;
        ldap.with_search_options(SearchOptions::new().typesonly(request.types_only()));
        if let Some(timeout) = self.search_timeout {
            ldap.with_timeout(timeout);
        }

        let (entries, _result) = ldap
            .search(
                &request.base_dn,
                request.scope.to_ldap3(),
                &request.filter,
                request.attributes.wire_names(),
            )
            .await
            .map_err(SearchError::from_ldap3)?
            .success()
            .map_err(SearchError::from_ldap3)?;

        entries
            .into_iter()
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(DirectoryEntry::from_result_entry)
            .collect()
    }
}
