//! Search execution.
//!
//! The executor issues exactly one search per request and shapes the
//! server's entries into [`SearchRecords`].

use tracing::{debug, info, instrument};

use crate::connection::{DirectorySession, SessionFactory};
use crate::error::{SearchError, SearchResult, NO_SUCH_OBJECT};
use crate::params::{SearchParameters, SearchRequest, SearchScope};
use crate::record::{DirectoryEntry, SearchOutcome, SearchRecords};

/// Runs a normalized search against a session.
#[derive(Debug, Clone)]
pub struct SearchExecutor {
    request: SearchRequest,
}

impl SearchExecutor {
    /// Creates an executor for a normalized request.
    #[must_use]
    pub const fn new(request: SearchRequest) -> Self {
        Self { request }
    }

    /// Normalizes parameters into an executor without touching the network.
    pub fn from_parameters(params: &SearchParameters) -> SearchResult<Self> {
        params.normalize().map(Self::new)
    }

    /// Issues the search and shapes the results.
    ///
    /// ## Errors
    ///
    /// `noSuchObject` on the search base becomes
    /// [`SearchError::SearchBaseNotFound`]; every other failure propagates
    /// with its original diagnostic.
    #[instrument(skip(self, session), fields(request = %self.request))]
    pub async fn run<S: DirectorySession>(&self, session: &mut S) -> SearchResult<SearchOutcome> {
        debug!(
            attributes = ?self.request.attributes,
            types_only = self.request.types_only(),
            "Issuing LDAP search"
        );

        let entries = session
            .search(&self.request)
            .await
            .map_err(|e| self.classify(e))?;

        let entries = self.apply_scope(entries);
        let results = SearchRecords::shape(entries, &self.request.output);

        info!(count = results.len(), "LDAP search completed");

        Ok(SearchOutcome::new(results))
    }

    fn classify(&self, err: SearchError) -> SearchError {
        match err.result_code() {
            Some(NO_SUCH_OBJECT) => SearchError::SearchBaseNotFound(self.request.base_dn.clone()),
            _ => err,
        }
    }

    /// Drops the base entry for subordinate searches, which are sent as
    /// subtree searches.
    fn apply_scope(&self, entries: Vec<DirectoryEntry>) -> Vec<DirectoryEntry> {
        if self.request.scope != SearchScope::Subordinate {
            return entries;
        }
        entries
            .into_iter()
            .filter(|entry| !same_dn(&entry.dn, &self.request.base_dn))
            .collect()
    }
}

/// Compares two DNs ignoring case and spaces around separators.
fn same_dn(a: &str, b: &str) -> bool {
    fn canonical(dn: &str) -> Vec<String> {
        dn.split(',')
            .map(|rdn| {
                rdn.split('=')
                    .map(|part| part.trim().to_ascii_lowercase())
                    .collect::<Vec<_>>()
                    .join("=")
            })
            .collect()
    }
    canonical(a) == canonical(b)
}

/// Validates the parameters, obtains a session and runs one search.
///
/// Validation happens before the factory is asked for a session, so input
/// errors never cause network activity. The factory is called at most once.
pub async fn execute<F: SessionFactory>(
    params: &SearchParameters,
    factory: &mut F,
) -> SearchResult<SearchOutcome> {
    let executor = SearchExecutor::from_parameters(params)?;
    let session = factory.connect().await?;
    executor.run(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AttributeSelector;

    /// Session returning canned entries or a canned server result.
    struct StubSession {
        entries: Vec<DirectoryEntry>,
        error: Option<(u32, String)>,
        requests: Vec<SearchRequest>,
    }

    impl StubSession {
        fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
            Self {
                entries,
                error: None,
                requests: Vec::new(),
            }
        }

        fn failing(code: u32, text: &str) -> Self {
            Self {
                entries: Vec::new(),
                error: Some((code, text.to_string())),
                requests: Vec::new(),
            }
        }
    }

    impl DirectorySession for StubSession {
        async fn search(&mut self, request: &SearchRequest) -> SearchResult<Vec<DirectoryEntry>> {
            self.requests.push(request.clone());
            match &self.error {
                Some((code, text)) => Err(SearchError::from_ldap3(ldap3::LdapError::LdapResult {
                    result: ldap3::LdapResult {
                        rc: *code,
                        matched: String::new(),
                        text: text.clone(),
                        refs: Vec::new(),
                        ctrls: Vec::new(),
                    },
                })),
                None => Ok(self.entries.clone()),
            }
        }
    }

    fn groups() -> Vec<DirectoryEntry> {
        vec![
            DirectoryEntry::new("cn=admins,ou=groups,dc=example,dc=com").with_attr("gidNumber", ["5000"]),
            DirectoryEntry::new("cn=users,ou=groups,dc=example,dc=com").with_attr("gidNumber", ["5001"]),
        ]
    }

    #[tokio::test]
    async fn issues_exactly_one_search() {
        let executor = SearchExecutor::from_parameters(
            &SearchParameters::new("ou=groups,dc=example,dc=com")
                .scope("onelevel")
                .attrs("gidNumber"),
        )
        .unwrap();
        let mut session = StubSession::with_entries(groups());

        let outcome = executor.run(&mut session).await.unwrap();

        assert_eq!(session.requests.len(), 1);
        let sent = &session.requests[0];
        assert_eq!(sent.scope, SearchScope::OneLevel);
        assert_eq!(sent.attributes, AttributeSelector::Only(vec!["gidNumber".to_string()]));
        assert!(outcome.executed);
        assert_eq!(outcome.count, 2);
    }

    #[tokio::test]
    async fn no_such_object_becomes_base_not_found() {
        let executor =
            SearchExecutor::from_parameters(&SearchParameters::new("ou=nowhere,dc=example,dc=com"))
                .unwrap();
        let mut session = StubSession::failing(NO_SUCH_OBJECT, "no such entry");

        let err = executor.run(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::SearchBaseNotFound(dn) if dn == "ou=nowhere,dc=example,dc=com"
        ));
    }

    #[tokio::test]
    async fn base_not_found_reports_dn_as_given() {
        let given = " ou=Nowhere, dc=example,dc=com";
        let executor = SearchExecutor::from_parameters(&SearchParameters::new(given)).unwrap();
        let mut session = StubSession::failing(NO_SUCH_OBJECT, "");

        let err = executor.run(&mut session).await.unwrap_err();
        assert_eq!(session.requests[0].base_dn, given);
        assert!(matches!(err, SearchError::SearchBaseNotFound(dn) if dn == given));
    }

    #[tokio::test]
    async fn other_protocol_errors_pass_through() {
        let executor =
            SearchExecutor::from_parameters(&SearchParameters::new("dc=example,dc=com")).unwrap();
        let mut session = StubSession::failing(50, "insufficient access");

        let err = executor.run(&mut session).await.unwrap_err();
        assert_eq!(err.result_code(), Some(50));
        assert_eq!(err.diagnostic(), Some("insufficient access"));
    }

    #[tokio::test]
    async fn subordinate_scope_drops_base_entry() {
        let executor = SearchExecutor::from_parameters(
            &SearchParameters::new("ou=groups,dc=example,dc=com").scope("subordinate"),
        )
        .unwrap();
        let mut entries = groups();
        entries.insert(0, DirectoryEntry::new("ou=Groups, dc=Example, dc=com"));
        let mut session = StubSession::with_entries(entries);

        let outcome = executor.run(&mut session).await.unwrap();
        assert_eq!(
            outcome.results.dns(),
            vec![
                "cn=admins,ou=groups,dc=example,dc=com",
                "cn=users,ou=groups,dc=example,dc=com",
            ]
        );
    }

    #[tokio::test]
    async fn subtree_scope_keeps_base_entry() {
        let executor = SearchExecutor::from_parameters(
            &SearchParameters::new("ou=groups,dc=example,dc=com").scope("children"),
        )
        .unwrap();
        let mut entries = groups();
        entries.insert(0, DirectoryEntry::new("ou=groups,dc=example,dc=com"));
        let mut session = StubSession::with_entries(entries);

        let outcome = executor.run(&mut session).await.unwrap();
        assert_eq!(outcome.count, 3);
    }

    #[test]
    fn dn_comparison() {
        assert!(same_dn("ou=Groups, dc=Example,dc=com", "ou=groups,dc=example,dc=com"));
        assert!(!same_dn("cn=a,ou=groups,dc=example,dc=com", "ou=groups,dc=example,dc=com"));
    }
}
