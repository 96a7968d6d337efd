//! Common test utilities and fixtures.

use ds_search::{
    DirectoryEntry, DirectorySession, SearchError, SearchRequest, SearchResult, SearchScope,
    SessionFactory,
};

/// Initializes test logging once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ds_search=debug")
        .with_test_writer()
        .try_init();
}

/// In-memory directory that answers searches the way a server would.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: Vec<DirectoryEntry>,
    /// Every request received, in order.
    pub requests: Vec<SearchRequest>,
}

impl MemoryDirectory {
    /// Creates a directory holding `entries`.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            requests: Vec::new(),
        }
    }

    /// Sample tree with an organization, two groups and a user.
    pub fn sample() -> Self {
        Self::new(vec![
            DirectoryEntry::new("dc=example,dc=com")
                .with_attr("objectClass", ["top", "domain"])
                .with_attr("dc", ["example"]),
            DirectoryEntry::new("ou=groups,dc=example,dc=com")
                .with_attr("objectClass", ["top", "organizationalUnit"])
                .with_attr("ou", ["groups"]),
            DirectoryEntry::new("cn=admins,ou=groups,dc=example,dc=com")
                .with_attr("objectClass", ["top", "posixGroup"])
                .with_attr("cn", ["admins"])
                .with_attr("gidNumber", ["5000"])
                .with_attr("memberUid", ["alice", "bob"]),
            DirectoryEntry::new("cn=users,ou=groups,dc=example,dc=com")
                .with_attr("objectClass", ["top", "posixGroup"])
                .with_attr("cn", ["users"])
                .with_attr("gidNumber", ["5001"]),
            DirectoryEntry::new("uid=alice,ou=people,dc=example,dc=com")
                .with_attr("objectClass", ["top", "inetOrgPerson"])
                .with_attr("uid", ["alice"])
                .with_attr("jpegPhoto", [vec![0xffu8, 0xd8, 0xff, 0xe0]]),
        ])
    }

    fn find(&self, dn: &str) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|e| e.dn.eq_ignore_ascii_case(dn))
    }
}

/// Returns the parent DN, or `None` for a single-RDN name.
fn parent(dn: &str) -> Option<&str> {
    dn.split_once(',').map(|(_, rest)| rest)
}

fn is_descendant(dn: &str, base: &str) -> bool {
    let dn = dn.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    dn.len() > base.len() && dn.ends_with(&format!(",{base}"))
}

/// Evaluates `(objectClass=*)` and single `(attr=value)` equality filters.
fn matches(entry: &DirectoryEntry, filter: &str) -> bool {
    let inner = filter.trim_start_matches('(').trim_end_matches(')');
    let Some((attr, value)) = inner.split_once('=') else {
        return false;
    };
    match entry.values(attr) {
        Some(_) if value == "*" => true,
        Some(values) => values
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value.as_bytes())),
        None => false,
    }
}

impl DirectorySession for MemoryDirectory {
    async fn search(&mut self, request: &SearchRequest) -> SearchResult<Vec<DirectoryEntry>> {
        self.requests.push(request.clone());

        if self.find(&request.base_dn).is_none() {
            return Err(SearchError::protocol(32, "no such object"));
        }

        let base = request.base_dn.as_str();
        let entries = self
            .entries
            .iter()
            .filter(|e| match request.scope {
                SearchScope::Base => e.dn.eq_ignore_ascii_case(base),
                SearchScope::OneLevel => {
                    parent(&e.dn).is_some_and(|p| p.eq_ignore_ascii_case(base))
                }
                // Subordinate goes out as a subtree search
                SearchScope::Subordinate | SearchScope::Subtree => {
                    e.dn.eq_ignore_ascii_case(base) || is_descendant(&e.dn, base)
                }
            })
            .filter(|e| matches(e, &request.filter))
            .map(|e| project(e, request))
            .collect();

        Ok(entries)
    }
}

fn project(entry: &DirectoryEntry, request: &SearchRequest) -> DirectoryEntry {
    let mut out = DirectoryEntry::new(entry.dn.clone());
    for (name, values) in &entry.attributes {
        if !request.attributes.contains(name) {
            continue;
        }
        let values = if request.types_only() {
            Vec::new()
        } else {
            values.clone()
        };
        out.attributes.push((name.clone(), values));
    }
    out
}

/// Factory that counts how often a session is requested.
#[derive(Debug, Default)]
pub struct CountingFactory {
    /// The directory handed out.
    pub directory: MemoryDirectory,
    /// Number of `connect` calls.
    pub connects: usize,
    /// Fails every connect with this message when set.
    pub refuse: Option<String>,
}

impl CountingFactory {
    /// Creates a factory over the sample tree.
    pub fn sample() -> Self {
        Self {
            directory: MemoryDirectory::sample(),
            ..Default::default()
        }
    }
}

impl SessionFactory for CountingFactory {
    type Session = MemoryDirectory;

    async fn connect(&mut self) -> SearchResult<&mut MemoryDirectory> {
        self.connects += 1;
        if let Some(message) = &self.refuse {
            return Err(SearchError::connection(
                "failed to connect to ldap://ldap.example.com",
                message,
            ));
        }
        Ok(&mut self.directory)
    }
}
