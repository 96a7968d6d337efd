//! # ds-search
//!
//! Single-shot LDAP search with normalized, serializable results.
//!
//! A search runs in three steps:
//!
//! 1. [`SearchParameters`] are normalized into a [`SearchRequest`]
//!    (scope, attribute list and output mode). Invalid input is rejected
//!    here, before any network activity.
//! 2. A [`SessionFactory`] (normally a [`ConnectionProvider`]) hands out
//!    one bound session.
//! 3. [`SearchExecutor`] issues exactly one search and folds the entries
//!    into [`SearchRecords`]: single values collapse to scalars, or only
//!    attribute names are kept in schema mode.
//!
//! This crate uses `ldap3` for the directory protocol.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod params;
pub mod record;
pub mod search;

pub use config::{BindMode, ConnectionConfig, ConnectionParameters, TlsVerification};
pub use connection::{ConnectionProvider, DirectorySession, LdapSession, SessionFactory};
pub use error::{SearchError, SearchResult};
pub use params::{AttributeSelector, AttrsInput, Flag, OutputMode, SearchParameters, SearchRequest, SearchScope};
pub use record::{
    AttrValue, DirectoryEntry, NormalizedRecord, SchemaRecord, SearchOutcome, SearchRecords,
    ValueBytes,
};
pub use search::{execute, SearchExecutor};
