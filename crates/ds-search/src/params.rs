//! Declarative search parameters and their normalization.
//!
//! [`SearchParameters`] is what a caller hands in (from JSON, flags or
//! code). [`SearchRequest`] is the normalized form the executor runs.
//! Normalization never touches the network, so every error raised here is
//! a validation error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Default search filter.
pub const DEFAULT_FILTER: &str = "(objectClass=*)";

// ============================================================================
// Scope
// ============================================================================

/// Protocol-level search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    /// The base entry only.
    #[default]
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// Everything below the base entry, excluding the base itself.
    Subordinate,
    /// The base entry and everything below it.
    Subtree,
}

impl SearchScope {
    /// Accepted input tokens.
    pub const TOKENS: [&'static str; 4] = ["base", "onelevel", "subordinate", "children"];

    /// Maps an input token to a scope.
    ///
    /// `children` selects the whole subtree.
    pub fn from_token(token: &str) -> SearchResult<Self> {
        match token {
            "base" => Ok(Self::Base),
            "onelevel" => Ok(Self::OneLevel),
            "subordinate" => Ok(Self::Subordinate),
            "children" => Ok(Self::Subtree),
            other => Err(SearchError::InvalidScope(other.to_string())),
        }
    }

    /// Converts to the `ldap3` scope.
    ///
    /// `ldap3` has no subordinate scope; it is sent as a subtree search and
    /// the executor drops the base entry from the results.
    #[must_use]
    pub const fn to_ldap3(&self) -> ldap3::Scope {
        match self {
            Self::Base => ldap3::Scope::Base,
            Self::OneLevel => ldap3::Scope::OneLevel,
            Self::Subordinate | Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

impl FromStr for SearchScope {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

// ============================================================================
// Flag
// ============================================================================

/// Boolean input that also accepts the usual truthy/falsy spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    /// A JSON boolean.
    Bool(bool),
    /// An integer, `0` or `1`.
    Int(i64),
    /// A string such as `yes`, `off` or `1`.
    Text(String),
}

impl Default for Flag {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Flag {
    /// Coerces the flag to a boolean, naming `param` on failure.
    pub fn coerce(&self, param: &str) -> SearchResult<bool> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Int(1) => Ok(true),
            Self::Int(0) => Ok(false),
            Self::Int(other) => Err(SearchError::invalid_parameter(
                param,
                format!("{other} is not a valid boolean"),
            )),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "on" | "1" | "true" | "t" => Ok(true),
                "n" | "no" | "off" | "0" | "false" | "f" => Ok(false),
                _ => Err(SearchError::invalid_parameter(
                    param,
                    format!("'{text}' is not a valid boolean"),
                )),
            },
        }
    }
}

// ============================================================================
// Attribute Selection
// ============================================================================

/// Attribute list as given by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrsInput {
    /// Comma-separated attribute names.
    Csv(String),
    /// A list that must contain only strings.
    List(Vec<serde_json::Value>),
}

impl AttrsInput {
    /// Builds a list input from names.
    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(
            names
                .into_iter()
                .map(|name| serde_json::Value::String(name.into()))
                .collect(),
        )
    }
}

impl From<&str> for AttrsInput {
    fn from(value: &str) -> Self {
        Self::Csv(value.to_string())
    }
}

/// Normalized attribute selection.
///
/// Either every attribute (`All`) or a non-empty list of distinct names in
/// the order first given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttributeSelector {
    /// Request every attribute.
    #[default]
    All,
    /// Request only these attributes.
    Only(Vec<String>),
}

impl AttributeSelector {
    /// Normalizes a caller-supplied attribute list.
    pub fn normalize(input: Option<&AttrsInput>) -> SearchResult<Self> {
        let names: Vec<String> = match input {
            None => return Ok(Self::All),
            Some(AttrsInput::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
            Some(AttrsInput::List(items)) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(name) => Ok(name.clone()),
                    other => Err(SearchError::InvalidAttributeList(format!(
                        "expected attribute names, found {other}"
                    ))),
                })
                .collect::<SearchResult<_>>()?,
        };

        let mut selected: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if !name.is_ascii() {
                return Err(SearchError::InvalidAttributeList(format!(
                    "attribute name '{name}' is not ASCII"
                )));
            }
            if !selected.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                selected.push(name.to_string());
            }
        }

        if selected.is_empty() {
            Ok(Self::All)
        } else {
            Ok(Self::Only(selected))
        }
    }

    /// Returns the names to put on the wire; empty means all attributes.
    #[must_use]
    pub fn wire_names(&self) -> Vec<&str> {
        match self {
            Self::All => Vec::new(),
            Self::Only(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Returns true if an attribute name is selected.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n.eq_ignore_ascii_case(name)),
        }
    }
}

// ============================================================================
// Output Mode
// ============================================================================

/// Shape of the result records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Records with attribute values.
    Values {
        /// Attributes whose values are always rendered as base64.
        base64_attributes: Vec<String>,
    },
    /// Records with attribute names only.
    Schema,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Values {
            base64_attributes: Vec::new(),
        }
    }
}

impl OutputMode {
    /// Returns true for the attributes-only protocol mode.
    #[must_use]
    pub const fn types_only(&self) -> bool {
        matches!(self, Self::Schema)
    }

    /// Returns true if values of `name` must be rendered as base64.
    #[must_use]
    pub fn forces_base64(&self, name: &str) -> bool {
        match self {
            Self::Values { base64_attributes } => base64_attributes
                .iter()
                .any(|attr| attr.eq_ignore_ascii_case(name)),
            Self::Schema => false,
        }
    }
}

// ============================================================================
// Search Parameters
// ============================================================================

/// Declarative search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Search root.
    #[serde(alias = "dn")]
    pub base_dn: String,

    /// Scope token: `base`, `onelevel`, `subordinate` or `children`.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Search filter, passed through verbatim.
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Attribute selection; absent means all attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<AttrsInput>,

    /// Return attribute names only.
    #[serde(default)]
    pub schema: Flag,

    /// Attributes whose values are always rendered as base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_attributes: Option<AttrsInput>,
}

fn default_scope() -> String {
    "base".to_string()
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl SearchParameters {
    /// Creates parameters for a base-scoped search of `base_dn`.
    #[must_use]
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope: default_scope(),
            filter: default_filter(),
            attrs: None,
            schema: Flag::default(),
            base64_attributes: None,
        }
    }

    /// Sets the scope token.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the attribute selection.
    #[must_use]
    pub fn attrs(mut self, attrs: impl Into<AttrsInput>) -> Self {
        self.attrs = Some(attrs.into());
        self
    }

    /// Enables or disables schema-only output.
    #[must_use]
    pub fn schema(mut self, schema: bool) -> Self {
        self.schema = Flag::Bool(schema);
        self
    }

    /// Normalizes the parameters into a [`SearchRequest`].
    ///
    /// Checks run in a fixed order: base DN, scope, attribute list, schema
    /// flag, then base64 attributes.
    pub fn normalize(&self) -> SearchResult<SearchRequest> {
        if self.base_dn.trim().is_empty() {
            return Err(SearchError::invalid_parameter(
                "base_dn",
                "must not be empty",
            ));
        }

        let scope = SearchScope::from_token(&self.scope)?;
        let attributes = AttributeSelector::normalize(self.attrs.as_ref())?;
        let schema_only = self.schema.coerce("schema")?;

        let output = if schema_only {
            OutputMode::Schema
        } else {
            let base64_attributes =
                match AttributeSelector::normalize(self.base64_attributes.as_ref())? {
                    AttributeSelector::All => Vec::new(),
                    AttributeSelector::Only(names) => names,
                };
            OutputMode::Values { base64_attributes }
        };

        let filter = match self.filter.trim() {
            "" => DEFAULT_FILTER.to_string(),
            _ => self.filter.clone(),
        };

        Ok(SearchRequest {
            base_dn: self.base_dn.clone(),
            scope,
            filter,
            // Schema output lists every attribute name on the entry.
            attributes: if schema_only {
                AttributeSelector::All
            } else {
                attributes
            },
            output,
        })
    }
}

// ============================================================================
// Search Request
// ============================================================================

/// Normalized search, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search root.
    pub base_dn: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Search filter.
    pub filter: String,
    /// Requested attributes.
    pub attributes: AttributeSelector,
    /// Result shape.
    pub output: OutputMode,
}

impl SearchRequest {
    /// Returns true if the server should omit values.
    #[must_use]
    pub const fn types_only(&self) -> bool {
        self.output.types_only()
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base={} scope={:?} filter={}",
            self.base_dn, self.scope, self.filter
        )
    }
}
