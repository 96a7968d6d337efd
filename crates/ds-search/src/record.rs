//! Directory entries and the normalized records built from them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ldap3::asn1::{StructureTag, PL};
use ldap3::ResultEntry;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{SearchError, SearchResult};
use crate::params::OutputMode;

/// Protocol tag of a SearchResultEntry.
const SEARCH_RESULT_ENTRY: u64 = 4;

// ============================================================================
// Directory Entry
// ============================================================================

/// A raw entry as returned by the server.
///
/// Attributes keep the server's order and their values stay raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name.
    pub dn: String,

    /// Attribute names with their values, in server order.
    pub attributes: Vec<(String, Vec<Vec<u8>>)>,
}

impl DirectoryEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute with its values.
    #[must_use]
    pub fn with_attr<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        self.attributes
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Returns the values of an attribute (case-insensitive name).
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the attribute names in server order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Builds an entry from a raw `ldap3` search result entry.
    ///
    /// `SearchEntry::construct` collects attributes into hash maps and
    /// splits binary values out; this walks the protocol structure instead
    /// so that attribute order and raw values survive.
    pub fn from_result_entry(entry: ResultEntry) -> SearchResult<Self> {
        let tag = entry.0;
        if tag.id != SEARCH_RESULT_ENTRY {
            return Err(malformed(&format!("unexpected protocol tag {}", tag.id)));
        }

        let mut parts = constructed(tag, "search result entry")?.into_iter();
        let dn = text(next(&mut parts, "entry DN")?, "entry DN")?;
        let attr_list = constructed(next(&mut parts, "attribute list")?, "attribute list")?;

        let mut attributes = Vec::with_capacity(attr_list.len());
        for partial in attr_list {
            let mut fields = constructed(partial, "partial attribute")?.into_iter();
            let name = text(next(&mut fields, "attribute type")?, "attribute type")?;
            let values = constructed(next(&mut fields, "attribute values")?, "attribute values")?
                .into_iter()
                .map(|value| primitive(value, "attribute value"))
                .collect::<SearchResult<Vec<_>>>()?;
            attributes.push((name, values));
        }

        Ok(Self { dn, attributes })
    }
}

fn malformed(what: &str) -> SearchError {
    SearchError::Protocol {
        code: None,
        diagnostic: format!("malformed search result: {what}"),
    }
}

fn next(parts: &mut impl Iterator<Item = StructureTag>, what: &str) -> SearchResult<StructureTag> {
    parts.next().ok_or_else(|| malformed(&format!("missing {what}")))
}

fn constructed(tag: StructureTag, what: &str) -> SearchResult<Vec<StructureTag>> {
    match tag.payload {
        PL::C(children) => Ok(children),
        PL::P(_) => Err(malformed(&format!("{what} is not constructed"))),
    }
}

fn primitive(tag: StructureTag, what: &str) -> SearchResult<Vec<u8>> {
    match tag.payload {
        PL::P(bytes) => Ok(bytes),
        PL::C(_) => Err(malformed(&format!("{what} is not primitive"))),
    }
}

fn text(tag: StructureTag, what: &str) -> SearchResult<String> {
    String::from_utf8(primitive(tag, what)?)
        .map_err(|_| malformed(&format!("{what} is not valid UTF-8")))
}

// ============================================================================
// Values
// ============================================================================

/// How a value is rendered in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    /// UTF-8 text.
    Text,
    /// Standard base64.
    Base64,
}

/// A raw attribute value together with its output rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBytes {
    bytes: Vec<u8>,
    encoding: ValueEncoding,
}

impl ValueBytes {
    /// Wraps raw bytes, rendering them as text when they are valid UTF-8
    /// and base64 is not forced.
    #[must_use]
    pub fn new(bytes: Vec<u8>, force_base64: bool) -> Self {
        let encoding = if !force_base64 && std::str::from_utf8(&bytes).is_ok() {
            ValueEncoding::Text
        } else {
            ValueEncoding::Base64
        };
        Self { bytes, encoding }
    }

    /// Returns the raw value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the output rendering.
    #[must_use]
    pub const fn encoding(&self) -> ValueEncoding {
        self.encoding
    }

    /// Renders the value as it appears in the output.
    #[must_use]
    pub fn render(&self) -> String {
        match self.encoding {
            ValueEncoding::Text => String::from_utf8_lossy(&self.bytes).into_owned(),
            ValueEncoding::Base64 => STANDARD.encode(&self.bytes),
        }
    }
}

impl Serialize for ValueBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// An attribute's values after collapsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Exactly one value.
    Scalar(ValueBytes),
    /// Zero or several values, in server order.
    List(Vec<ValueBytes>),
}

impl AttrValue {
    /// Collapses a single-element list to a scalar.
    ///
    /// An empty list stays an empty list.
    #[must_use]
    pub fn collapse(mut values: Vec<ValueBytes>) -> Self {
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return Self::Scalar(value);
            }
        }
        Self::List(values)
    }

    /// Expands back into the list of values.
    #[must_use]
    pub fn into_values(self) -> Vec<ValueBytes> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::List(values) => values,
        }
    }

    /// Returns the scalar value, if this is one.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&ValueBytes> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::List(values) => values.len(),
        }
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Records
// ============================================================================

/// An entry with its attribute values.
///
/// Serializes as a flat map: `dn` first, then one key per attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// Distinguished name.
    pub dn: String,
    /// Attributes in server order.
    pub attributes: Vec<(String, AttrValue)>,
}

impl NormalizedRecord {
    /// Normalizes an entry, collapsing single values to scalars.
    #[must_use]
    pub fn from_entry(entry: DirectoryEntry, output: &OutputMode) -> Self {
        let attributes = entry
            .attributes
            .into_iter()
            // The record's own `dn` key takes precedence.
            .filter(|(name, _)| !name.eq_ignore_ascii_case("dn"))
            .map(|(name, values)| {
                let force = output.forces_base64(&name);
                let values = values
                    .into_iter()
                    .map(|bytes| ValueBytes::new(bytes, force))
                    .collect();
                (name, AttrValue::collapse(values))
            })
            .collect();

        Self {
            dn: entry.dn,
            attributes,
        }
    }

    /// Gets an attribute (case-insensitive name).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 1))?;
        map.serialize_entry("dn", &self.dn)?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// An entry reduced to its attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRecord {
    /// Distinguished name.
    pub dn: String,
    /// Attribute names in server order.
    pub attrs: Vec<String>,
}

impl SchemaRecord {
    /// Keeps the names of an entry, discarding every value.
    #[must_use]
    pub fn from_entry(entry: DirectoryEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attributes.into_iter().map(|(name, _)| name).collect(),
        }
    }
}

/// Result records of one search, all of the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchRecords {
    /// Records with values.
    Values(Vec<NormalizedRecord>),
    /// Records with attribute names only.
    Schema(Vec<SchemaRecord>),
}

impl SearchRecords {
    /// Shapes raw entries according to the output mode.
    #[must_use]
    pub fn shape(entries: Vec<DirectoryEntry>, output: &OutputMode) -> Self {
        match output {
            OutputMode::Schema => {
                Self::Schema(entries.into_iter().map(SchemaRecord::from_entry).collect())
            }
            OutputMode::Values { .. } => Self::Values(
                entries
                    .into_iter()
                    .map(|entry| NormalizedRecord::from_entry(entry, output))
                    .collect(),
            ),
        }
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Values(records) => records.len(),
            Self::Schema(records) => records.len(),
        }
    }

    /// Returns true if the search matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the DNs of all records.
    #[must_use]
    pub fn dns(&self) -> Vec<&str> {
        match self {
            Self::Values(records) => records.iter().map(|r| r.dn.as_str()).collect(),
            Self::Schema(records) => records.iter().map(|r| r.dn.as_str()).collect(),
        }
    }
}

/// Top-level result of a successful search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    /// The search ran; always true on success.
    pub executed: bool,
    /// Number of records.
    pub count: usize,
    /// The records.
    pub results: SearchRecords,
}

impl SearchOutcome {
    /// Wraps the records of an executed search.
    #[must_use]
    pub fn new(results: SearchRecords) -> Self {
        Self {
            executed: true,
            count: results.len(),
            results,
        }
    }
}
