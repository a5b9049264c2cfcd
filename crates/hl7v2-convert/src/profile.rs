//! Version profile lookup
//!
//! Profiles describe, per HL7 version, which segments exist, the data type
//! and table binding of each field, and the codes each table allows. The
//! migration engine only reads them through [`ProfileService`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Definition of one field position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub data_type: String,
    pub table_binding: Option<String>,
}

impl FieldDef {
    pub fn new(data_type: impl Into<String>) -> Self {
        FieldDef {
            data_type: data_type.into(),
            table_binding: None,
        }
    }

    /// Bind to a code table
    pub fn bound_to(mut self, table_id: impl Into<String>) -> Self {
        self.table_binding = Some(table_id.into());
        self
    }
}

/// Definition of one segment, fields keyed by 1-based position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentDef {
    pub name: String,
    pub fields: BTreeMap<usize, FieldDef>,
}

impl SegmentDef {
    pub fn new(name: impl Into<String>) -> Self {
        SegmentDef {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, index: usize, def: FieldDef) -> Self {
        self.fields.insert(index, def);
        self
    }
}

/// Read-only profile lookup
pub trait ProfileService: Send + Sync {
    fn segment_definition(&self, version: &str, segment: &str) -> Option<SegmentDef>;

    fn field_definition(&self, version: &str, segment: &str, index: usize) -> Option<FieldDef> {
        self.segment_definition(version, segment)
            .and_then(|def| def.fields.get(&index).cloned())
    }

    fn is_version_supported(&self, version: &str) -> bool;

    /// `Err` carries the reason the code is not acceptable
    fn validate_table_value(&self, table_id: &str, code: &str, version: &str) -> Result<(), String>;

    /// Segment names defined for `version`
    fn segment_names(&self, _version: &str) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Clone, Debug, Default)]
struct VersionProfile {
    segments: BTreeMap<String, SegmentDef>,
    tables: HashMap<String, BTreeSet<String>>,
}

/// In-memory profile set
#[derive(Clone, Debug, Default)]
pub struct ProfileRegistry {
    versions: HashMap<String, VersionProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a version with no definitions yet
    pub fn with_version(mut self, version: &str) -> Self {
        self.versions.entry(version.to_string()).or_default();
        self
    }

    pub fn with_segment(mut self, version: &str, def: SegmentDef) -> Self {
        self.add_segment(version, def);
        self
    }

    pub fn with_table<I, S>(mut self, version: &str, table_id: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_table(version, table_id, codes);
        self
    }

    pub fn add_segment(&mut self, version: &str, def: SegmentDef) {
        self.versions
            .entry(version.to_string())
            .or_default()
            .segments
            .insert(def.name.clone(), def);
    }

    pub fn add_table<I, S>(&mut self, version: &str, table_id: &str, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions
            .entry(version.to_string())
            .or_default()
            .tables
            .insert(table_id.to_string(), codes.into_iter().map(Into::into).collect());
    }

    /// Registered versions, sorted
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.versions.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }
}

impl ProfileService for ProfileRegistry {
    fn segment_definition(&self, version: &str, segment: &str) -> Option<SegmentDef> {
        self.versions.get(version)?.segments.get(segment).cloned()
    }

    fn field_definition(&self, version: &str, segment: &str, index: usize) -> Option<FieldDef> {
        self.versions
            .get(version)?
            .segments
            .get(segment)?
            .fields
            .get(&index)
            .cloned()
    }

    fn is_version_supported(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    fn validate_table_value(&self, table_id: &str, code: &str, version: &str) -> Result<(), String> {
        let profile = self
            .versions
            .get(version)
            .ok_or_else(|| format!("Version {} is not supported", version))?;
        match profile.tables.get(table_id) {
            Some(codes) if codes.contains(code) => Ok(()),
            Some(_) => Err(format!(
                "Code '{}' is not in table {} for version {}",
                code, table_id, version
            )),
            None => {
                tracing::debug!("Table {} not loaded for version {}, accepting '{}'", table_id, version, code);
                Ok(())
            }
        }
    }

    fn segment_names(&self, version: &str) -> Vec<String> {
        self.versions
            .get(version)
            .map(|p| p.segments.keys().cloned().collect())
            .unwrap_or_default()
    }
}
