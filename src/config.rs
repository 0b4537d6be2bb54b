use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::LoaderError;
use crate::models::schema::TableId;
use crate::naming::Namer;

/// Recognized run options. Keys use camelCase when read from JSON.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Restrict introspection to one schema; empty means every schema the
    /// catalog reports.
    pub schema_name: String,
    /// Regex a table must match to be loaded. Matched against the qualified
    /// `schema.table` name whenever the catalog reports a schema: PostgreSQL
    /// always does, so `^usr_` matches nothing there while `^public\.usr_`
    /// or `\.usr_` does. MySQL tables from the default database and all
    /// SQLite tables are matched by bare name.
    pub table_include: Option<String>,
    /// Regex that rejects a table even when it matched `table_include`.
    /// Same match target as `table_include`.
    pub table_exclude: Option<String>,
    pub infer_relationships: bool,
    pub qualify_monikers_with_schema: bool,
    pub inflection_overrides: HashMap<String, String>,
    pub moniker_overrides: HashMap<String, String>,
    pub capability_extensions: CapabilityExtensions,
    pub debug_logging: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            schema_name: String::new(),
            table_include: None,
            table_exclude: None,
            infer_relationships: true,
            qualify_monikers_with_schema: false,
            inflection_overrides: HashMap::new(),
            moniker_overrides: HashMap::new(),
            capability_extensions: CapabilityExtensions::default(),
            debug_logging: false,
        }
    }
}

impl LoaderOptions {
    pub fn from_json_str(json: &str) -> Result<Self, LoaderError> {
        serde_json::from_str(json).map_err(|e| LoaderError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    /// Compiles the table patterns and checks capability names. Runs before
    /// any catalog access so a bad option never reaches the database.
    pub fn validate(&self) -> Result<TableFilter, LoaderError> {
        self.capability_extensions.validate()?;
        TableFilter::new(self.table_include.as_deref(), self.table_exclude.as_deref())
    }

    pub fn namer(&self) -> Namer {
        Namer::new(self.qualify_monikers_with_schema)
            .with_moniker_overrides(&self.moniker_overrides)
            .with_inflection_overrides(&self.inflection_overrides)
    }
}

/// Compiled include/exclude patterns, matched against a table's qualified
/// name. Exclusion wins over inclusion.
#[derive(Debug, Clone)]
pub struct TableFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl TableFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, LoaderError> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    pub fn accepts(&self, table: &TableId) -> bool {
        let name = table.qualified_name();
        let included = self
            .include
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(&name));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&name));
        included && !excluded
    }
}

/// Capability tags attached to every entity, grouped by where they sit in
/// the application order.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilityExtensions {
    pub pre_core: Vec<String>,
    pub vendor: Vec<String>,
    pub additional: Vec<String>,
    pub post_core: Vec<String>,
}

impl CapabilityExtensions {
    pub fn validate(&self) -> Result<(), LoaderError> {
        let invalid = self
            .pre_core
            .iter()
            .chain(&self.vendor)
            .chain(&self.additional)
            .chain(&self.post_core)
            .find(|name| !is_capability_name(name));
        match invalid {
            Some(name) => Err(LoaderError::Config(format!(
                "invalid capability name {:?}",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Pre-core, vendor-provided (adapter tags first, then configured ones),
    /// additional, post-core. A tag listed twice keeps its first position.
    pub fn ordered(&self, adapter_vendor: &[String]) -> Vec<String> {
        let mut ordered: Vec<String> = Vec::new();
        let all = self
            .pre_core
            .iter()
            .chain(adapter_vendor)
            .chain(&self.vendor)
            .chain(&self.additional)
            .chain(&self.post_core);
        for name in all {
            if !ordered.contains(name) {
                ordered.push(name.clone());
            }
        }
        ordered
    }
}

/// Identifier segments separated by `::`, e.g. `inflate_column` or
/// `PK::Auto`.
fn is_capability_name(name: &str) -> bool {
    !name.is_empty()
        && name.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
