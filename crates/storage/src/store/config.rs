#![forbid(unsafe_code)]

use super::StoreError;
use nested_core::HookSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Table layout and hook behaviour of one tree.
///
/// Column names are spliced into SQL, so every one of them is checked by
/// [`TreeConfig::validate`] before a store accepts the config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub table: String,
    pub id_column: String,
    pub parent_column: String,
    pub name_column: String,
    pub left_column: String,
    pub right_column: String,
    pub level_column: String,
    pub busy_timeout_ms: u64,
    pub hooks: HookSettings,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            table: "nodes".to_string(),
            id_column: "id".to_string(),
            parent_column: "parent_id".to_string(),
            name_column: "name".to_string(),
            left_column: "lft".to_string(),
            right_column: "rgt".to_string(),
            level_column: "level".to_string(),
            busy_timeout_ms: 5_000,
            hooks: HookSettings::default(),
        }
    }
}

impl TreeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, StoreError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_identifier(&self.table)?;
        let columns = self.columns();
        for column in columns {
            validate_identifier(column)?;
        }
        let distinct: BTreeSet<&str> = columns.iter().copied().collect();
        if distinct.len() != columns.len() {
            return Err(StoreError::InvalidInput("tree columns must be distinct"));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Managed columns in select order: id, parent, lft, rgt, level, name.
    pub(crate) fn columns(&self) -> [&str; 6] {
        [
            &self.id_column,
            &self.parent_column,
            &self.left_column,
            &self.right_column,
            &self.level_column,
            &self.name_column,
        ]
    }
}

fn validate_identifier(value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput("sql identifier must not be empty"));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(StoreError::InvalidInput("sql identifier is too long"));
    }
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(StoreError::InvalidInput("sql identifier must not be empty"));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(StoreError::InvalidInput(
            "sql identifier must start with a letter or '_'",
        ));
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(StoreError::InvalidInput(
            "sql identifier may only contain letters, digits and '_'",
        ));
    }
    Ok(())
}

/// Quoted identifiers of a validated config, ready to splice into statements.
#[derive(Clone, Debug)]
pub(crate) struct SqlNames {
    pub(crate) table: String,
    pub(crate) id: String,
    pub(crate) parent: String,
    pub(crate) name: String,
    pub(crate) lft: String,
    pub(crate) rgt: String,
    pub(crate) level: String,
}

impl SqlNames {
    pub(crate) fn new(config: &TreeConfig) -> Self {
        Self {
            table: quote(&config.table),
            id: quote(&config.id_column),
            parent: quote(&config.parent_column),
            name: quote(&config.name_column),
            lft: quote(&config.left_column),
            rgt: quote(&config.right_column),
            level: quote(&config.level_column),
        }
    }

    pub(crate) fn select_list(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}",
            self.id, self.parent, self.lft, self.rgt, self.level, self.name
        )
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}
