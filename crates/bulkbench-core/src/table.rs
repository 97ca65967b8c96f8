use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validated, optionally schema-qualified table name that is safe to splice into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Parses and validates a table name such as `test_json_inserts` or `bench.inserts`.
    pub fn parse(name: &str) -> Result<Self, BenchError> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 {
            return Err(BenchError::configuration(format!(
                "table name `{name}` has more than one schema qualifier"
            )));
        }
        for part in &parts {
            validate_identifier(part).map_err(|reason| {
                BenchError::configuration(format!("invalid table name `{name}`: {reason}"))
            })?;
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_identifier(ident: &str) -> Result<(), &'static str> {
    let mut chars = ident.chars();
    match chars.next() {
        None => return Err("empty identifier"),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Err("identifiers must start with a letter or underscore"),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("identifiers may only contain letters, digits and underscores");
    }
    if ident.len() > MAX_IDENTIFIER_LEN {
        return Err("identifier exceeds 63 bytes");
    }
    Ok(())
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = BenchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TableName> for String {
    fn from(table: TableName) -> Self {
        table.0
    }
}
