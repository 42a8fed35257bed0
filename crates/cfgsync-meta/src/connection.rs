//! Database connection strings
//!
//! Accepted forms:
//! - `source=<path>[;license=<key>][;<key>=<value>...]`
//! - a bare path to a snapshot file
//!
//! Keys are case-insensitive. Values are trimmed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parsed connection string pointing at a database snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub source: PathBuf,
    pub license: Option<String>,
    /// Any further `key=value` pairs, keys lowercased
    pub options: BTreeMap<String, String>,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("connection string is empty"));
        }

        if !input.contains('=') {
            return Ok(Self {
                source: PathBuf::from(input),
                license: None,
                options: BTreeMap::new(),
            });
        }

        let mut source = None;
        let mut license = None;
        let mut options = BTreeMap::new();

        for part in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected key=value, got '{part}'")))?;
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();
            match key.as_str() {
                "source" | "data source" => source = Some(PathBuf::from(value)),
                "license" => license = Some(value),
                "" => return Err(invalid(format!("empty key in '{part}'"))),
                _ => {
                    options.insert(key, value);
                }
            }
        }

        let source = source
            .filter(|s| !s.as_os_str().is_empty())
            .ok_or_else(|| invalid("missing 'source'"))?;

        Ok(Self {
            source,
            license,
            options,
        })
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source={}", self.source.display())?;
        if self.license.is_some() {
            write!(f, ";license=***")?;
        }
        for (key, value) in &self.options {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConnectionString {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn bare_path() {
        let conn = ConnectionString::parse("db/snapshot.json").unwrap();
        assert_eq!(conn.source, PathBuf::from("db/snapshot.json"));
        assert!(conn.license.is_none());
    }

    #[test]
    fn keyed_form_with_license_and_options() {
        let conn =
            ConnectionString::parse("Source = db.toml; License=ABC-123; Timeout=30;").unwrap();
        assert_eq!(conn.source, PathBuf::from("db.toml"));
        assert_eq!(conn.license.as_deref(), Some("ABC-123"));
        assert_eq!(conn.options.get("timeout").map(String::as_str), Some("30"));
    }

    #[test]
    fn display_masks_license() {
        let conn = ConnectionString::parse("source=db.json;license=secret").unwrap();
        assert_eq!(conn.to_string(), "source=db.json;license=***");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("license=abc")]
    #[case("source=")]
    #[case("source=db.json;garbage")]
    fn invalid_inputs(#[case] input: &str) {
        assert!(matches!(
            ConnectionString::parse(input),
            Err(Error::InvalidConnectionString { .. })
        ));
    }
}
