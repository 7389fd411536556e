//! Parameter maps supplied by the caller.
//!
//! Parameters drive template substitution and merge-strategy filters. They
//! load from TOML or JSON files, or from `key=value` command-line pairs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// A parameter value: scalar, list, or nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Render this value as substitution text. Lists and maps have no
    /// scalar form and return None.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::Str(s) => Some(s.clone()),
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Int(n) => Some(n.to_string()),
            ParamValue::Float(n) => Some(n.to_string()),
            ParamValue::List(_) | ParamValue::Map(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

/// String-keyed parameter map with dotted-path lookup into nested maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from a TOML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read params file: {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse params file: {}", path.display())),
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse params file: {}", path.display())),
            other => bail!(
                "unsupported params file extension {:?} (expected .toml or .json)",
                other.unwrap_or("")
            ),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert from a `key=value` pair as passed on the command line.
    /// Values parse as bool or integer when they look like one.
    pub fn set_pair(&mut self, pair: &str) -> Result<()> {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got: {}", pair))?;
        let value = match value {
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            v => v
                .parse::<i64>()
                .map(ParamValue::Int)
                .unwrap_or_else(|_| ParamValue::Str(v.to_string())),
        };
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    /// Look up a possibly dotted path (`project.name`) through nested maps.
    pub fn lookup(&self, path: &str) -> Option<&ParamValue> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            match current {
                ParamValue::Map(m) => current = m.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Convenience: look up a string-valued parameter.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        match self.lookup(path)? {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_lookup() {
        let mut inner = BTreeMap::new();
        inner.insert("name".to_string(), ParamValue::Str("demo".into()));
        let mut params = Params::new();
        params.set("project", ParamValue::Map(inner));

        assert_eq!(
            params.lookup("project.name"),
            Some(&ParamValue::Str("demo".into()))
        );
        assert_eq!(params.lookup("project.missing"), None);
        assert_eq!(params.lookup("missing"), None);
    }

    #[test]
    fn test_set_pair_types() {
        let mut params = Params::new();
        params.set_pair("flag=true").unwrap();
        params.set_pair("count=3").unwrap();
        params.set_pair("name=demo").unwrap();

        assert_eq!(params.lookup("flag"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.lookup("count"), Some(&ParamValue::Int(3)));
        assert_eq!(params.lookup("name"), Some(&ParamValue::Str("demo".into())));
    }

    #[test]
    fn test_set_pair_rejects_bare_key() {
        assert!(Params::new().set_pair("oops").is_err());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.toml");
        std::fs::write(&path, "name = \"demo\"\ncount = 2\n\n[project]\nid = \"x\"\n").unwrap();

        let params = Params::load(&path).unwrap();
        assert_eq!(params.get_str("name"), Some("demo"));
        assert_eq!(params.lookup("count"), Some(&ParamValue::Int(2)));
        assert_eq!(params.get_str("project.id"), Some("x"));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"name": "demo", "nested": {"on": true}}"#).unwrap();

        let params = Params::load(&path).unwrap();
        assert_eq!(params.get_str("name"), Some("demo"));
        assert_eq!(params.lookup("nested.on"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(ParamValue::Int(7).as_text(), Some("7".into()));
        assert_eq!(ParamValue::Bool(false).as_text(), Some("false".into()));
        assert_eq!(ParamValue::List(vec![]).as_text(), None);
    }
}
