//! Dependency records accumulated during a recipe run.
//!
//! Dependencies are `(configuration, coordinate)` pairs collected while
//! instructions execute; reconciling them into build descriptors is deferred
//! to the Final step.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::version::Version;

/// Configuration name used for buildscript classpath entries.
pub const CLASSPATH_CONFIGURATION: &str = "classpath";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("invalid coordinate (expected group:artifact[:version]): {0}")]
    InvalidFormat(String),
}

/// A `group:artifact:version` coordinate. The version is optional: entries
/// without one are expected to be pinned elsewhere (e.g. by a platform
/// import) and never participate in version comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
}

impl Coordinate {
    /// True when both coordinates name the same group and artifact,
    /// regardless of version.
    pub fn same_artifact(&self, other: &Coordinate) -> bool {
        self.group == other.group && self.artifact == other.artifact
    }

    /// Parsed form of the version, when present and well-formed.
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(|v| v.parse().ok())
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let group = parts.next().unwrap_or_default();
        let artifact = parts.next().unwrap_or_default();
        let version = parts.next();

        if group.is_empty()
            || artifact.is_empty()
            || version == Some("")
            || parts.next().is_some()
        {
            return Err(CoordinateError::InvalidFormat(s.to_string()));
        }

        Ok(Coordinate {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if let Some(ref v) = self.version {
            write!(f, ":{}", v)?;
        }
        Ok(())
    }
}

/// Multi-valued mapping of configuration name to coordinates.
///
/// Duplicates collapse on insert: when a coordinate matching ignoring
/// version already exists in the configuration, the higher version wins.
#[derive(Debug, Clone, Default)]
pub struct DependencyTable {
    entries: BTreeMap<String, Vec<Coordinate>>,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a coordinate under a configuration.
    pub fn add(&mut self, configuration: &str, coordinate: Coordinate) {
        let list = self.entries.entry(configuration.to_string()).or_default();

        if let Some(existing) = list.iter_mut().find(|c| c.same_artifact(&coordinate)) {
            let incoming = coordinate.parsed_version();
            let current = existing.parsed_version();
            if let (Some(incoming), Some(current)) = (incoming, current) {
                if incoming > current {
                    existing.version = coordinate.version;
                }
            }
            return;
        }

        list.push(coordinate);
    }

    /// Coordinates recorded under a configuration, in first-seen order.
    pub fn get(&self, configuration: &str) -> &[Coordinate] {
        self.entries
            .get(configuration)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All (configuration, coordinate) pairs, configurations sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.entries
            .iter()
            .flat_map(|(cfg, list)| list.iter().map(move |c| (cfg.as_str(), c)))
    }

    /// Pairs excluding the classpath configuration (those flush into the
    /// project-level descriptor instead of the module one).
    pub fn module_entries(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.iter().filter(|(cfg, _)| *cfg != CLASSPATH_CONFIGURATION)
    }

    /// Buildscript classpath coordinates.
    pub fn classpath_entries(&self) -> &[Coordinate] {
        self.get(CLASSPATH_CONFIGURATION)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(s: &str) -> Coordinate {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_coordinate() {
        let c = coord("com.squareup.okio:okio:3.4.0");
        assert_eq!(c.group, "com.squareup.okio");
        assert_eq!(c.artifact, "okio");
        assert_eq!(c.version.as_deref(), Some("3.4.0"));
    }

    #[test]
    fn test_parse_versionless_coordinate() {
        let c = coord("com.example:bom-pinned");
        assert_eq!(c.version, None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("just-a-name".parse::<Coordinate>().is_err());
        assert!(":missing:1.0".parse::<Coordinate>().is_err());
        assert!("a:b:1.0:extra".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_identical_coordinates_collapse() {
        let mut table = DependencyTable::new();
        table.add("implementation", coord("g:a:1.0"));
        table.add("implementation", coord("g:a:1.0"));
        assert_eq!(table.get("implementation").len(), 1);
    }

    #[test]
    fn test_higher_version_wins_either_order() {
        for (first, second) in [("g:a:1.0", "g:a:2.0"), ("g:a:2.0", "g:a:1.0")] {
            let mut table = DependencyTable::new();
            table.add("implementation", coord(first));
            table.add("implementation", coord(second));
            let kept = &table.get("implementation")[0];
            assert_eq!(kept.version.as_deref(), Some("2.0"));
        }
    }

    #[test]
    fn test_configurations_kept_apart() {
        let mut table = DependencyTable::new();
        table.add("implementation", coord("g:a:1.0"));
        table.add("api", coord("g:a:2.0"));
        assert_eq!(table.get("implementation")[0].version.as_deref(), Some("1.0"));
        assert_eq!(table.get("api")[0].version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_classpath_split() {
        let mut table = DependencyTable::new();
        table.add("implementation", coord("g:a:1.0"));
        table.add(CLASSPATH_CONFIGURATION, coord("g:tool:7.0.0"));

        assert_eq!(table.module_entries().count(), 1);
        assert_eq!(table.classpath_entries().len(), 1);
    }
}
