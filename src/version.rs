//! Version parsing and ordering for dependency coordinates.
//!
//! Coordinate versions are dotted numeric segments with an optional
//! qualifier: `3.4.0`, `1.0`, `28.0.0-alpha1`. Ordering compares numeric
//! segments pairwise (missing segments count as zero); a release ranks above
//! any qualified build of the same numbers, and qualifiers order lexically
//! (`alpha1` < `beta2` < `rc1`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version: {0}")]
    InvalidFormat(String),
}

/// A dependency version: numeric segments plus optional qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Version {
    segments: Vec<u64>,
    qualifier: Option<String>,
}

impl Version {
    pub fn new(segments: Vec<u64>) -> Self {
        Self {
            segments,
            qualifier: None,
        }
    }

    /// Numeric segment at `idx`, treating missing segments as zero.
    fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidFormat("empty version".to_string()));
        }

        // Split off the qualifier (-alpha1, -beta2, -rc1, ...).
        let (numbers, qualifier) = match s.split_once('-') {
            Some((n, q)) if !q.is_empty() => (n, Some(q.to_string())),
            Some(_) => return Err(VersionError::InvalidFormat(s.to_string())),
            None => (s, None),
        };

        let segments = numbers
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionError::InvalidFormat(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if segments.is_empty() {
            return Err(VersionError::InvalidFormat(s.to_string()));
        }

        Ok(Version {
            segments,
            qualifier,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            match self.segment(idx).cmp(&other.segment(idx)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        // Same numbers: a release outranks its own prereleases.
        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = self
            .segments
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", numbers)?;
        if let Some(ref q) = self.qualifier {
            write!(f, "-{}", q)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(v("1.0").segments, vec![1, 0]);
        assert_eq!(v("3.4.0").segments, vec![3, 4, 0]);
        assert_eq!(v("28.0.0-alpha1").qualifier(), Some("alpha1"));
        assert_eq!(v("7").segments, vec![7]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
        assert!("1.0-".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(v("2.0") > v("1.9.9"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.0") == v("1.0.0"));
        assert!(v("1.0.1") > v("1.0"));
    }

    #[test]
    fn test_release_outranks_prerelease() {
        assert!(v("28.0.0") > v("28.0.0-alpha1"));
        assert!(v("28.0.0-beta1") > v("28.0.0-alpha2"));
        assert!(v("28.0.1-alpha1") > v("28.0.0"));
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["1.0", "3.4.0", "28.0.0-alpha1"] {
            assert_eq!(v(s).to_string(), s);
        }
    }
}
