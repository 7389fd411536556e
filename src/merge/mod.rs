//! Merge strategies - per-filetype policies for reconciling freshly
//! generated content with an existing destination file.

mod build;
mod markup;
mod settings;

pub use build::{apply_plugins, merge_dependencies, new_build_file, parse_declarations};
pub use markup::merge_markup;
pub use settings::merge_settings;

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    /// The destination's role has no merge policy. Recoverable taxonomy.
    #[error("cannot merge this file type: {0}")]
    Unsupported(String),
    #[error("markup parse error: {0}")]
    Markup(String),
    #[error("invalid dependency declaration: {0}")]
    Declaration(String),
}

/// The merge policy a destination file gets, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Module-inclusion settings file: union of include statements.
    Settings,
    /// Build descriptor: dependency-declaration merge.
    Build,
    /// XML-like structured markup: element-identity merge.
    Markup,
    /// No merge policy.
    Other,
}

impl FileRole {
    pub fn of(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match name {
            "settings.gradle" | "settings.gradle.kts" => FileRole::Settings,
            "build.gradle" | "build.gradle.kts" => FileRole::Build,
            _ if name.ends_with(".xml") => FileRole::Markup,
            _ => FileRole::Other,
        }
    }
}

/// Merge `source` into `existing` according to the destination's role.
///
/// `version_filter` constrains which existing build-file declarations are
/// eligible for version upgrades (prefix match on the declared version).
pub fn merge(
    to: &Path,
    source: &str,
    existing: &str,
    version_filter: Option<&str>,
) -> Result<String, MergeError> {
    match FileRole::of(to) {
        FileRole::Settings => Ok(merge_settings(source, existing)),
        FileRole::Build => {
            let declarations = parse_declarations(source)?;
            Ok(merge_dependencies(existing, &declarations, version_filter))
        }
        FileRole::Markup => merge_markup(source, existing),
        FileRole::Other => Err(MergeError::Unsupported(to.display().to_string())),
    }
}

/// Whitespace-insensitive content comparison, used to detect idempotent
/// writes: two texts are equivalent when their whitespace-separated token
/// streams match.
pub fn content_equivalent(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}
