//! Per-run execution environment for a recipe.
//!
//! A `RenderingContext` is built once per "instantiate this template into
//! this project" operation, mutated by the executor during the run, and
//! discarded after. It owns the parameter map, the template loader, the
//! accumulated outcome lists, and the flags that select the executor
//! variant.

use std::path::{Path, PathBuf};

use crate::dependency::{Coordinate, DependencyTable};
use crate::params::Params;
use crate::template::TemplateLoader;

/// Which executor variant a context selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Mutate the filesystem and build descriptors.
    Live,
    /// Validate everything, mutate nothing.
    DryRun,
    /// Record which files would be touched, touch nothing.
    FindReferences,
}

/// Execution environment for one recipe run.
#[derive(Debug)]
pub struct RenderingContext {
    /// Label for this batch of changes, used in output.
    pub command_name: String,
    /// Root all relative target paths resolve against.
    pub output_root: PathBuf,
    /// Root of the module whose build descriptor receives dependencies.
    pub module_root: PathBuf,
    /// Parameter map for template substitution and merge filters.
    pub params: Params,
    /// Resolves relative template source paths.
    pub loader: TemplateLoader,
    /// Restricts which existing build declarations may be version-upgraded.
    pub version_filter: Option<String>,
    /// Request an external project re-sync after a live run that modified a
    /// build descriptor.
    pub sync: bool,
    /// Validate without mutating.
    pub dry_run: bool,
    /// Only collect the set of files the recipe would touch.
    pub find_only_references: bool,
    /// Surface recoverable problems as warnings instead of hard failures.
    pub show_errors: bool,

    // Accumulated outcome of the run.
    target_files: Vec<PathBuf>,
    source_files: Vec<PathBuf>,
    files_to_open: Vec<PathBuf>,
    dependencies: DependencyTable,
    plugins: Vec<String>,
    warnings: Vec<String>,
    build_modified: bool,
}

impl RenderingContext {
    /// Start building a context rooted at `output_root`.
    pub fn builder(output_root: impl Into<PathBuf>) -> ContextBuilder {
        ContextBuilder {
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// The executor variant this context's flags select.
    pub fn mode(&self) -> ExecutionMode {
        if self.find_only_references {
            ExecutionMode::FindReferences
        } else if self.dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Live
        }
    }

    pub fn record_target_file(&mut self, path: PathBuf) {
        if !self.target_files.contains(&path) {
            self.target_files.push(path);
        }
    }

    pub fn record_source_file(&mut self, path: PathBuf) {
        if !self.source_files.contains(&path) {
            self.source_files.push(path);
        }
    }

    pub fn record_file_to_open(&mut self, path: PathBuf) {
        self.files_to_open.push(path);
    }

    pub fn add_dependency(&mut self, configuration: &str, coordinate: Coordinate) {
        self.dependencies.add(configuration, coordinate);
    }

    /// Record a plugin, deduplicated by exact name.
    pub fn add_plugin(&mut self, name: &str) {
        if !self.plugins.iter().any(|p| p == name) {
            self.plugins.push(name.to_string());
        }
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub(crate) fn mark_build_modified(&mut self) {
        self.build_modified = true;
    }

    /// Absolute paths of files created or modified by the run.
    pub fn target_files(&self) -> &[PathBuf] {
        &self.target_files
    }

    /// Absolute paths of template sources the run read (or would read).
    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// Files the caller should present to the user afterwards.
    pub fn files_to_open(&self) -> &[PathBuf] {
        &self.files_to_open
    }

    pub fn dependencies(&self) -> &DependencyTable {
        &self.dependencies
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// True when the caller should trigger an external project re-sync:
    /// sync was requested, a build descriptor changed, and this was a live
    /// run.
    pub fn sync_required(&self) -> bool {
        self.sync && self.build_modified && self.mode() == ExecutionMode::Live
    }
}

/// Builder for [`RenderingContext`].
#[derive(Debug, Default)]
pub struct ContextBuilder {
    command_name: Option<String>,
    output_root: PathBuf,
    module_root: Option<PathBuf>,
    template_root: Option<PathBuf>,
    params: Params,
    version_filter: Option<String>,
    sync: bool,
    dry_run: bool,
    find_only_references: bool,
    show_errors: bool,
}

impl ContextBuilder {
    pub fn command_name(mut self, name: impl Into<String>) -> Self {
        self.command_name = Some(name.into());
        self
    }

    /// Defaults to the output root when unset.
    pub fn module_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.module_root = Some(root.into());
        self
    }

    /// Defaults to the output root when unset.
    pub fn template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = Some(root.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn version_filter(mut self, filter: Option<String>) -> Self {
        self.version_filter = filter;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn find_only_references(mut self, find_only_references: bool) -> Self {
        self.find_only_references = find_only_references;
        self
    }

    pub fn show_errors(mut self, show_errors: bool) -> Self {
        self.show_errors = show_errors;
        self
    }

    pub fn build(self) -> RenderingContext {
        let output_root = self.output_root;
        let module_root = self.module_root.unwrap_or_else(|| output_root.clone());
        let template_root = self.template_root.unwrap_or_else(|| output_root.clone());

        RenderingContext {
            command_name: self.command_name.unwrap_or_else(|| "render".to_string()),
            output_root,
            module_root,
            params: self.params,
            loader: TemplateLoader::new(template_root),
            version_filter: self.version_filter,
            sync: self.sync,
            dry_run: self.dry_run,
            find_only_references: self.find_only_references,
            show_errors: self.show_errors,
            target_files: Vec::new(),
            source_files: Vec::new(),
            files_to_open: Vec::new(),
            dependencies: DependencyTable::new(),
            plugins: Vec::new(),
            warnings: Vec::new(),
            build_modified: false,
        }
    }
}

impl RenderingContext {
    /// Resolve a relative target path against the output root.
    pub fn target_path(&self, to: &Path) -> PathBuf {
        if to.is_absolute() {
            to.to_path_buf()
        } else {
            self.output_root.join(to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderingContext {
        RenderingContext::builder("/out").build()
    }

    #[test]
    fn test_mode_selection() {
        let live = ctx();
        assert_eq!(live.mode(), ExecutionMode::Live);

        let dry = RenderingContext::builder("/out").dry_run(true).build();
        assert_eq!(dry.mode(), ExecutionMode::DryRun);

        // Reference collection takes precedence over dry-run.
        let refs = RenderingContext::builder("/out")
            .dry_run(true)
            .find_only_references(true)
            .build();
        assert_eq!(refs.mode(), ExecutionMode::FindReferences);
    }

    #[test]
    fn test_module_root_defaults_to_output_root() {
        let c = ctx();
        assert_eq!(c.module_root, PathBuf::from("/out"));
    }

    #[test]
    fn test_plugin_dedupe() {
        let mut c = ctx();
        c.add_plugin("kotlin-android");
        c.add_plugin("kotlin-android");
        assert_eq!(c.plugins(), &["kotlin-android".to_string()]);
    }

    #[test]
    fn test_target_path_resolution() {
        let c = ctx();
        assert_eq!(
            c.target_path(Path::new("src/App.kt")),
            PathBuf::from("/out/src/App.kt")
        );
        assert_eq!(
            c.target_path(Path::new("/abs/file")),
            PathBuf::from("/abs/file")
        );
    }

    #[test]
    fn test_sync_requires_live_run_and_modification() {
        let mut c = RenderingContext::builder("/out").sync(true).build();
        assert!(!c.sync_required());
        c.mark_build_modified();
        assert!(c.sync_required());

        let mut dry = RenderingContext::builder("/out")
            .sync(true)
            .dry_run(true)
            .build();
        dry.mark_build_modified();
        assert!(!dry.sync_required());
    }
}
