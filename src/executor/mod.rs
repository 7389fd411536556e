//! Recipe executors - perform or simulate each instruction's effect.
//!
//! One trait, three strategies, selected once from the context's flags:
//! [`LiveExecutor`] mutates the filesystem, [`DryRunExecutor`] validates
//! everything and mutates nothing, [`FindReferencesExecutor`] only records
//! which files a recipe would touch.

mod dry_run;
mod error;
mod live;
mod refs;

pub use dry_run::DryRunExecutor;
pub use error::ExecuteError;
pub use live::LiveExecutor;
pub use refs::FindReferencesExecutor;

use std::path::{Component, Path, PathBuf};

use crate::context::{ExecutionMode, RenderingContext};
use crate::dependency::{CLASSPATH_CONFIGURATION, Coordinate};
use crate::merge::{self, MergeError, content_equivalent};
use crate::template::{self, TemplateError};

/// The capability set every execution mode implements.
///
/// Operations that only touch context bookkeeping (dependency, classpath,
/// plugin, open, folder stack) behave identically across modes and are
/// provided here; the file-producing operations and the Final flush differ
/// per strategy.
pub trait RecipeExecutor {
    /// Copy a file or directory tree verbatim.
    fn copy(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError>;

    /// Render a template and write the result.
    fn instantiate(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError>;

    /// Merge rendered source content into an existing destination.
    fn merge(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError>;

    /// Concatenate source text after existing destination text.
    fn append(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError>;

    /// Create a directory and all missing ancestors.
    fn mk_dir(&mut self, ctx: &mut RenderingContext, at: &Path) -> Result<(), ExecuteError>;

    /// The one-time Final flush: reconcile accumulated dependencies and
    /// plugins into the build descriptors.
    fn finish(&mut self, ctx: &mut RenderingContext) -> Result<(), ExecuteError>;

    fn add_dependency(
        &mut self,
        ctx: &mut RenderingContext,
        configuration: &str,
        coordinate: &str,
    ) -> Result<(), ExecuteError> {
        let coordinate: Coordinate = coordinate.parse()?;
        ctx.add_dependency(configuration, coordinate);
        Ok(())
    }

    fn add_classpath(
        &mut self,
        ctx: &mut RenderingContext,
        coordinate: &str,
    ) -> Result<(), ExecuteError> {
        let coordinate: Coordinate = coordinate.parse()?;
        ctx.add_dependency(CLASSPATH_CONFIGURATION, coordinate);
        Ok(())
    }

    fn apply_plugin(
        &mut self,
        ctx: &mut RenderingContext,
        name: &str,
    ) -> Result<(), ExecuteError> {
        ctx.add_plugin(name);
        Ok(())
    }

    fn open(&mut self, ctx: &mut RenderingContext, file: &Path) -> Result<(), ExecuteError> {
        let target = resolve_target(ctx, file)?;
        ctx.record_file_to_open(target);
        Ok(())
    }

    fn push_folder(
        &mut self,
        ctx: &mut RenderingContext,
        folder: &Path,
    ) -> Result<(), ExecuteError> {
        ctx.loader.push_folder(folder);
        Ok(())
    }

    fn pop_folder(&mut self, ctx: &mut RenderingContext) -> Result<(), ExecuteError> {
        if ctx.loader.pop_folder() {
            Ok(())
        } else {
            Err(ExecuteError::FolderStackUnderflow)
        }
    }
}

/// Select the executor variant for a context. Exactly one variant is active
/// per run.
pub fn executor_for(mode: ExecutionMode) -> Box<dyn RecipeExecutor> {
    match mode {
        ExecutionMode::Live => Box::new(LiveExecutor::new()),
        ExecutionMode::DryRun => Box::new(DryRunExecutor::new()),
        ExecutionMode::FindReferences => Box::new(FindReferencesExecutor::new()),
    }
}

/// Resolve a target path to absolute, rejecting anything that would land
/// outside the output root.
pub(crate) fn resolve_target(
    ctx: &RenderingContext,
    to: &Path,
) -> Result<PathBuf, ExecuteError> {
    if to.is_absolute() {
        if !to.starts_with(&ctx.output_root) {
            return Err(ExecuteError::PathEscape(to.to_path_buf()));
        }
        return Ok(to.to_path_buf());
    }
    if to.components().any(|c| c == Component::ParentDir) {
        return Err(ExecuteError::PathEscape(to.to_path_buf()));
    }
    Ok(ctx.output_root.join(to))
}

/// Resolve a template source path against the loader's current base and
/// record it, requiring it to exist.
pub(crate) fn resolve_source(
    ctx: &mut RenderingContext,
    from: &Path,
) -> Result<PathBuf, ExecuteError> {
    let source = ctx.loader.resolve(from);
    if !source.exists() {
        return Err(ExecuteError::MissingSource(source));
    }
    ctx.record_source_file(source.clone());
    Ok(source)
}

/// Report a divergent existing destination: a warning in lenient mode, a
/// hard failure otherwise. Never overwrites.
pub(crate) fn report_exists(
    ctx: &mut RenderingContext,
    target: &Path,
) -> Result<(), ExecuteError> {
    if ctx.show_errors {
        ctx.warn(format!(
            "The following file could not be created since it already exists: {}",
            target.display()
        ));
        Ok(())
    } else {
        Err(ExecuteError::FileExists(target.to_path_buf()))
    }
}

/// Compare new content against an existing file: text compares ignoring
/// whitespace-only differences, binary compares byte for byte.
pub(crate) fn content_matches_file(content: &[u8], path: &Path) -> Result<bool, ExecuteError> {
    let existing = std::fs::read(path)?;
    match (std::str::from_utf8(content), std::str::from_utf8(&existing)) {
        (Ok(a), Ok(b)) => Ok(content_equivalent(a, b)),
        _ => Ok(content == existing.as_slice()),
    }
}

/// Compare two files the same way [`content_matches_file`] does.
pub(crate) fn files_equivalent(a: &Path, b: &Path) -> Result<bool, ExecuteError> {
    let bytes = std::fs::read(a)?;
    content_matches_file(&bytes, b)
}

/// Validate that a write under `dir` could succeed: the nearest existing
/// ancestor must be a writable directory. Used by live runs before writes
/// and by dry runs as the whole check.
pub(crate) fn check_dir_writable(dir: &Path) -> Result<(), ExecuteError> {
    let mut probe = dir;
    loop {
        if probe.exists() {
            let meta = std::fs::metadata(probe)?;
            if !meta.is_dir() || meta.permissions().readonly() {
                return Err(ExecuteError::NotWritable(dir.to_path_buf()));
            }
            return Ok(());
        }
        match probe.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => probe = parent,
            _ => return Ok(()),
        }
    }
}

/// Render template text, mapping an undefined parameter to the recoverable
/// taxonomy: `Ok(None)` means "warned and skipped" in lenient mode.
pub(crate) fn render_source(
    ctx: &mut RenderingContext,
    source_path: &Path,
    text: &str,
) -> Result<Option<String>, ExecuteError> {
    match template::render(text, &ctx.params) {
        Ok(rendered) => Ok(Some(rendered)),
        Err(TemplateError::Undefined(name)) if ctx.show_errors => {
            ctx.warn(format!(
                "Skipped {}: undefined template parameter: {}",
                source_path.display(),
                name
            ));
            Ok(None)
        }
        Err(source) => Err(ExecuteError::Template {
            path: source_path.to_path_buf(),
            source,
        }),
    }
}

/// Merge source into existing content for the destination's role, mapping
/// an unsupported file type to the recoverable taxonomy.
pub(crate) fn merge_source(
    ctx: &mut RenderingContext,
    target: &Path,
    source: &str,
    existing: &str,
) -> Result<Option<String>, ExecuteError> {
    match merge::merge(target, source, existing, ctx.version_filter.as_deref()) {
        Ok(merged) => Ok(Some(merged)),
        Err(MergeError::Unsupported(path)) if ctx.show_errors => {
            ctx.warn(format!("Cannot merge this file type: {}", path));
            Ok(None)
        }
        Err(source) => Err(ExecuteError::Merge {
            path: target.to_path_buf(),
            source,
        }),
    }
}

/// A build descriptor the Final flush would write.
pub(crate) struct FlushFile {
    pub path: PathBuf,
    pub content: String,
    pub changed: bool,
}

/// Compute the Final flush: the build descriptors that receive accumulated
/// dependencies, classpath entries, and plugins, with their new contents.
pub(crate) fn flush_plan(ctx: &RenderingContext) -> Result<Vec<FlushFile>, ExecuteError> {
    let module_file = ctx.module_root.join("build.gradle");
    let project_file = ctx.output_root.join("build.gradle");

    let mut module_decls: Vec<(String, Coordinate)> = ctx
        .dependencies()
        .module_entries()
        .map(|(cfg, c)| (cfg.to_string(), c.clone()))
        .collect();
    let classpath: Vec<(String, Coordinate)> = ctx
        .dependencies()
        .classpath_entries()
        .iter()
        .map(|c| (CLASSPATH_CONFIGURATION.to_string(), c.clone()))
        .collect();
    let plugins = ctx.plugins().to_vec();
    let filter = ctx.version_filter.as_deref();

    let mut plan = Vec::new();

    if module_file == project_file {
        // Single descriptor receives everything.
        module_decls.extend(classpath);
        if !module_decls.is_empty() || !plugins.is_empty() {
            plan.push(plan_module_file(&module_file, &module_decls, &plugins, filter)?);
        }
        return Ok(plan);
    }

    if !module_decls.is_empty() || !plugins.is_empty() {
        plan.push(plan_module_file(&module_file, &module_decls, &plugins, filter)?);
    }
    if !classpath.is_empty() {
        plan.push(plan_classpath_file(&project_file, &classpath, filter)?);
    }
    Ok(plan)
}

/// The descriptor paths the Final flush would touch, resolved without
/// reading any file contents (the reference collector must not do I/O).
pub(crate) fn flush_plan_paths(ctx: &RenderingContext) -> Vec<PathBuf> {
    let module_file = ctx.module_root.join("build.gradle");
    let project_file = ctx.output_root.join("build.gradle");

    let has_module = ctx.dependencies().module_entries().next().is_some()
        || !ctx.plugins().is_empty();
    let has_classpath = !ctx.dependencies().classpath_entries().is_empty();

    let mut paths = Vec::new();
    if has_module || (has_classpath && module_file == project_file) {
        paths.push(module_file.clone());
    }
    if has_classpath && module_file != project_file {
        paths.push(project_file);
    }
    paths
}

fn plan_module_file(
    path: &Path,
    declarations: &[(String, Coordinate)],
    plugins: &[String],
    filter: Option<&str>,
) -> Result<FlushFile, ExecuteError> {
    if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        let mut content = merge::merge_dependencies(&existing, declarations, filter);
        content = merge::apply_plugins(&content, plugins);
        let changed = !content_equivalent(&content, &existing);
        return Ok(FlushFile {
            path: path.to_path_buf(),
            content,
            changed,
        });
    }
    let content = merge::new_build_file(plugins, declarations);
    Ok(FlushFile {
        path: path.to_path_buf(),
        changed: !content.is_empty(),
        content,
    })
}

fn plan_classpath_file(
    path: &Path,
    declarations: &[(String, Coordinate)],
    filter: Option<&str>,
) -> Result<FlushFile, ExecuteError> {
    if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        let content = merge::merge_dependencies(&existing, declarations, filter);
        let changed = !content_equivalent(&content, &existing);
        return Ok(FlushFile {
            path: path.to_path_buf(),
            content,
            changed,
        });
    }

    let mut content = String::from("buildscript {\n    dependencies {\n");
    for (configuration, coordinate) in declarations {
        content.push_str(&format!("        {} \"{}\"\n", configuration, coordinate));
    }
    content.push_str("    }\n}\n");
    Ok(FlushFile {
        path: path.to_path_buf(),
        content,
        changed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderingContext;

    fn ctx(root: &Path) -> RenderingContext {
        RenderingContext::builder(root).show_errors(true).build()
    }

    #[test]
    fn test_resolve_target_rejects_traversal() {
        let c = ctx(Path::new("/out"));
        assert!(matches!(
            resolve_target(&c, Path::new("../evil")),
            Err(ExecuteError::PathEscape(_))
        ));
        assert!(matches!(
            resolve_target(&c, Path::new("/elsewhere/file")),
            Err(ExecuteError::PathEscape(_))
        ));
    }

    #[test]
    fn test_resolve_target_accepts_inside_paths() {
        let c = ctx(Path::new("/out"));
        assert_eq!(
            resolve_target(&c, Path::new("a/b.txt")).unwrap(),
            PathBuf::from("/out/a/b.txt")
        );
        assert_eq!(
            resolve_target(&c, Path::new("/out/a/b.txt")).unwrap(),
            PathBuf::from("/out/a/b.txt")
        );
    }

    #[test]
    fn test_report_exists_modes() {
        let dir = tempfile::tempdir().unwrap();
        let mut lenient = ctx(dir.path());
        report_exists(&mut lenient, Path::new("/out/x")).unwrap();
        assert_eq!(lenient.warnings().len(), 1);

        let mut strict = RenderingContext::builder(dir.path()).build();
        assert!(matches!(
            report_exists(&mut strict, Path::new("/out/x")),
            Err(ExecuteError::FileExists(_))
        ));
    }

    #[test]
    fn test_content_matches_file_ignores_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "fn main() {}\n").unwrap();
        assert!(content_matches_file(b"fn  main() {}", &path).unwrap());
        assert!(!content_matches_file(b"fn other() {}", &path).unwrap());
    }

    #[test]
    fn test_flush_plan_single_descriptor_gets_classpath_too() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        c.add_dependency("implementation", "g:a:1.0".parse().unwrap());
        c.add_dependency(CLASSPATH_CONFIGURATION, "g:tool:7.0".parse().unwrap());

        let plan = flush_plan(&c).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].content.contains("implementation \"g:a:1.0\""));
        assert!(plan[0].content.contains("classpath \"g:tool:7.0\""));
    }

    #[test]
    fn test_flush_plan_split_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("app");
        std::fs::create_dir_all(&module).unwrap();

        let mut c = RenderingContext::builder(dir.path())
            .module_root(&module)
            .build();
        c.add_dependency("implementation", "g:a:1.0".parse().unwrap());
        c.add_dependency(CLASSPATH_CONFIGURATION, "g:tool:7.0".parse().unwrap());

        let plan = flush_plan(&c).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].path, module.join("build.gradle"));
        assert!(plan[1].content.contains("buildscript {"));
    }

    #[test]
    fn test_flush_plan_empty_table_plans_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let c = ctx(dir.path());
        assert!(flush_plan(&c).unwrap().is_empty());
    }
}
