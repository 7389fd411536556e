//! Dry-run executor - every validation a live run performs, with zero
//! filesystem mutation.
//!
//! Warnings come out identical to a live run over the same tree, so a
//! caller can pre-flight a recipe and show conflicts before committing.

use std::path::Path;

use walkdir::WalkDir;

use crate::context::RenderingContext;
use crate::recipe::TEMPLATE_SUFFIX;
use crate::template::squish_empty_lines;

use super::{
    ExecuteError, RecipeExecutor, check_dir_writable, content_matches_file, files_equivalent,
    flush_plan, merge_source, render_source, report_exists, resolve_source, resolve_target,
};

/// Executor that validates without mutating.
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }

    /// The write-side validation of a single file: existing-destination
    /// comparison exactly like a live copy, writability check otherwise.
    fn check_leaf(
        &self,
        ctx: &mut RenderingContext,
        source: &Path,
        target: &Path,
    ) -> Result<(), ExecuteError> {
        if target.exists() {
            if !files_equivalent(source, target)? {
                report_exists(ctx, target)?;
            }
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            check_dir_writable(parent)?;
        }
        ctx.record_target_file(target.to_path_buf());
        Ok(())
    }

    fn check_write(
        &self,
        ctx: &mut RenderingContext,
        target: &Path,
    ) -> Result<(), ExecuteError> {
        if let Some(parent) = target.parent() {
            check_dir_writable(parent)?;
        }
        ctx.record_target_file(target.to_path_buf());
        Ok(())
    }
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeExecutor for DryRunExecutor {
    fn copy(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        if !source.is_dir() {
            return self.check_leaf(ctx, &source, &target);
        }
        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(|e| {
                ExecuteError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "walk failed")
                }))
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&source)
                .expect("walkdir yields children of its root");
            self.check_leaf(ctx, entry.path(), &target.join(rel))?;
        }
        Ok(())
    }

    fn instantiate(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        if source.extension().is_none() {
            if !source.is_dir() {
                return Err(ExecuteError::NotADirectory(source));
            }
            return self.copy(ctx, from, to);
        }

        let text = std::fs::read_to_string(&source)?;
        let Some(rendered) = render_source(ctx, &source, &text)? else {
            return Ok(());
        };
        let content = squish_empty_lines(&rendered);

        if target.exists() {
            if !content_matches_file(content.as_bytes(), &target)? {
                report_exists(ctx, &target)?;
            }
            return Ok(());
        }
        self.check_write(ctx, &target)
    }

    fn merge(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        let raw = std::fs::read_to_string(&source)?;
        let content = if from.to_string_lossy().ends_with(TEMPLATE_SUFFIX) {
            match render_source(ctx, &source, &raw)? {
                Some(rendered) => rendered,
                None => return Ok(()),
            }
        } else {
            raw
        };

        if !target.exists() {
            return self.check_write(ctx, &target);
        }

        let existing = std::fs::read_to_string(&target)?;
        let Some(merged) = merge_source(ctx, &target, &content, &existing)? else {
            return Ok(());
        };
        if crate::merge::content_equivalent(&merged, &existing) {
            return Ok(());
        }
        self.check_write(ctx, &target)
    }

    fn append(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        // Reading both sides validates them; the concatenation result is
        // discarded.
        std::fs::read_to_string(&source)?;
        if target.exists() {
            std::fs::read_to_string(&target)?;
        }
        self.check_write(ctx, &target)
    }

    fn mk_dir(&mut self, ctx: &mut RenderingContext, at: &Path) -> Result<(), ExecuteError> {
        let target = resolve_target(ctx, at)?;
        check_dir_writable(&target)
    }

    fn finish(&mut self, ctx: &mut RenderingContext) -> Result<(), ExecuteError> {
        for file in flush_plan(ctx)? {
            if !file.changed {
                continue;
            }
            if let Some(parent) = file.path.parent() {
                check_dir_writable(parent)?;
            }
            ctx.record_target_file(file.path);
        }
        Ok(())
    }
}
