//! Live executor - performs the actual filesystem and build-descriptor
//! mutations.

use std::path::Path;

use walkdir::WalkDir;

use crate::context::RenderingContext;
use crate::merge::FileRole;
use crate::recipe::TEMPLATE_SUFFIX;
use crate::template::squish_empty_lines;

use super::{
    ExecuteError, RecipeExecutor, check_dir_writable, content_matches_file, files_equivalent,
    flush_plan, merge_source, render_source, report_exists, resolve_source, resolve_target,
};

/// Executor that mutates the output tree.
pub struct LiveExecutor;

impl LiveExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Write `content`, creating parent directories, and record the target.
    fn write_file(
        &self,
        ctx: &mut RenderingContext,
        content: &[u8],
        target: &Path,
    ) -> Result<(), ExecuteError> {
        if let Some(parent) = target.parent() {
            check_dir_writable(parent)?;
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, content)?;
        ctx.record_target_file(target.to_path_buf());
        Ok(())
    }

    /// Copy a single file with the existing-destination policy: identical
    /// content is a silent skip, divergent content a warning, and the
    /// destination is never overwritten.
    fn copy_leaf(
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
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, target)?;
        ctx.record_target_file(target.to_path_buf());
        Ok(())
    }

    fn copy_tree(
        &self,
        ctx: &mut RenderingContext,
        source: &Path,
        target: &Path,
    ) -> Result<(), ExecuteError> {
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                ExecuteError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "walk failed")
                }))
            })?;
            let rel = entry
                .path()
                .strip_prefix(source)
                .expect("walkdir yields children of its root");
            let dest = target.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else {
                self.copy_leaf(ctx, entry.path(), &dest)?;
            }
        }
        Ok(())
    }
}

impl Default for LiveExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeExecutor for LiveExecutor {
    fn copy(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        if source.is_dir() {
            self.copy_tree(ctx, &source, &target)
        } else {
            self.copy_leaf(ctx, &source, &target)
        }
    }

    fn instantiate(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        // A source with no extension is a directory marker: copied
        // recursively, never rendered as text.
        if source.extension().is_none() {
            if !source.is_dir() {
                return Err(ExecuteError::NotADirectory(source));
            }
            return self.copy_tree(ctx, &source, &target);
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
        self.write_file(ctx, content.as_bytes(), &target)
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

        // No destination: nothing to merge, the rendered source is the file.
        if !target.exists() {
            return self.write_file(ctx, content.as_bytes(), &target);
        }

        let existing = std::fs::read_to_string(&target)?;
        let Some(merged) = merge_source(ctx, &target, &content, &existing)? else {
            return Ok(());
        };

        // Idempotent no-op: equivalent result means zero writes.
        if crate::merge::content_equivalent(&merged, &existing) {
            return Ok(());
        }

        self.write_file(ctx, merged.as_bytes(), &target)?;
        if matches!(FileRole::of(&target), FileRole::Build | FileRole::Settings) {
            ctx.mark_build_modified();
        }
        Ok(())
    }

    fn append(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = resolve_source(ctx, from)?;
        let target = resolve_target(ctx, to)?;

        let addition = std::fs::read_to_string(&source)?;
        let content = if target.exists() {
            let existing = std::fs::read_to_string(&target)?;
            let separator = if existing.ends_with('\n') { "" } else { "\n" };
            format!("{}{}{}", existing, separator, addition)
        } else {
            addition
        };
        self.write_file(ctx, content.as_bytes(), &target)
    }

    fn mk_dir(&mut self, ctx: &mut RenderingContext, at: &Path) -> Result<(), ExecuteError> {
        let target = resolve_target(ctx, at)?;
        check_dir_writable(&target)?;
        std::fs::create_dir_all(&target)?;
        Ok(())
    }

    fn finish(&mut self, ctx: &mut RenderingContext) -> Result<(), ExecuteError> {
        for file in flush_plan(ctx)? {
            if !file.changed {
                continue;
            }
            self.write_file(ctx, file.content.as_bytes(), &file.path)?;
            ctx.mark_build_modified();
        }
        Ok(())
    }
}
