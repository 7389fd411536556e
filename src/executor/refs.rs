//! Reference-collecting executor - records which files a recipe would
//! touch, without reading or writing any of them.
//!
//! Used to compute, ahead of a real run, the complete source/target file
//! set (e.g. for conflict detection against files already open in an
//! editor).

use std::path::Path;

use crate::context::RenderingContext;

use super::{ExecuteError, RecipeExecutor, flush_plan_paths, resolve_target};

/// Executor that resolves and records paths only.
pub struct FindReferencesExecutor;

impl FindReferencesExecutor {
    pub fn new() -> Self {
        Self
    }

    fn record(
        &self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        let source = ctx.loader.resolve(from);
        ctx.record_source_file(source);
        let target = resolve_target(ctx, to)?;
        ctx.record_target_file(target);
        Ok(())
    }
}

impl Default for FindReferencesExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeExecutor for FindReferencesExecutor {
    fn copy(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        self.record(ctx, from, to)
    }

    fn instantiate(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        self.record(ctx, from, to)
    }

    fn merge(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        self.record(ctx, from, to)
    }

    fn append(
        &mut self,
        ctx: &mut RenderingContext,
        from: &Path,
        to: &Path,
    ) -> Result<(), ExecuteError> {
        self.record(ctx, from, to)
    }

    fn mk_dir(&mut self, _ctx: &mut RenderingContext, _at: &Path) -> Result<(), ExecuteError> {
        // Directories are not files a conflict check cares about.
        Ok(())
    }

    fn finish(&mut self, ctx: &mut RenderingContext) -> Result<(), ExecuteError> {
        for path in flush_plan_paths(ctx) {
            ctx.record_target_file(path);
        }
        Ok(())
    }
}
