//! Recipe interpreter - executes each instruction in declared order against
//! the executor the context's flags select.
//!
//! Traversal is linear: no branching, no loops, no retries. The first fatal
//! error aborts the remaining instructions; writes already performed are not
//! rolled back. The Final flush is implicit, appended by the interpreter,
//! and runs exactly once after the last declared instruction.

use crate::context::RenderingContext;
use crate::executor::{ExecuteError, RecipeExecutor, executor_for};
use crate::recipe::{Instruction, Recipe};

/// Execute a recipe against the context. On success the context's
/// accumulators hold the run's outcome (targets, files to open, warnings,
/// sync decision).
pub fn run(recipe: &Recipe, ctx: &mut RenderingContext) -> Result<(), ExecuteError> {
    let mut executor = executor_for(ctx.mode());

    for instruction in recipe.instructions() {
        dispatch(executor.as_mut(), ctx, instruction)?;
    }

    executor.finish(ctx)
}

fn dispatch(
    executor: &mut dyn RecipeExecutor,
    ctx: &mut RenderingContext,
    instruction: &Instruction,
) -> Result<(), ExecuteError> {
    match instruction {
        Instruction::Copy { from, to } => executor.copy(ctx, from, to),
        Instruction::Instantiate { from, to } => executor.instantiate(ctx, from, to),
        Instruction::Merge { from, to } => executor.merge(ctx, from, to),
        Instruction::Append { from, to } => executor.append(ctx, from, to),
        Instruction::MkDir { at } => executor.mk_dir(ctx, at),
        Instruction::Dependency {
            configuration,
            coordinate,
        } => executor.add_dependency(ctx, configuration, coordinate),
        Instruction::Classpath { coordinate } => executor.add_classpath(ctx, coordinate),
        Instruction::Plugin { name } => executor.apply_plugin(ctx, name),
        Instruction::Open { file } => executor.open(ctx, file),
        Instruction::PushFolder { folder } => executor.push_folder(ctx, folder),
        Instruction::PopFolder => executor.pop_folder(ctx),
    }
}
