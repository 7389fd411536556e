//! Stencil CLI - render declarative recipes into a project tree.
//!
//! Usage:
//!   stencil run <recipe>     Execute a recipe against the output root
//!   stencil plan <recipe>    Dry-run: validate and report, touch nothing
//!   stencil refs <recipe>    List the files the recipe would touch
//!   stencil show <recipe>    Parse and print the instruction list

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use stencil::{ExecutionMode, Params, Recipe, RenderingContext, interpreter, output};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Template-driven project scaffolder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output root the recipe renders into
    #[arg(short, long, global = true, default_value = ".")]
    out: PathBuf,

    /// Module root receiving dependency declarations (defaults to the
    /// output root)
    #[arg(long, global = true)]
    module_root: Option<PathBuf>,

    /// Template root for relative source paths (defaults to the recipe
    /// file's directory)
    #[arg(short = 't', long, global = true, env = "STENCIL_PATH")]
    template_root: Option<PathBuf>,

    /// Parameter file (.toml or .json)
    #[arg(short, long, global = true)]
    params: Option<PathBuf>,

    /// Extra key=value parameter (repeatable, wins over the file)
    #[arg(short = 'D', long = "param", global = true)]
    param: Vec<String>,

    /// Only upgrade existing dependency versions matching this prefix
    #[arg(long, global = true)]
    version_filter: Option<String>,

    /// Surface recoverable problems as warnings instead of failing
    #[arg(long, global = true)]
    lenient: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a recipe against the output root
    Run {
        /// Path to the recipe file
        recipe: PathBuf,

        /// Report that a project re-sync should follow when a build
        /// descriptor changed
        #[arg(long)]
        sync: bool,
    },

    /// Validate a recipe without touching the filesystem
    Plan {
        /// Path to the recipe file
        recipe: PathBuf,
    },

    /// List the source and target files a recipe would touch
    Refs {
        /// Path to the recipe file
        recipe: PathBuf,
    },

    /// Parse a recipe and print its instructions and projections
    Show {
        /// Path to the recipe file
        recipe: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let recipe_path = match &cli.command {
        Commands::Run { recipe, .. }
        | Commands::Plan { recipe }
        | Commands::Refs { recipe }
        | Commands::Show { recipe } => recipe.clone(),
    };

    let source = std::fs::read_to_string(&recipe_path)
        .with_context(|| format!("Failed to read recipe: {}", recipe_path.display()))?;
    let recipe = Recipe::parse(&source)
        .with_context(|| format!("Failed to parse recipe: {}", recipe_path.display()))?;

    if let Commands::Show { .. } = cli.command {
        return show(&recipe);
    }

    let mut params = match &cli.params {
        Some(path) => Params::load(path)?,
        None => Params::new(),
    };
    for pair in &cli.param {
        params.set_pair(pair)?;
    }

    let template_root = cli
        .template_root
        .clone()
        .or_else(|| recipe_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let command_name = recipe_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "render".to_string());

    let mut builder = RenderingContext::builder(&cli.out)
        .command_name(&command_name)
        .template_root(template_root)
        .params(params)
        .version_filter(cli.version_filter.clone())
        .show_errors(cli.lenient);
    builder = match &cli.command {
        Commands::Run { sync, .. } => builder.sync(*sync),
        Commands::Plan { .. } => builder.dry_run(true),
        Commands::Refs { .. } => builder.find_only_references(true),
        Commands::Show { .. } => unreachable!("handled above"),
    };
    if let Some(module_root) = &cli.module_root {
        builder = builder.module_root(module_root);
    }
    let mut ctx = builder.build();

    let label = match ctx.mode() {
        ExecutionMode::Live => format!("Rendering {} into {}", command_name, cli.out.display()),
        ExecutionMode::DryRun => format!("Planning {} against {}", command_name, cli.out.display()),
        ExecutionMode::FindReferences => format!("Collecting references for {}", command_name),
    };
    output::action(&label);

    let spinner = output::run_spinner(&command_name);
    let result = interpreter::run(&recipe, &mut ctx);
    output::spinner_done(spinner);

    for warning in ctx.warnings() {
        output::warning(warning);
    }

    if let Err(err) = result {
        output::error(&err.to_string());
        return Err(err.into());
    }

    report(&ctx);
    Ok(())
}

fn show(recipe: &Recipe) -> Result<()> {
    output::action("Instructions");
    for instruction in recipe.instructions() {
        output::sub_action(&format!("{:?}", instruction));
    }
    if !recipe.dependencies().is_empty() {
        output::action("Dependencies");
        for (configuration, coordinate) in recipe.dependencies() {
            output::sub_action(&format!("{} {}", configuration, coordinate));
        }
    }
    if !recipe.target_files().is_empty() {
        output::action("Target files");
        for path in recipe.target_files() {
            output::sub_action(&path.display().to_string());
        }
    }
    if !recipe.files_to_open().is_empty() {
        output::action("Files to open");
        for path in recipe.files_to_open() {
            output::sub_action(&path.display().to_string());
        }
    }
    Ok(())
}

fn report(ctx: &RenderingContext) {
    match ctx.mode() {
        ExecutionMode::Live => {
            for path in ctx.target_files() {
                output::sub_action(&format!("wrote {}", path.display()));
            }
            if ctx.sync_required() {
                output::info("build descriptors changed; re-sync the project");
            }
            for path in ctx.files_to_open() {
                output::detail(&format!("open {}", path.display()));
            }
            output::success(&format!(
                "{} done, {} file(s) written",
                ctx.command_name,
                ctx.target_files().len()
            ));
        }
        ExecutionMode::DryRun => {
            for path in ctx.target_files() {
                output::sub_action(&format!("would write {}", path.display()));
            }
            output::success(&format!(
                "{} validated, {} warning(s)",
                ctx.command_name,
                ctx.warnings().len()
            ));
        }
        ExecutionMode::FindReferences => {
            for path in ctx.source_files() {
                output::sub_action(&format!("reads  {}", path.display()));
            }
            for path in ctx.target_files() {
                output::sub_action(&format!("writes {}", path.display()));
            }
        }
    }
}
