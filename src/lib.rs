//! Template-driven project scaffolder.
//!
//! A *recipe* is a declarative, ordered list of file operations applied
//! against an output project tree: copy, render-from-template, merge,
//! append, mkdir, dependency/plugin registration, and open-for-editing.
//! Recipes run in one of three modes, selected once per run from the
//! context's flags: live mutation, dry-run validation, or reference
//! collection (which files *would* be touched).
//!
//! # Example Recipe
//!
//! ```lisp
//! (recipe
//!   (mkdir "src/main/res")
//!   (instantiate "App.kt.tmpl" "src/main/App.kt")
//!   (merge "settings.gradle.tmpl" "settings.gradle")
//!   (dependency "implementation" "com.squareup.okio:okio:3.4.0")
//!   (plugin "kotlin-android")
//!   (open "src/main/App.kt"))
//! ```
//!
//! # Running a recipe
//!
//! ```no_run
//! use stencil::{Recipe, RenderingContext, interpreter};
//!
//! let recipe = Recipe::parse(r#"(recipe (mkdir "src"))"#)?;
//! let mut ctx = RenderingContext::builder("./out")
//!     .command_name("new module")
//!     .show_errors(true)
//!     .build();
//! interpreter::run(&recipe, &mut ctx)?;
//! for warning in ctx.warnings() {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Merging understands three destination roles: settings files (union of
//! include statements), build files (dependency declarations, higher
//! version wins), and XML markup (structural merge where the destination's
//! attribute values win on conflict). Everything else refuses to merge.
//!
//! Dependencies accumulate during the run and flush into the build
//! descriptors in a single implicit Final step, which also decides whether
//! the caller should trigger an external project re-sync.

pub mod ast;
pub mod context;
pub mod dependency;
pub mod executor;
pub mod interpreter;
pub mod merge;
pub mod output;
pub mod params;
pub mod parser;
pub mod recipe;
pub mod template;
pub mod version;

pub use context::{ContextBuilder, ExecutionMode, RenderingContext};
pub use executor::{ExecuteError, RecipeExecutor};
pub use params::{ParamValue, Params};
pub use recipe::{Instruction, Recipe, RecipeParseError};
