//! Recipe interpretation - converts parsed S-expressions into instruction lists.

use std::path::PathBuf;

use crate::ast::Expr;
use thiserror::Error;

/// Suffix marking a source file as a renderable template.
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Configuration used when a dependency instruction omits one.
pub const DEFAULT_CONFIGURATION: &str = "implementation";

/// Either a syntax error from the S-expression layer or a semantic error
/// from instruction dispatch.
#[derive(Error, Debug)]
pub enum RecipeParseError {
    #[error(transparent)]
    Syntax(#[from] crate::parser::ParseError),
    #[error(transparent)]
    Semantics(#[from] RecipeError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecipeError {
    #[error("expected (recipe ...), got: {0}")]
    NotARecipe(String),
    #[error("unknown instruction: {0}")]
    UnknownInstruction(String),
    #[error("{instruction}: missing {operand}")]
    MissingOperand {
        instruction: &'static str,
        operand: &'static str,
    },
}

/// A single file or project mutation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Copy a file or directory tree verbatim.
    Copy { from: PathBuf, to: PathBuf },
    /// Render a template and write the result.
    Instantiate { from: PathBuf, to: PathBuf },
    /// Merge rendered content into an existing destination.
    Merge { from: PathBuf, to: PathBuf },
    /// Concatenate source text after existing destination text.
    Append { from: PathBuf, to: PathBuf },
    /// Create a directory and all missing ancestors.
    MkDir { at: PathBuf },
    /// Record a dependency for the Final flush.
    Dependency {
        configuration: String,
        coordinate: String,
    },
    /// Record a buildscript classpath entry for the Final flush.
    Classpath { coordinate: String },
    /// Record a plugin that must be declared in the module build file.
    Plugin { name: String },
    /// Mark a file to be presented to the user afterwards.
    Open { file: PathBuf },
    /// Resolve later `from` paths against a nested template subfolder.
    PushFolder { folder: PathBuf },
    /// Restore the previous resolution base.
    PopFolder,
}

/// An ordered, immutable list of instructions plus derived projections.
#[derive(Debug, Clone)]
pub struct Recipe {
    instructions: Vec<Instruction>,
    dependencies: Vec<(String, String)>,
    target_files: Vec<PathBuf>,
    files_to_open: Vec<PathBuf>,
}

impl Recipe {
    /// Parse a recipe from `.recipe` source text.
    pub fn parse(input: &str) -> Result<Self, RecipeParseError> {
        let expr = crate::parser::parse(input)?;
        Ok(Self::from_expr(&expr)?)
    }

    /// Build a recipe from a parsed S-expression.
    pub fn from_expr(expr: &Expr) -> Result<Self, RecipeError> {
        if expr.head() != Some("recipe") {
            return Err(RecipeError::NotARecipe(format!("{}", expr)));
        }

        let mut instructions = Vec::new();
        for item in expr.tail().unwrap_or_default() {
            instructions.push(parse_instruction(item)?);
        }

        Ok(Self::from_instructions(instructions))
    }

    /// Build a recipe directly from instructions (used by tests and embedders).
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let mut dependencies = Vec::new();
        let mut target_files = Vec::new();
        let mut files_to_open = Vec::new();

        for ins in &instructions {
            match ins {
                Instruction::Copy { to, .. }
                | Instruction::Instantiate { to, .. }
                | Instruction::Merge { to, .. }
                | Instruction::Append { to, .. } => target_files.push(to.clone()),
                Instruction::Dependency {
                    configuration,
                    coordinate,
                } => dependencies.push((configuration.clone(), coordinate.clone())),
                Instruction::Classpath { coordinate } => {
                    dependencies.push(("classpath".to_string(), coordinate.clone()))
                }
                Instruction::Open { file } => files_to_open.push(file.clone()),
                _ => {}
            }
        }

        Self {
            instructions,
            dependencies,
            target_files,
            files_to_open,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Dependency identifiers referenced by this recipe, in declaration order.
    pub fn dependencies(&self) -> &[(String, String)] {
        &self.dependencies
    }

    /// Relative paths of files this recipe will create or modify.
    pub fn target_files(&self) -> &[PathBuf] {
        &self.target_files
    }

    /// Relative paths of files to present to the user after execution.
    pub fn files_to_open(&self) -> &[PathBuf] {
        &self.files_to_open
    }
}

/// Strip the template suffix from a path, if present.
pub fn strip_template_suffix(path: &str) -> &str {
    path.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(path)
}

fn parse_instruction(expr: &Expr) -> Result<Instruction, RecipeError> {
    let head = expr
        .head()
        .ok_or_else(|| RecipeError::NotARecipe(format!("{}", expr)))?;

    match head {
        "copy" => from_to(expr, "copy").map(|(from, to)| Instruction::Copy { from, to }),
        "instantiate" => {
            from_to(expr, "instantiate").map(|(from, to)| Instruction::Instantiate { from, to })
        }
        "merge" => from_to(expr, "merge").map(|(from, to)| Instruction::Merge { from, to }),
        "append" => from_to(expr, "append").map(|(from, to)| Instruction::Append { from, to }),
        "mkdir" => {
            let at = expr
                .attr("at")
                .or_else(|| expr.operand(0))
                .ok_or(RecipeError::MissingOperand {
                    instruction: "mkdir",
                    operand: "at",
                })?;
            Ok(Instruction::MkDir {
                at: PathBuf::from(at),
            })
        }
        "dependency" => {
            // One operand: coordinate with the default configuration.
            // Two operands: explicit configuration first.
            let first = expr.operand(0).ok_or(RecipeError::MissingOperand {
                instruction: "dependency",
                operand: "coordinate",
            })?;
            let (configuration, coordinate) = match expr.operand(1) {
                Some(coord) => (first.to_string(), coord.to_string()),
                None => (DEFAULT_CONFIGURATION.to_string(), first.to_string()),
            };
            Ok(Instruction::Dependency {
                configuration,
                coordinate,
            })
        }
        "classpath" => {
            let coordinate = expr
                .operand(0)
                .ok_or(RecipeError::MissingOperand {
                    instruction: "classpath",
                    operand: "coordinate",
                })?
                .to_string();
            Ok(Instruction::Classpath { coordinate })
        }
        "plugin" => {
            let name = expr
                .operand(0)
                .ok_or(RecipeError::MissingOperand {
                    instruction: "plugin",
                    operand: "name",
                })?
                .to_string();
            Ok(Instruction::Plugin { name })
        }
        "open" => {
            let file = expr
                .attr("file")
                .or_else(|| expr.operand(0))
                .ok_or(RecipeError::MissingOperand {
                    instruction: "open",
                    operand: "file",
                })?;
            Ok(Instruction::Open {
                file: PathBuf::from(file),
            })
        }
        "push" => {
            let folder = expr
                .operand(0)
                .ok_or(RecipeError::MissingOperand {
                    instruction: "push",
                    operand: "folder",
                })?;
            Ok(Instruction::PushFolder {
                folder: PathBuf::from(folder),
            })
        }
        "pop" => Ok(Instruction::PopFolder),
        other => Err(RecipeError::UnknownInstruction(other.to_string())),
    }
}

/// Extract `from`/`to` operands; a missing or empty `to` defaults to `from`
/// with the template suffix stripped.
fn from_to(expr: &Expr, instruction: &'static str) -> Result<(PathBuf, PathBuf), RecipeError> {
    let from = expr
        .attr("from")
        .or_else(|| expr.operand(0))
        .ok_or(RecipeError::MissingOperand {
            instruction,
            operand: "from",
        })?;

    let to = expr
        .attr("to")
        .or_else(|| expr.operand(1))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| strip_template_suffix(from).to_string());

    Ok((PathBuf::from(from), PathBuf::from(to)))
}
