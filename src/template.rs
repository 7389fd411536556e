//! Template rendering and source resolution.
//!
//! Templates are plain UTF-8 text with `${name}` placeholders; dotted names
//! reach into nested parameter maps (`${project.name}`). Rendering is pure -
//! the caller decides whether and where to write the result.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::params::Params;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// A referenced parameter is not defined. Recoverable: surfaced to the
    /// user rather than aborting the whole recipe in lenient mode.
    #[error("undefined template parameter: {0}")]
    Undefined(String),
    /// A `${` with no closing brace. Always fatal.
    #[error("line {0}: unclosed placeholder")]
    Unclosed(u32),
    /// A `${}` with nothing inside. Always fatal.
    #[error("line {0}: empty placeholder")]
    Empty(u32),
    /// A placeholder resolved to a list or map, which has no text form.
    #[error("parameter {0} cannot be rendered as text")]
    NotRenderable(String),
}

/// Substitute all `${...}` placeholders in `source` against `params`.
///
/// `$` not followed by `{` passes through verbatim; `$$` escapes a literal
/// dollar before `{`.
pub fn render(source: &str, params: &Params) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut line: u32 = 1;

    while let Some(idx) = rest.find('$') {
        let (before, after) = rest.split_at(idx);
        line += before.matches('\n').count() as u32;
        out.push_str(before);

        if let Some(stripped) = after.strip_prefix("$${") {
            out.push_str("${");
            rest = stripped;
            continue;
        }

        let Some(after_brace) = after.strip_prefix("${") else {
            out.push('$');
            rest = &after[1..];
            continue;
        };

        let Some(close) = after_brace.find('}') else {
            return Err(TemplateError::Unclosed(line));
        };
        let name = after_brace[..close].trim();
        if name.is_empty() {
            return Err(TemplateError::Empty(line));
        }

        let value = params
            .lookup(name)
            .ok_or_else(|| TemplateError::Undefined(name.to_string()))?;
        let text = value
            .as_text()
            .ok_or_else(|| TemplateError::NotRenderable(name.to_string()))?;
        out.push_str(&text);

        rest = &after_brace[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Trim the rendered body and collapse runs of blank lines into one.
///
/// Applied to instantiated output before the existing-file comparison, so
/// that templates with generous placeholder spacing still produce tidy files.
pub fn squish_empty_lines(content: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut last_blank = false;
    for raw in content.trim().split('\n') {
        let blank = raw.trim().is_empty();
        if blank {
            if !last_blank {
                out.push("");
            }
        } else {
            out.push(raw);
        }
        last_blank = blank;
    }
    out.join("\n")
}

/// Resolves relative template source paths against a template root, with a
/// folder stack so a recipe can descend into nested template subfolders.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
    stack: Vec<PathBuf>,
}

impl TemplateLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stack: Vec::new(),
        }
    }

    /// The current resolution base: the root plus any pushed folders.
    pub fn base(&self) -> PathBuf {
        self.stack.last().cloned().unwrap_or_else(|| self.root.clone())
    }

    /// Resolve a source path against the current base. Absolute paths pass
    /// through untouched.
    pub fn resolve(&self, from: &Path) -> PathBuf {
        if from.is_absolute() {
            from.to_path_buf()
        } else {
            self.base().join(from)
        }
    }

    /// Make `folder` (relative to the current base) the new resolution base.
    pub fn push_folder(&mut self, folder: &Path) {
        let next = self.base().join(folder);
        self.stack.push(next);
    }

    /// Restore the previous resolution base. Returns false when the stack
    /// is already at the bottom.
    pub fn pop_folder(&mut self) -> bool {
        self.stack.pop().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        let mut p = Params::new();
        p.set("appName", "demo");
        p.set("count", crate::params::ParamValue::Int(3));
        let mut nested = std::collections::BTreeMap::new();
        nested.insert(
            "package".to_string(),
            crate::params::ParamValue::Str("com.example.demo".into()),
        );
        p.set("project", crate::params::ParamValue::Map(nested));
        p
    }

    #[test]
    fn test_render_simple() {
        assert_eq!(
            render("hello ${appName}!", &params()).unwrap(),
            "hello demo!"
        );
    }

    #[test]
    fn test_render_dotted() {
        assert_eq!(
            render("package ${project.package}", &params()).unwrap(),
            "package com.example.demo"
        );
    }

    #[test]
    fn test_render_non_string_scalars() {
        assert_eq!(render("n = ${count}", &params()).unwrap(), "n = 3");
    }

    #[test]
    fn test_undefined_parameter() {
        assert_eq!(
            render("${missing}", &params()),
            Err(TemplateError::Undefined("missing".into()))
        );
    }

    #[test]
    fn test_unclosed_reports_line() {
        assert_eq!(
            render("a\nb\nbroken ${oops", &params()),
            Err(TemplateError::Unclosed(3))
        );
    }

    #[test]
    fn test_dollar_without_brace_passes_through() {
        assert_eq!(render("cost: $5", &params()).unwrap(), "cost: $5");
    }

    #[test]
    fn test_escaped_placeholder() {
        assert_eq!(
            render("literal $${appName}", &params()).unwrap(),
            "literal ${appName}"
        );
    }

    #[test]
    fn test_squish_empty_lines() {
        assert_eq!(
            squish_empty_lines("\n\na\n\n\n\nb\n  \nc\n\n"),
            "a\n\nb\n\nc"
        );
    }

    #[test]
    fn test_loader_stack() {
        let mut loader = TemplateLoader::new("/t");
        assert_eq!(loader.resolve(Path::new("a.tmpl")), PathBuf::from("/t/a.tmpl"));

        loader.push_folder(Path::new("nested"));
        assert_eq!(
            loader.resolve(Path::new("a.tmpl")),
            PathBuf::from("/t/nested/a.tmpl")
        );

        loader.push_folder(Path::new("deep"));
        assert_eq!(loader.base(), PathBuf::from("/t/nested/deep"));

        assert!(loader.pop_folder());
        assert!(loader.pop_folder());
        assert!(!loader.pop_folder());
        assert_eq!(loader.base(), PathBuf::from("/t"));
    }
}
