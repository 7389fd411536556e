//! Build-descriptor merge: dependency declarations and plugin lines.
//!
//! Works at the text level on conventional build files. Declarations look
//! like `implementation "group:artifact:version"` (single or double quotes)
//! and live inside a `dependencies { }` block.

use crate::dependency::Coordinate;

use super::MergeError;

/// Extract `(configuration, coordinate)` declarations from generated source
/// text. A line whose quoted operand looks like a coordinate but fails to
/// parse is an error - generated snippets must be well-formed.
pub fn parse_declarations(text: &str) -> Result<Vec<(String, Coordinate)>, MergeError> {
    let mut out = Vec::new();
    for line in text.lines() {
        let Some((configuration, quoted)) = declaration_parts(line) else {
            continue;
        };
        match quoted.parse::<Coordinate>() {
            Ok(coordinate) => out.push((configuration.to_string(), coordinate)),
            Err(_) if quoted.contains(':') => {
                return Err(MergeError::Declaration(line.trim().to_string()));
            }
            Err(_) => {}
        }
    }
    Ok(out)
}

/// Merge declarations into existing build-file text.
///
/// For each declaration: when the destination already declares the same
/// coordinate (ignoring version) in that configuration, the higher version
/// is kept - unless a `version_filter` is given and the existing version
/// does not match it, in which case the existing declaration is left alone.
/// Unknown declarations are appended inside the `dependencies { }` block,
/// which is created when absent.
pub fn merge_dependencies(
    existing: &str,
    declarations: &[(String, Coordinate)],
    version_filter: Option<&str>,
) -> String {
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    let mut appended: Vec<String> = Vec::new();

    for (configuration, coordinate) in declarations {
        let found = lines.iter().enumerate().find_map(|(idx, line)| {
            let (cfg, quoted) = declaration_parts(line)?;
            if cfg != configuration {
                return None;
            }
            let existing_coord: Coordinate = quoted.parse().ok()?;
            existing_coord
                .same_artifact(coordinate)
                .then_some((idx, existing_coord))
        });

        match found {
            Some((idx, existing_coord)) => {
                let eligible = match (version_filter, existing_coord.version.as_deref()) {
                    (Some(filter), Some(v)) => v.starts_with(filter),
                    _ => true,
                };
                let upgrade = match (existing_coord.parsed_version(), coordinate.parsed_version())
                {
                    (Some(current), Some(incoming)) => incoming > current,
                    _ => false,
                };
                if eligible && upgrade {
                    let rewritten =
                        lines[idx].replace(&existing_coord.to_string(), &coordinate.to_string());
                    lines[idx] = rewritten;
                }
            }
            None => appended.push(format!("    {} \"{}\"", configuration, coordinate)),
        }
    }

    if appended.is_empty() {
        return lines.join("\n") + terminal_newline(existing);
    }

    match dependencies_block_end(&lines) {
        Some(close_idx) => {
            for (offset, line) in appended.into_iter().enumerate() {
                lines.insert(close_idx + offset, line);
            }
        }
        None => {
            if !lines.iter().all(|l| l.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.push("dependencies {".to_string());
            lines.extend(appended);
            lines.push("}".to_string());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Ensure every plugin has an `apply plugin` line, appended after existing
/// ones (or at the top of the file when there are none).
pub fn apply_plugins(existing: &str, plugins: &[String]) -> String {
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    let missing: Vec<&String> = plugins
        .iter()
        .filter(|name| !declares_plugin(existing, name))
        .collect();
    if missing.is_empty() {
        return existing.to_string();
    }

    let insert_at = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("apply plugin:"))
        .map(|idx| idx + 1)
        .unwrap_or(0);

    for (offset, name) in missing.into_iter().enumerate() {
        lines.insert(insert_at + offset, format!("apply plugin: '{}'", name));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render a fresh module build file for the Final flush when none exists.
pub fn new_build_file(plugins: &[String], declarations: &[(String, Coordinate)]) -> String {
    let mut out = String::new();
    for name in plugins {
        out.push_str(&format!("apply plugin: '{}'\n", name));
    }
    if !plugins.is_empty() && !declarations.is_empty() {
        out.push('\n');
    }
    if !declarations.is_empty() {
        out.push_str("dependencies {\n");
        for (configuration, coordinate) in declarations {
            out.push_str(&format!("    {} \"{}\"\n", configuration, coordinate));
        }
        out.push_str("}\n");
    }
    out
}

/// Split a line into configuration name and quoted coordinate text.
fn declaration_parts(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let (head, rest) = trimmed.split_once(char::is_whitespace)?;
    if !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || head.is_empty() {
        return None;
    }
    let rest = rest.trim();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    // Anything after the closing quote disqualifies the line (e.g. map args).
    if !inner[end + 1..].trim().is_empty() {
        return None;
    }
    Some((head, &inner[..end]))
}

/// Index of the closing-brace line of the first `dependencies {` block.
fn dependencies_block_end(lines: &[String]) -> Option<usize> {
    let open = lines
        .iter()
        .position(|l| l.trim() == "dependencies {" || l.trim() == "dependencies{")?;
    let mut depth = 0i32;
    for (idx, line) in lines.iter().enumerate().skip(open) {
        depth += line.matches('{').count() as i32;
        depth -= line.matches('}').count() as i32;
        if depth == 0 {
            return Some(idx);
        }
    }
    None
}

fn declares_plugin(text: &str, name: &str) -> bool {
    text.contains(&format!("apply plugin: '{}'", name))
        || text.contains(&format!("apply plugin: \"{}\"", name))
        || text.contains(&format!("id '{}'", name))
        || text.contains(&format!("id(\"{}\")", name))
}

fn terminal_newline(original: &str) -> &'static str {
    if original.ends_with('\n') { "\n" } else { "" }
}
