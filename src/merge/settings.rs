//! Settings-file merge: union of module-inclusion statements.

/// Append include statements from `source` that `existing` does not already
/// declare. Existing statement order is preserved; new statements go at the
/// end. Non-include lines in the source contribute nothing.
pub fn merge_settings(source: &str, existing: &str) -> String {
    let declared: Vec<&str> = existing
        .lines()
        .map(str::trim)
        .filter(|line| is_include(line))
        .collect();

    let missing: Vec<&str> = source
        .lines()
        .map(str::trim)
        .filter(|line| is_include(line) && !declared.contains(line))
        .collect();

    if missing.is_empty() {
        return existing.to_string();
    }

    let mut out = existing.trim_end().to_string();
    if !out.is_empty() {
        out.push('\n');
    }
    for line in missing {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn is_include(line: &str) -> bool {
    line.starts_with("include ") || line.starts_with("include(")
}
