//! Integration tests for recipe execution across the three executor modes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use stencil::{Params, Recipe, RenderingContext, interpreter};
use tempfile::TempDir;

/// Create a test environment with template and output directories.
fn create_test_env() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().unwrap();
    let templates = dir.path().join("templates");
    let out = dir.path().join("out");
    std::fs::create_dir_all(&templates).unwrap();
    std::fs::create_dir_all(&out).unwrap();
    (dir, templates, out)
}

/// Write a file under `dir`, creating parents.
fn write_file(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

fn context(out: &Path, templates: &Path) -> RenderingContext {
    RenderingContext::builder(out)
        .template_root(templates)
        .show_errors(true)
        .build()
}

/// Every file under `root`, as paths relative to it.
fn tree_snapshot(root: &Path) -> BTreeSet<PathBuf> {
    walkdir_files(root)
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn walkdir_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}

// =============================================================================
// Copy / instantiate basics
// =============================================================================

#[test]
fn test_copy_into_empty_root() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "start.txt", "hello\n");

    let recipe = Recipe::parse(r#"(recipe (copy "start.txt" "out/start.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(
        std::fs::read_to_string(out.join("out/start.txt")).unwrap(),
        "hello\n"
    );
    assert_eq!(ctx.target_files(), &[out.join("out/start.txt")]);
    assert!(ctx.warnings().is_empty());
}

#[test]
fn test_copy_directory_recurses() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "res/values/strings.txt", "a\n");
    write_file(&templates, "res/layout/main.txt", "b\n");

    let recipe = Recipe::parse(r#"(recipe (copy "res" "res"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert!(out.join("res/values/strings.txt").exists());
    assert!(out.join("res/layout/main.txt").exists());
    assert_eq!(ctx.target_files().len(), 2);
}

#[test]
fn test_copy_identical_existing_skips_silently() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "a.txt", "same content\n");
    write_file(&out, "a.txt", "same content\n");

    let recipe = Recipe::parse(r#"(recipe (copy "a.txt" "a.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert!(ctx.warnings().is_empty());
    assert!(ctx.target_files().is_empty());
}

#[test]
fn test_copy_divergent_existing_warns_and_never_overwrites() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "a.txt", "new content\n");
    write_file(&out, "a.txt", "user edited this\n");

    let recipe = Recipe::parse(r#"(recipe (copy "a.txt" "a.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(ctx.warnings().len(), 1);
    assert!(ctx.warnings()[0].contains("already exists"));
    assert_eq!(
        std::fs::read_to_string(out.join("a.txt")).unwrap(),
        "user edited this\n"
    );
}

#[test]
fn test_instantiate_renders_parameters() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "App.kt.tmpl", "package ${package}\n\n\n\nclass App\n");

    let recipe = Recipe::parse(r#"(recipe (instantiate "App.kt.tmpl" "src/App.kt"))"#).unwrap();
    let mut params = Params::new();
    params.set("package", "com.example.demo");
    let mut ctx = RenderingContext::builder(&out)
        .template_root(&templates)
        .params(params)
        .show_errors(true)
        .build();
    interpreter::run(&recipe, &mut ctx).unwrap();

    let rendered = std::fs::read_to_string(out.join("src/App.kt")).unwrap();
    assert!(rendered.starts_with("package com.example.demo"));
    // Runs of blank lines squish down to one.
    assert!(!rendered.contains("\n\n\n"));
}

#[test]
fn test_instantiate_undefined_parameter_warns_in_lenient_mode() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "App.kt.tmpl", "package ${missing}\n");

    let recipe = Recipe::parse(r#"(recipe (instantiate "App.kt.tmpl" "src/App.kt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(ctx.warnings().len(), 1);
    assert!(!out.join("src/App.kt").exists());

    // Strict mode turns the same problem into a hard failure.
    let mut strict = RenderingContext::builder(&out)
        .template_root(&templates)
        .build();
    assert!(interpreter::run(&recipe, &mut strict).is_err());
}

#[test]
fn test_append_concatenates_with_line_break() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "extra.txt", "-keep class **\n");
    write_file(&out, "rules.txt", "existing");

    let recipe = Recipe::parse(r#"(recipe (append "extra.txt" "rules.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(
        std::fs::read_to_string(out.join("rules.txt")).unwrap(),
        "existing\n-keep class **\n"
    );
}

#[test]
fn test_mkdir_creates_ancestors() {
    let (_dir, templates, out) = create_test_env();
    let recipe = Recipe::parse(r#"(recipe (mkdir "src/main/res/values"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();
    assert!(out.join("src/main/res/values").is_dir());
}

#[test]
fn test_target_outside_output_root_rejected() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "a.txt", "x\n");

    let recipe = Recipe::parse(r#"(recipe (copy "a.txt" "../escape.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    assert!(interpreter::run(&recipe, &mut ctx).is_err());
    assert!(!out.parent().unwrap().join("escape.txt").exists());
}

#[test]
fn test_open_files_are_listed() {
    let (_dir, templates, out) = create_test_env();
    let recipe = Recipe::parse(r#"(recipe (open "src/App.kt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();
    assert_eq!(ctx.files_to_open(), &[out.join("src/App.kt")]);
}

// =============================================================================
// Merge behavior
// =============================================================================

#[test]
fn test_settings_merge_keeps_existing_before_new() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "settings.gradle.tmpl", "include ':lib'\n");
    write_file(&out, "settings.gradle", "include ':app'\n");

    let recipe =
        Recipe::parse(r#"(recipe (merge "settings.gradle.tmpl" "settings.gradle"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    let merged = std::fs::read_to_string(out.join("settings.gradle")).unwrap();
    assert!(merged.contains("include ':app'"));
    assert!(merged.contains("include ':lib'"));
    assert!(merged.find(":app").unwrap() < merged.find(":lib").unwrap());
}

#[test]
fn test_merge_into_missing_destination_writes_source() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "settings.gradle.tmpl", "include ':${module}'\n");

    let recipe =
        Recipe::parse(r#"(recipe (merge "settings.gradle.tmpl" "settings.gradle"))"#).unwrap();
    let mut params = Params::new();
    params.set("module", "app");
    let mut ctx = RenderingContext::builder(&out)
        .template_root(&templates)
        .params(params)
        .build();
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(
        std::fs::read_to_string(out.join("settings.gradle")).unwrap(),
        "include ':app'\n"
    );
}

#[test]
fn test_merge_is_idempotent() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "settings.gradle.tmpl", "include ':lib'\n");
    write_file(&out, "settings.gradle", "include ':app'\n");

    let recipe =
        Recipe::parse(r#"(recipe (merge "settings.gradle.tmpl" "settings.gradle"))"#).unwrap();

    let mut first = context(&out, &templates);
    interpreter::run(&recipe, &mut first).unwrap();
    let after_first = std::fs::read_to_string(out.join("settings.gradle")).unwrap();
    assert_eq!(first.target_files().len(), 1);

    // Second merge of the same source: zero writes, identical content.
    let mut second = context(&out, &templates);
    interpreter::run(&recipe, &mut second).unwrap();
    assert!(second.target_files().is_empty());
    assert_eq!(
        std::fs::read_to_string(out.join("settings.gradle")).unwrap(),
        after_first
    );
}

#[test]
fn test_merge_unsupported_type_warns_in_lenient_mode() {
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "notes.txt", "generated\n");
    write_file(&out, "notes.txt", "existing\n");

    let recipe = Recipe::parse(r#"(recipe (merge "notes.txt" "notes.txt"))"#).unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    assert_eq!(ctx.warnings().len(), 1);
    assert!(ctx.warnings()[0].contains("Cannot merge"));
    assert_eq!(
        std::fs::read_to_string(out.join("notes.txt")).unwrap(),
        "existing\n"
    );
}

#[test]
fn test_markup_merge_end_to_end() {
    let (_dir, templates, out) = create_test_env();
    write_file(
        &templates,
        "strings.xml.tmpl",
        "<resources><string name=\"app_name\">${appName}</string></resources>",
    );
    write_file(
        &out,
        "res/values/strings.xml",
        "<resources><string name=\"title\">Kept</string></resources>",
    );

    let recipe = Recipe::parse(
        r#"(recipe (merge "strings.xml.tmpl" "res/values/strings.xml"))"#,
    )
    .unwrap();
    let mut params = Params::new();
    params.set("appName", "Demo");
    let mut ctx = RenderingContext::builder(&out)
        .template_root(&templates)
        .params(params)
        .build();
    interpreter::run(&recipe, &mut ctx).unwrap();

    let merged = std::fs::read_to_string(out.join("res/values/strings.xml")).unwrap();
    assert!(merged.contains("Kept"));
    assert!(merged.contains("Demo"));
}

// =============================================================================
// Dependency accumulation and Final flush
// =============================================================================

#[test]
fn test_duplicate_dependency_declared_once() {
    let (_dir, templates, out) = create_test_env();
    let recipe = Recipe::parse(
        r#"(recipe
             (dependency "implementation" "g:a:1.0")
             (dependency "implementation" "g:a:1.0"))"#,
    )
    .unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    let build = std::fs::read_to_string(out.join("build.gradle")).unwrap();
    assert_eq!(build.matches("g:a:1.0").count(), 1);
}

#[test]
fn test_dependency_version_resolution_commutes() {
    let forward = r#"(recipe
        (dependency "implementation" "g:a:1.0")
        (dependency "implementation" "g:a:2.0"))"#;
    let reverse = r#"(recipe
        (dependency "implementation" "g:a:2.0")
        (dependency "implementation" "g:a:1.0"))"#;

    let mut results = Vec::new();
    for source in [forward, reverse] {
        let (_dir, templates, out) = create_test_env();
        let recipe = Recipe::parse(source).unwrap();
        let mut ctx = context(&out, &templates);
        interpreter::run(&recipe, &mut ctx).unwrap();
        results.push(std::fs::read_to_string(out.join("build.gradle")).unwrap());
    }

    assert_eq!(results[0], results[1]);
    assert!(results[0].contains("g:a:2.0"));
    assert!(!results[0].contains("g:a:1.0"));
}

#[test]
fn test_flush_merges_into_existing_build_file() {
    let (_dir, templates, out) = create_test_env();
    write_file(
        &out,
        "build.gradle",
        "dependencies {\n    implementation \"g:a:1.0\"\n}\n",
    );

    let recipe = Recipe::parse(
        r#"(recipe
             (dependency "implementation" "g:a:2.0")
             (dependency "api" "g:b:1.0")
             (plugin "kotlin-android"))"#,
    )
    .unwrap();
    let mut ctx = context(&out, &templates);
    interpreter::run(&recipe, &mut ctx).unwrap();

    let build = std::fs::read_to_string(out.join("build.gradle")).unwrap();
    assert!(build.contains("implementation \"g:a:2.0\""));
    assert!(!build.contains("g:a:1.0"));
    assert!(build.contains("api \"g:b:1.0\""));
    assert!(build.contains("apply plugin: 'kotlin-android'"));
}

#[test]
fn test_sync_reported_only_when_descriptor_changes() {
    let (_dir, templates, out) = create_test_env();
    let recipe = Recipe::parse(r#"(recipe (dependency "implementation" "g:a:1.0"))"#).unwrap();
    let mut ctx = RenderingContext::builder(&out)
        .template_root(&templates)
        .sync(true)
        .build();
    interpreter::run(&recipe, &mut ctx).unwrap();
    assert!(ctx.sync_required());

    // A recipe with no descriptor changes requests no sync.
    let quiet = Recipe::parse(r#"(recipe (mkdir "src"))"#).unwrap();
    let mut ctx = RenderingContext::builder(&out)
        .template_root(&templates)
        .sync(true)
        .build();
    interpreter::run(&quiet, &mut ctx).unwrap();
    assert!(!ctx.sync_required());
}

// =============================================================================
// Dry-run and reference-collection parity
// =============================================================================

#[test]
fn test_dry_run_matches_live_warnings_without_mutation() {
    let recipe_src = r#"(recipe
        (copy "conflict.txt" "conflict.txt")
        (copy "fresh.txt" "sub/fresh.txt")
        (dependency "implementation" "g:a:1.0"))"#;

    // Dry run first, against a root with one divergent file.
    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "conflict.txt", "new\n");
    write_file(&templates, "fresh.txt", "fresh\n");
    write_file(&out, "conflict.txt", "edited\n");

    let before = tree_snapshot(&out);
    let recipe = Recipe::parse(recipe_src).unwrap();
    let mut dry = RenderingContext::builder(&out)
        .template_root(&templates)
        .dry_run(true)
        .show_errors(true)
        .build();
    interpreter::run(&recipe, &mut dry).unwrap();

    // No created files, no modified files.
    assert_eq!(tree_snapshot(&out), before);
    assert_eq!(
        std::fs::read_to_string(out.join("conflict.txt")).unwrap(),
        "edited\n"
    );

    // The live run over the same tree produces the same warning set.
    let mut live = context(&out, &templates);
    interpreter::run(&recipe, &mut live).unwrap();
    assert_eq!(dry.warnings(), live.warnings());
}

#[test]
fn test_reference_collection_matches_live_write_set() {
    let recipe_src = r#"(recipe
        (copy "a.txt" "a.txt")
        (instantiate "App.kt.tmpl" "src/App.kt")
        (merge "settings.gradle.tmpl" "settings.gradle")
        (dependency "implementation" "g:a:1.0"))"#;

    let (_dir, templates, out) = create_test_env();
    write_file(&templates, "a.txt", "x\n");
    write_file(&templates, "App.kt.tmpl", "class App\n");
    write_file(&templates, "settings.gradle.tmpl", "include ':app'\n");

    let recipe = Recipe::parse(recipe_src).unwrap();

    // Collect references first - must not touch the output root.
    let before = tree_snapshot(&out);
    let mut refs = RenderingContext::builder(&out)
        .template_root(&templates)
        .find_only_references(true)
        .build();
    interpreter::run(&recipe, &mut refs).unwrap();
    assert_eq!(tree_snapshot(&out), before);

    // Live run against the same (still fresh) root.
    let mut live = context(&out, &templates);
    interpreter::run(&recipe, &mut live).unwrap();

    let collected: BTreeSet<_> = refs.target_files().iter().cloned().collect();
    let written: BTreeSet<_> = live.target_files().iter().cloned().collect();
    assert_eq!(collected, written);
}
