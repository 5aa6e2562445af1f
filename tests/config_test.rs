//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: denylist UNION with `!tag` negation, filters appended
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Every test passes explicit sources, so the user's own config and
//! environment never leak in.

use std::fs;
use std::path::Path;

use config::Map;
use tempfile::TempDir;

use sani::application::{apply, ApplicationError, FilterSpec, ReplacePolicy, Scope};
use sani::config::Settings;
use sani::domain::{Element, Order, TreeBuilder};

fn no_env() -> Option<Map<String, String>> {
    Some(Map::new())
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write config");
    path
}

// ============================================================
// Layering
// ============================================================

#[test]
fn given_local_denylist_with_negation_when_load_then_merges_with_defaults() {
    // Arrange
    let project = TempDir::new().unwrap();
    write(project.path(), ".sani.toml", "denylist = [\"iframe\", \"!style\"]\n");

    // Act
    let settings = Settings::load_from(None, Some(project.path()), no_env()).expect("load settings");

    // Assert: defaults ["script", "style"] + iframe - style
    assert_eq!(settings.denylist, ["iframe", "script"]);
}

#[test]
fn given_global_denylist_when_load_then_replaces_defaults_and_local_unions() {
    let global_dir = TempDir::new().unwrap();
    let global = write(global_dir.path(), "sani.toml", "denylist = [\"object\"]\n");
    let project = TempDir::new().unwrap();
    write(project.path(), ".sani.toml", "denylist = [\"embed\"]\n");

    let settings = Settings::load_from(Some(&global), Some(project.path()), no_env()).unwrap();

    assert_eq!(settings.denylist, ["embed", "object"]);
}

#[test]
fn given_global_and_local_filters_when_load_then_local_are_appended() {
    let global_dir = TempDir::new().unwrap();
    let global = write(
        global_dir.path(),
        "sani.toml",
        r#"
replace_policy = "continue"

[[filters]]
kind = "max-depth"
depth = 16
"#,
    );
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        ".sani.toml",
        r#"
transactional = false

[[filters]]
kind = "unwrap"
tags = ["font"]
"#,
    );

    let settings = Settings::load_from(Some(&global), Some(project.path()), no_env()).unwrap();

    let kinds: Vec<&str> = settings.filters.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, ["max-depth", "unwrap"]);
    assert_eq!(settings.replace_policy, ReplacePolicy::Continue);
    assert!(!settings.transactional);
    assert!(!settings.engine().is_transactional());
}

#[test]
fn given_env_denylist_when_load_then_env_replaces_files() {
    let project = TempDir::new().unwrap();
    write(project.path(), ".sani.toml", "denylist = [\"iframe\"]\n");
    let mut env = Map::new();
    env.insert("SANI_DENYLIST".to_string(), "marquee".to_string());

    let settings = Settings::load_from(None, Some(project.path()), Some(env)).unwrap();

    assert_eq!(settings.denylist, ["marquee"]);
}

#[test]
fn given_missing_files_when_load_then_defaults() {
    let project = TempDir::new().unwrap();
    let missing_global = project.path().join("nope.toml");

    let settings = Settings::load_from(Some(&missing_global), Some(project.path()), no_env()).unwrap();

    assert_eq!(settings, Settings::default());
}

// ============================================================
// Errors
// ============================================================

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    write(project.path(), ".sani.toml", "denylist = [unterminated\n");

    let result = Settings::load_from(None, Some(project.path()), no_env());

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_unknown_filter_kind_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        ".sani.toml",
        "[[filters]]\nkind = \"teleport\"\n",
    );

    let result = Settings::load_from(None, Some(project.path()), no_env());

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_bad_regex_in_config_when_building_pipeline_then_config_error() {
    let settings = Settings {
        filters: vec![FilterSpec::Redact {
            pattern: "[".into(),
            replacement: "x".into(),
        }],
        ..Settings::default()
    };

    let result = settings.pipeline::<Element>();

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

// ============================================================
// Filter files and pipelines
// ============================================================

#[test]
fn given_filter_file_when_loaded_then_returns_specs_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "filters.toml",
        r#"
[[filters]]
kind = "attribute-strip"
attributes = ["onclick"]

[[filters]]
kind = "redact"
pattern = "secret"
"#,
    );

    let specs = Settings::load_filter_file(&path).unwrap();

    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].kind(), "attribute-strip");
    assert_eq!(specs[1].kind(), "redact");
}

#[test]
fn given_default_settings_when_pipeline_applied_then_scripts_and_styles_are_dropped() {
    let settings = Settings::default();
    let pipeline = settings.pipeline::<Element>().unwrap();
    let mut tree = TreeBuilder::new(Element::new("body"))
        .leaf(Element::new("style"))
        .leaf(Element::new("p"))
        .leaf(Element::new("script"))
        .build();

    let report = apply(&mut tree, &pipeline, &Scope::new()).unwrap();

    let tags: Vec<String> = tree
        .traverse(Order::PreOrder)
        .map(|(_, n)| n.value().tag.clone())
        .collect();
    assert_eq!(tags, ["body", "p"]);
    assert_eq!(report.dropped, 2);
}

#[test]
fn given_empty_denylist_when_pipeline_built_then_only_configured_filters_run() {
    let settings = Settings {
        denylist: vec![],
        filters: vec![FilterSpec::MaxDepth { depth: 4 }],
        ..Settings::default()
    };

    let pipeline = settings.pipeline::<Element>().unwrap();

    assert_eq!(pipeline.filter_names(), ["max-depth"]);
}
