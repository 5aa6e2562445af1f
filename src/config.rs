//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sani/sani.toml`
//! 3. Local config: `<project_dir>/.sani.toml`
//! 4. Environment variables: `SANI_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, Map};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::catalog::TagDenylist;
use crate::application::{ApplicationError, ApplicationResult, Engine, FilterSpec, Pipeline, ReplacePolicy};
use crate::domain::Markup;

/// Unified configuration for sani.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Restore the tree when a filter fails
    pub transactional: bool,
    /// What a pipeline does after a filter replaces a node
    pub replace_policy: ReplacePolicy,
    /// Tags dropped before any configured filter runs
    pub denylist: Vec<String>,
    /// Catalog filters, in priority order
    pub filters: Vec<FilterSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transactional: true,
            replace_policy: ReplacePolicy::default(),
            denylist: vec!["script".into(), "style".into()],
            filters: vec![],
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub transactional: Option<bool>,
    pub replace_policy: Option<ReplacePolicy>,
    pub denylist: Option<Vec<String>>,
    pub filters: Option<Vec<FilterSpec>>,
}

/// A standalone filter file as passed with `--filter-file`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct FilterFile {
    filters: Vec<FilterSpec>,
}

/// Get the XDG config directory for sani.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sani").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("sani.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".sani.toml")
}

fn read_toml<D: for<'de> Deserialize<'de>>(path: &Path) -> ApplicationResult<D> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    ///
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for item in overlay {
            if let Some(negated) = item.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(item.clone());
            }
        }

        // sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Global config onto defaults: everything specified REPLACES.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            transactional: global.transactional.unwrap_or(self.transactional),
            replace_policy: global.replace_policy.unwrap_or(self.replace_policy),
            denylist: global
                .denylist
                .clone()
                .unwrap_or_else(|| self.denylist.clone()),
            filters: global
                .filters
                .clone()
                .unwrap_or_else(|| self.filters.clone()),
        }
    }

    /// Local config onto global: denylist UNION with negation, filters appended.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut filters = self.filters.clone();
        if let Some(extra) = &overlay.filters {
            filters.extend(extra.iter().cloned());
        }
        Self {
            transactional: overlay.transactional.unwrap_or(self.transactional),
            replace_policy: overlay.replace_policy.unwrap_or(self.replace_policy),
            denylist: overlay
                .denylist
                .as_ref()
                .map(|o| Self::merge_array(&self.denylist, o))
                .unwrap_or_else(|| self.denylist.clone()),
            filters,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: `denylist` UNION with `!tag` negation, `filters` appended
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(project_dir: Option<&Path>) -> ApplicationResult<Self> {
        Self::load_from(global_config_path().as_deref(), project_dir, None)
    }

    /// Same as [`Settings::load`] with explicit sources.
    ///
    /// `env` replaces the process environment when given; keys carry the
    /// `SANI_` prefix as they would in the environment.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> ApplicationResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_path.filter(|p| p.exists()) {
            debug!("loading global config {}", global_path.display());
            let raw: RawSettings = read_toml(global_path)?;
            current = current.apply_global(&raw);
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("loading local config {}", local_path.display());
                let raw: RawSettings = read_toml(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        Self::apply_env_overrides(current, env)
    }

    /// Apply SANI_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env: Option<Map<String, String>>) -> ApplicationResult<Self> {
        let source = Environment::with_prefix("SANI")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("denylist")
            .source(env);
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("transactional") {
            settings.transactional = val;
        }
        if let Ok(val) = config.get_string("replace_policy") {
            settings.replace_policy = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get::<Vec<String>>("denylist") {
            settings.denylist = val.into_iter().filter(|t| !t.is_empty()).collect();
        }

        Ok(settings)
    }

    /// Read the `[[filters]]` of a standalone filter file.
    pub fn load_filter_file(path: &Path) -> ApplicationResult<Vec<FilterSpec>> {
        let file: FilterFile = read_toml(path)?;
        Ok(file.filters)
    }

    /// Pipeline of the denylist (if any) followed by the configured filters.
    pub fn pipeline<T: Markup + 'static>(&self) -> ApplicationResult<Pipeline<T>> {
        let mut pipeline = Pipeline::new()
            .named("sani")
            .with_replace_policy(self.replace_policy);
        if !self.denylist.is_empty() {
            pipeline.push(Box::new(TagDenylist::new(self.denylist.iter().cloned())));
        }
        for spec in &self.filters {
            pipeline.push(spec.build()?);
        }
        Ok(pipeline)
    }

    pub fn engine(&self) -> Engine {
        Engine::new().transactional(self.transactional)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sani configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sani/sani.toml  (defines your baseline)
#   Local:  <project>/.sani.toml      (project-specific additions)
#   Env:    SANI_* environment variables (explicit overrides)
#
# Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local denylist UNIONS with global, use "!tag" to REMOVE an inherited tag:
#     denylist = ["iframe", "!style"]
#   Local filters are appended after the global ones.

# Restore the document when a filter fails
# transactional = true

# After a replace: "short-circuit" or "continue" with the remaining filters
# replace_policy = "short-circuit"

# Tags dropped before any other filter runs
# denylist = ["script", "style"]

# Filters, evaluated in order; the first non-keep decision wins
# [[filters]]
# kind = "attribute-strip"
# attributes = ["onclick", "onload"]
#
# [[filters]]
# kind = "redact"
# pattern = "\\b\\d{3}-\\d{2}-\\d{4}\\b"
# replacement = "[ssn]"
#
# [[filters]]
# kind = "max-depth"
# depth = 32
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
