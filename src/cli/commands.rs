//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info, instrument};

use crate::application::{Report, ReplacePolicy, Scope};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Element, SaniTree, TreeRender};
use crate::infrastructure::{read_document, to_json, write_document, InfraError};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;

    match &cli.command {
        Some(Commands::Apply {
            inputs,
            output,
            in_place,
            filter_file,
            deny,
            no_transaction,
            replace_policy,
        }) => {
            let overrides = ApplyOverrides {
                filter_files: filter_file,
                deny,
                no_transaction: *no_transaction,
                replace_policy: *replace_policy,
            };
            let target = match (output, *in_place) {
                (Some(path), _) => Target::File(path),
                (None, true) => Target::InPlace,
                (None, false) => Target::Stdout,
            };
            cmd_apply(&project_dir, inputs, target, &overrides)
        }
        Some(Commands::Tree { input }) => cmd_tree(input),
        Some(Commands::Config { command }) => execute_config(command, &project_dir),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "sani", &mut io::stdout());
            Ok(())
        }
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

fn resolve_project_dir(project_dir: Option<&Path>) -> CliResult<PathBuf> {
    match project_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("get current directory", e).into()),
    }
}

/// Command-line adjustments layered over the loaded settings.
struct ApplyOverrides<'a> {
    filter_files: &'a [PathBuf],
    deny: &'a [String],
    no_transaction: bool,
    replace_policy: Option<ReplacePolicy>,
}

impl ApplyOverrides<'_> {
    fn apply_to(&self, mut settings: Settings) -> CliResult<Settings> {
        if !self.deny.is_empty() {
            settings.denylist = Settings::merge_array(&settings.denylist, self.deny);
        }
        for path in self.filter_files {
            settings.filters.extend(Settings::load_filter_file(path)?);
        }
        if self.no_transaction {
            settings.transactional = false;
        }
        if let Some(policy) = self.replace_policy {
            settings.replace_policy = policy;
        }
        Ok(settings)
    }
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Stdout,
    File(&'a Path),
    InPlace,
}

#[instrument(skip(overrides, target))]
fn cmd_apply(
    project_dir: &Path,
    inputs: &[PathBuf],
    target: Target<'_>,
    overrides: &ApplyOverrides<'_>,
) -> CliResult<()> {
    if matches!(target, Target::File(_)) && inputs.len() > 1 {
        return Err(CliError::InvalidArgs(
            "--output needs exactly one input, use --in-place for several".into(),
        ));
    }

    let settings = overrides.apply_to(Settings::load(Some(project_dir))?)?;
    debug!(?settings, "effective settings");
    let pipeline = settings.pipeline::<Element>()?;
    let engine = settings.engine();
    info!(filters = ?pipeline.filter_names(), "applying");

    let mut trees = inputs
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<SaniTree<Element>>, _>>()?;

    let results = engine.apply_many(&mut trees, &pipeline, &Scope::new());

    let mut total = Report::default();
    for ((path, tree), result) in inputs.iter().zip(&trees).zip(results) {
        let report = result?;
        output::report(&path.display(), &report);
        total.merge(&report);

        match target {
            Target::Stdout => output::info(&to_json(tree)?),
            Target::File(out) => {
                write_document(tree, out)?;
                output::success(&format!("wrote {}", out.display()));
            }
            Target::InPlace => {
                write_document(tree, path)?;
                output::success(&format!("rewrote {}", path.display()));
            }
        }
    }
    if inputs.len() > 1 {
        output::report("total", &total);
    }
    Ok(())
}

#[instrument]
fn cmd_tree(input: &Path) -> CliResult<()> {
    let tree = read_document(input)?;
    output::info(&tree.to_termtree());
    Ok(())
}

fn execute_config(cmd: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match cmd {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(project_dir))?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            output::header("Config locations");
            match global_config_path() {
                Some(path) => output::detail(&format_location("global", &path)),
                None => output::warning("no home directory, global config disabled"),
            }
            output::detail(&format_location("local", &local_config_path(project_dir)));
            Ok(())
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
            Ok(())
        }
    }
}

fn format_location(label: &str, path: &Path) -> String {
    let state = if path.exists() { "" } else { " (not found)" };
    format!("{label}: {}{state}", path.display())
}
