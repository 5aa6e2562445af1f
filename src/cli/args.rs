//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::application::ReplacePolicy;

/// Sanitize hierarchical documents with configurable keep/drop/rewrite filters
#[derive(Parser, Debug)]
#[command(name = "sani")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log level (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding `.sani.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter JSON documents and print the decision report
    Apply {
        /// Input documents
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        inputs: Vec<PathBuf>,

        /// Output file (single input only; default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath, conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite each input with its sanitized version
        #[arg(short, long)]
        in_place: bool,

        /// Additional filter file(s) with `[[filters]]` entries
        #[arg(short, long = "filter-file", value_hint = ValueHint::FilePath)]
        filter_file: Vec<PathBuf>,

        /// Additional tag(s) to drop; `!tag` removes a configured one
        #[arg(long)]
        deny: Vec<String>,

        /// Keep partial results when a filter fails
        #[arg(long)]
        no_transaction: bool,

        /// Override the configured replace policy (short-circuit, continue)
        #[arg(long)]
        replace_policy: Option<ReplacePolicy>,
    },

    /// Show a document as a tree
    Tree {
        /// Input document
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a commented config template
    Template,
}
