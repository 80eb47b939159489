use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// vb-lint CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "vb-lint",
    version,
    about = "Lint Visual Basic code for suspicious ByRef arguments",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub lint: LintArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint files or directories.
    Lint(LintArgs),

    /// List available lints.
    ListRules,

    /// Explain a lint.
    Explain {
        /// Lint rule name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files/directories to lint (`*.vb`). Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these lints (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Use this config file instead of searching for `vb-lint.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Apply available fixes to the linted files.
    #[arg(long)]
    pub fix: bool,

    /// Also apply fixes that may change behavior.
    #[arg(long, requires = "fix")]
    pub unsafe_fixes: bool,

    /// Print the fixes as a diff instead of writing them.
    #[arg(long, requires = "fix")]
    pub fix_dry_run: bool,

    /// Do not write a `.bak` copy of each fixed file.
    #[arg(long, requires = "fix")]
    pub no_backup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}
