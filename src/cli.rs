// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `exerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "exerun",
    version,
    about = "Compile a programming exercise, run its tests and report the results.",
    long_about = None
)]
pub struct CliArgs {
    /// Project root directory.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Path to the config file (TOML).
    ///
    /// Default: `Exerun.toml` in the project directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Compile, run the tests and (optionally) submit.
    Test,
    /// Check code style.
    Style,
    /// Print the resolved project and the commands each stage would run.
    DryRun,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommand_and_flags() {
        let args =
            CliArgs::try_parse_from(["exerun", "--project", "ex/hello", "--log-level", "debug", "test"])
                .unwrap();
        assert_eq!(args.command, Command::Test);
        assert_eq!(args.project, PathBuf::from("ex/hello"));
        assert!(args.config.is_none());
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn json_flag_is_accepted_after_subcommand() {
        let args = CliArgs::try_parse_from(["exerun", "style", "--json"]).unwrap();
        assert_eq!(args.command, Command::Style);
        assert!(args.json);
    }

    #[test]
    fn dry_run_is_kebab_case() {
        let args = CliArgs::try_parse_from(["exerun", "dry-run"]).unwrap();
        assert_eq!(args.command, Command::DryRun);
    }
}
