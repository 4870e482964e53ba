// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `dirbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dirbuild",
    version,
    about = "Incremental builds for C/C++ trees laid out by directory convention.",
    long_about = None
)]
pub struct CliArgs {
    /// Project root. All layout directories are relative to it.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Config file (TOML). Default: `Dirbuild.toml` in the project root,
    /// if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum concurrent compile/link actions (overrides `[build] jobs`).
    #[arg(long, short = 'j', global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIRBUILD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the planned actions without running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The subcommand, defaulting to `build`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Build)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Build everything that is out of date (default).
    Build,
    /// Remove all generated state, then build.
    Rebuild,
    /// Remove objects, dependency records, artifacts and published links.
    Clean,
    /// Print the resolved build graph and what is stale.
    Inspect {
        /// Emit Graphviz instead of text.
        #[arg(long)]
        dot: bool,
    },
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
    fn build_is_the_default_command() {
        let args = CliArgs::try_parse_from(["dirbuild"]).unwrap();
        assert_eq!(args.command(), Command::Build);
        assert_eq!(args.root, PathBuf::from("."));
    }

    #[test]
    fn global_flags_and_subcommands() {
        let args =
            CliArgs::try_parse_from(["dirbuild", "--root", "proj", "-j", "4", "inspect", "--dot"])
                .unwrap();
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.root, PathBuf::from("proj"));
        assert_eq!(args.command(), Command::Inspect { dot: true });
    }

    #[test]
    fn global_flags_also_follow_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "dirbuild",
            "build",
            "--dry-run",
            "--root",
            "proj",
            "-j",
            "2",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.command(), Command::Build);
        assert!(args.dry_run);
        assert_eq!(args.root, PathBuf::from("proj"));
        assert_eq!(args.jobs, Some(2));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
