//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cfgsync - Synchronize database configuration objects with a file repository
#[derive(Parser, Debug)]
#[command(name = "cfgsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Database connection options shared by commands that open a database
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Connection string: `source=<snapshot file>[;license=<key>]` or a bare path
    #[arg(short, long, env = "CFGSYNC_CONNECTION")]
    pub connection: String,

    /// License key, when not given in the connection string
    #[arg(long, env = "CFGSYNC_LICENSE", hide_env_values = true)]
    pub license: Option<String>,
}

/// Output selection shared by commands that report issues
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ReportArgs {
    /// Emit TeamCity service messages instead of console output
    #[arg(long)]
    pub ci: bool,

    /// Directory receiving copies of every file with an issue
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Verify that a reference repository matches the database
    ///
    /// Stores the database into a fresh target repository and compares it
    /// with the reference. Exits non-zero when any difference is found.
    ///
    /// Examples:
    ///   cfgsync check -c db.json ./repository ./out/repository
    ///   cfgsync check --ci --artifacts Artifacts ./repository ./out/repository
    Check {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Repository to verify
        reference: PathBuf,

        /// Scratch directory the database is stored into (cleared first)
        target: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Store all database objects into a repository
    Store {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Repository root
        repository: PathBuf,

        /// Include binding (child/link) types
        #[arg(long)]
        bindings: bool,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Restore database objects from a repository and save the database
    Restore {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Repository root
        repository: PathBuf,

        /// Include binding (child/link) types
        #[arg(long)]
        bindings: bool,
    },

    /// Compare two repository directories
    Compare {
        /// Reference directory
        reference: PathBuf,

        /// Directory compared against the reference
        target: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },
}
