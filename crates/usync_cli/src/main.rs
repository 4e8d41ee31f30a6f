//! uSync CLI
//!
//! Command-line tools for uSync sync folders.
//!
//! # Commands
//!
//! - `inspect` - Display handler folders, item counts and the folder format
//! - `verify` - Check that every sync file parses and has a valid key
//! - `diff` - Show property level changes between two sync files
//! - `migrate-config` - Migrate legacy data type configuration
//! - `merge-config` - Merge or diff data type configuration against a root

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// uSync command-line folder tools.
#[derive(Parser)]
#[command(name = "usync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display handler folders, item counts and the folder format
    Inspect {
        /// Sync folder root
        folder: PathBuf,

        /// Sync file extension
        #[arg(short, long, default_value = "config")]
        extension: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that every sync file parses and has a valid key
    Verify {
        /// Sync folder root
        folder: PathBuf,

        /// Sync file extension
        #[arg(short, long, default_value = "config")]
        extension: String,
    },

    /// Show property level changes between two sync files
    Diff {
        /// Current file
        old: PathBuf,

        /// Incoming file
        new: PathBuf,

        /// Also list unchanged values
        #[arg(short, long)]
        all: bool,
    },

    /// Migrate legacy data type configuration
    MigrateConfig {
        /// Property editor alias
        #[arg(short, long)]
        editor: String,

        /// JSON configuration file
        file: PathBuf,
    },

    /// Merge or diff data type configuration against a root
    MergeConfig {
        /// Property editor alias
        #[arg(short, long)]
        editor: String,

        /// Root (base) configuration
        #[arg(short, long)]
        root: PathBuf,

        /// Target configuration
        #[arg(short, long)]
        target: PathBuf,

        /// Compute the difference instead of the merge
        #[arg(short, long)]
        difference: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect {
            folder,
            extension,
            format,
        } => {
            commands::inspect::run(&folder, &extension, &format)?;
        }
        Commands::Verify { folder, extension } => {
            commands::verify::run(&folder, &extension)?;
        }
        Commands::Diff { old, new, all } => {
            commands::diff::run(&old, &new, all)?;
        }
        Commands::MigrateConfig { editor, file } => {
            commands::config::migrate(&editor, &file)?;
        }
        Commands::MergeConfig {
            editor,
            root,
            target,
            difference,
        } => {
            commands::config::merge(&editor, &root, &target, difference)?;
        }
        Commands::Version => {
            println!("uSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Sync file format v{}", usync_xml::FORMAT_VERSION);
        }
    }

    Ok(())
}
