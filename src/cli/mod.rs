//! CLI Module
//!
//! Command-line interface over a JSON data directory.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Patchbay - manage banks of patches and the current selection
#[derive(Parser, Debug)]
#[command(name = "patchbay-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overriding the configuration
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List banks and patches, marking the current one
    #[command(name = "list")]
    List,

    /// Create a bank holding one empty patch
    #[command(name = "create-bank")]
    CreateBank {
        /// Name of the new bank
        name: String,

        /// Name of its first patch (defaults to the configured patch name)
        #[arg(short, long)]
        patch: Option<String>,
    },

    /// Rename the bank at an index
    #[command(name = "rename-bank")]
    RenameBank {
        /// Bank index
        bank: usize,

        /// New name
        name: String,
    },

    /// Delete the bank at an index
    #[command(name = "delete-bank")]
    DeleteBank {
        /// Bank index
        bank: usize,
    },

    /// Append an empty patch to a bank
    #[command(name = "create-patch")]
    CreatePatch {
        /// Bank index
        bank: usize,

        /// Name of the new patch
        name: String,
    },

    /// Delete a patch
    #[command(name = "delete-patch")]
    DeletePatch {
        /// Bank index
        bank: usize,

        /// Patch index within the bank
        patch: usize,
    },

    /// Make a bank (and optionally a patch in it) current
    #[command(name = "select")]
    Select {
        /// Bank index
        bank: usize,

        /// Patch index within the bank
        patch: Option<usize>,
    },

    /// Move to the next patch of the current bank
    #[command(name = "next-patch")]
    NextPatch,

    /// Move to the previous patch of the current bank
    #[command(name = "prev-patch")]
    PrevPatch,

    /// Move to the next bank
    #[command(name = "next-bank")]
    NextBank,

    /// Move to the previous bank
    #[command(name = "prev-bank")]
    PrevBank,

    /// Remove bank records no longer listed in the manifest
    #[command(name = "prune")]
    Prune,
}
