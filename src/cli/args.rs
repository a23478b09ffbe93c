// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for bab.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bab - local machine translation
#[derive(Parser, Debug)]
#[command(name = "bab")]
#[command(version, about = "Local machine translation with downloadable models")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Model cache directory (overrides settings)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download model artifacts into the cache
    Download {
        #[command(flatten)]
        model: ModelArg,

        /// Re-download even if already present
        #[arg(short, long)]
        force: bool,
    },

    /// Check which required model files are present
    Verify(ModelArg),

    /// Show where a model lives and whether it is downloaded and loaded
    Status(ModelArg),

    /// Load a model into memory to check it works
    LoadTest(ModelArg),

    /// Remove a model's cached artifacts
    Delete(ModelArg),

    /// List a model's supported languages
    Languages(ModelArg),

    /// Translate a piece of text
    Translate(TranslateArgs),

    /// List registered models
    Models,

    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Saved translations
    Saved {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Translation history
    History {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// User preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

/// Model selection shared by most subcommands
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ModelArg {
    /// Model id (defaults to the configured default model)
    #[arg(short, long = "model")]
    pub model: Option<String>,
}

/// Arguments for the translate subcommand
#[derive(clap::Args, Debug)]
pub struct TranslateArgs {
    /// Text to translate
    pub text: String,

    /// Source language code
    #[arg(short, long)]
    pub source: String,

    /// Target language code
    #[arg(short, long)]
    pub target: String,

    #[command(flatten)]
    pub model: ModelArg,
}

/// Arguments for the serve subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (overrides settings)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides settings)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Saved translation and history subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum RecordCommands {
    /// List entries, newest first
    List,

    /// Delete one entry
    Delete {
        /// Entry id
        id: String,
    },

    /// Delete every entry
    Clear,
}

/// Preference subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum PrefsCommands {
    /// Show a preference
    Get { key: String },

    /// Set a preference
    Set { key: String, value: String },

    /// Remove a preference
    Delete { key: String },
}
