// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! bab - local machine translation
//!
//! Entry point for the bab CLI application.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use bab::cli::{Cli, Commands};
use bab::config::Settings;
use bab::manager::ModelManager;
use bab::storage::RecordKind;

#[path = "main/cli_commands.rs"]
mod cli_commands;
#[path = "main/interactive.rs"]
mod interactive;

use cli_commands::{
    print_failure, run_delete, run_download, run_languages, run_load_test, run_models,
    run_prefs_command, run_records_command, run_serve, run_status, run_translate, run_verify,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_failure(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise warn, raised for this crate by `-v`/`-vv`.
fn init_tracing(verbose: u8) {
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    let crate_level = match verbose {
        0 => None,
        1 => Some("bab=info"),
        _ => Some("bab=debug"),
    };
    if let Some(directive) = crate_level.and_then(|d| d.parse().ok()) {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a parsed command line. `Ok(false)` is a reported failure.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut settings = Settings::load()?;
    Settings::ensure_directories()?;
    if let Some(cache_dir) = cli.cache_dir {
        settings.models.cache_dir = Some(cache_dir);
    }

    let manager = Arc::new(ModelManager::from_settings(&settings)?);
    tracing::debug!(
        "Using runtime {} with cache {}",
        manager.runtime_name(),
        manager.cache_dir().display()
    );

    let ok = match cli.command {
        None => interactive::run_interactive(manager).await?,
        Some(Commands::Download { model, force }) => {
            run_download(&manager, model.model.as_deref(), force).await?
        }
        Some(Commands::Verify(model)) => run_verify(&manager, model.model.as_deref())?,
        Some(Commands::Status(model)) => run_status(&manager, model.model.as_deref())?,
        Some(Commands::LoadTest(model)) => run_load_test(&manager, model.model.as_deref()).await?,
        Some(Commands::Delete(model)) => run_delete(&manager, model.model.as_deref()).await?,
        Some(Commands::Languages(model)) => run_languages(&manager, model.model.as_deref())?,
        Some(Commands::Translate(args)) => run_translate(&manager, args).await?,
        Some(Commands::Models) => run_models(&manager)?,
        Some(Commands::Serve(args)) => run_serve(manager, settings, args).await?,
        Some(Commands::Saved { command }) => run_records_command(RecordKind::Saved, command)?,
        Some(Commands::History { command }) => {
            run_records_command(RecordKind::History, command)?
        }
        Some(Commands::Prefs { command }) => run_prefs_command(command)?,
    };
    Ok(ok)
}
