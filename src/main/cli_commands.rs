// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use indicatif::{ProgressBar, ProgressStyle};

use bab::cli::{PrefsCommands, RecordCommands, ServeArgs, TranslateArgs};
use bab::config::Settings;
use bab::error::{BabError, Result};
use bab::manager::ModelManager;
use bab::models::get_language_codes;
use bab::server::{self, AppState};
use bab::storage::{PreferencesStore, RecordKind, RecordStore, Stores};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub(super) fn print_success(message: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    println!("✓ {}", message);
    stdout.execute(ResetColor)?;
    Ok(())
}

/// Red `✗` line on stderr. Colour failures are ignored.
pub(super) fn print_failure(message: &str) {
    let mut stderr = io::stderr();
    let _ = stderr.execute(SetForegroundColor(Color::Red));
    eprintln!("✗ {}", message);
    let _ = stderr.execute(ResetColor);
}

fn print_hint(message: &str) {
    eprintln!("  {}", message);
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_model_header(manager: &ModelManager, model_id: Option<&str>) -> Result<()> {
    let backend = manager.get_backend(model_id)?;
    let info = backend.descriptor();
    println!("Model: {} ({})", info.display_name, info.repo_id);
    println!("Cache directory: {}", backend.cache_dir().display());
    println!("Model path: {}", backend.model_path().display());
    println!();
    Ok(())
}

pub(super) async fn run_download(
    manager: &ModelManager,
    model_id: Option<&str>,
    force: bool,
) -> Result<bool> {
    print_model_header(manager, model_id)?;
    let backend = manager.get_backend(model_id)?;

    if backend.is_downloaded() && !force {
        print_success("Model already downloaded.")?;
        println!("  Use --force to re-download.");
        return Ok(true);
    }

    let info = backend.descriptor();
    let pb = spinner(format!(
        "Downloading {} (this may take a while, {})",
        info.display_name, info.size_estimate
    ));
    let result = backend.download_model(force).await;
    pb.finish_and_clear();

    match result {
        Ok(_) => {
            print_success("Model downloaded successfully!")?;
            Ok(true)
        }
        Err(e) => {
            print_failure(&format!("Download failed: {}", e));
            Ok(false)
        }
    }
}

pub(super) fn run_verify(manager: &ModelManager, model_id: Option<&str>) -> Result<bool> {
    let backend = manager.get_backend(model_id)?;
    println!("Model path: {}", backend.model_path().display());
    println!();

    if !backend.model_path().exists() {
        print_failure("Model directory does not exist.");
        print_hint("Run 'download' command first.");
        return Ok(false);
    }

    let files = backend.verify_model_files();
    for (name, present) in &files {
        println!("  {} {}", if *present { "✓" } else { "✗" }, name);
    }
    println!();

    if files.values().all(|present| *present) {
        print_success("All required files are present.")?;
        Ok(true)
    } else {
        print_failure("Some files are missing.");
        Ok(false)
    }
}

pub(super) fn run_status(manager: &ModelManager, model_id: Option<&str>) -> Result<bool> {
    print_model_header(manager, model_id)?;
    let status = manager.model_status(model_id)?;
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };

    println!("Downloaded: {}", yes_no(status.is_downloaded));
    println!("Loaded in memory: {}", yes_no(status.is_loaded));
    if status.is_downloaded {
        let bytes = manager.model_size_bytes(model_id)?;
        println!("Total size: {:.1} MB", bytes as f64 / BYTES_PER_MB);
    }
    Ok(true)
}

pub(super) async fn run_load_test(manager: &ModelManager, model_id: Option<&str>) -> Result<bool> {
    let backend = manager.get_backend(model_id)?;
    println!("Testing model load...");
    println!();

    let pb = spinner(format!("Loading {}", backend.descriptor().display_name));
    let result = backend.load_model().await;
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            print_success(&format!("Model loaded: {}", backend.descriptor().display_name))?;
            print_success(&format!("Runtime: {}", manager.runtime_name()))?;
            println!();
            println!("Model is ready for translation!");
            Ok(true)
        }
        Err(e) => {
            print_failure(&format!("Load failed: {}", e));
            Ok(false)
        }
    }
}

pub(super) async fn run_delete(manager: &ModelManager, model_id: Option<&str>) -> Result<bool> {
    let backend = manager.get_backend(model_id)?;
    if !backend.model_path().exists() {
        println!("Model not downloaded, nothing to remove.");
        return Ok(true);
    }

    match backend.delete_model().await {
        Ok(()) => {
            print_success(&format!("Removed {}", backend.model_path().display()))?;
            Ok(true)
        }
        Err(e) => {
            print_failure(&format!("Removal failed: {}", e));
            Ok(false)
        }
    }
}

pub(super) fn run_languages(manager: &ModelManager, model_id: Option<&str>) -> Result<bool> {
    let table = manager.get_language_codes(model_id)?;
    let model_id = model_id.unwrap_or(manager.default_model());
    let sorted = table.sorted();
    let width = sorted.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    println!("Supported languages for {}:\n", model_id);
    for (name, code) in &sorted {
        println!("  {:<width$}  {}", name, code, width = width);
    }
    println!("\nTotal: {} languages", sorted.len());
    Ok(true)
}

pub(super) async fn run_translate(manager: &ModelManager, args: TranslateArgs) -> Result<bool> {
    let backend = manager.get_backend(args.model.model.as_deref())?;
    let model_id = backend.model_id();
    let table = get_language_codes(model_id)?;

    for (role, code) in [("source", &args.source), ("target", &args.target)] {
        if !table.contains_code(code) {
            print_failure(&format!("Unsupported {} language code: '{}'", role, code));
            print_hint(&format!(
                "Use 'bab languages --model {}' to see supported language codes.",
                model_id
            ));
            return Ok(false);
        }
    }

    if !backend.is_downloaded() {
        print_failure(&BabError::NotDownloaded(model_id.to_string()).to_string());
        print_hint(&format!("Run 'bab download --model {}' first.", model_id));
        return Ok(false);
    }

    match backend.translate(&args.text, &args.source, &args.target).await {
        Ok(translated) => {
            println!("{}", translated);
            record_history(&args.text, &translated, &args.source, &args.target);
            Ok(true)
        }
        Err(e) => {
            print_failure(&format!("Translation failed: {}", e));
            Ok(false)
        }
    }
}

/// Best effort: a history failure never fails the translation.
pub(super) fn record_history(source_text: &str, translated: &str, source: &str, target: &str) {
    let result = RecordStore::open(Settings::history_db_path(), RecordKind::History)
        .and_then(|store| store.find_or_create(source_text, translated, source, target));
    if let Err(e) = result {
        tracing::warn!("Failed to record translation history: {}", e);
    }
}

pub(super) fn run_models(manager: &ModelManager) -> Result<bool> {
    println!("Available models:\n");
    for (i, info) in manager.available_models().iter().enumerate() {
        let status = manager.model_status(Some(info.model_id))?;
        let mark = if status.is_downloaded { "✓" } else { "○" };
        let default = if info.model_id == manager.default_model() {
            " [default]"
        } else {
            ""
        };
        let auth = if info.requires_auth {
            " [requires HF token]"
        } else {
            ""
        };
        println!(
            "  {}. {} {} - {} ({}){}{}",
            i + 1,
            mark,
            info.model_id,
            info.display_name,
            info.size_estimate,
            default,
            auth
        );
        println!("       {}", info.description);
    }
    println!();
    Ok(true)
}

pub(super) async fn run_serve(
    manager: Arc<ModelManager>,
    mut settings: Settings,
    args: ServeArgs,
) -> Result<bool> {
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let state = AppState::new(manager, Stores::open_default()?);
    println!(
        "Serving on http://{}:{} (Ctrl+C to stop)",
        settings.server.host, settings.server.port
    );
    io::stdout().flush()?;
    server::serve(state, &settings.server).await?;
    Ok(true)
}

pub(super) fn run_records_command(kind: RecordKind, command: RecordCommands) -> Result<bool> {
    let store = match kind {
        RecordKind::Saved => RecordStore::open(Settings::saved_db_path(), kind)?,
        RecordKind::History => RecordStore::open(Settings::history_db_path(), kind)?,
    };
    let plural = match kind {
        RecordKind::Saved => "saved translations",
        RecordKind::History => "history items",
    };

    match command {
        RecordCommands::List => {
            let records = store.list_all()?;
            if records.is_empty() {
                println!("\nNo {}.\n", plural);
                return Ok(true);
            }
            println!();
            for record in records {
                println!(
                    "  {} | {} | {} → {} | {} → {}",
                    record.id,
                    record.timestamp,
                    record.source_lang,
                    record.target_lang,
                    record.source_text,
                    record.translated_text
                );
            }
            println!();
        }
        RecordCommands::Delete { id } => {
            if !store.delete(&id)? {
                print_failure(&format!("No entry with id '{}'", id));
                return Ok(false);
            }
            print_success("Deleted.")?;
        }
        RecordCommands::Clear => {
            let removed = store.clear_all()?;
            print_success(&format!("Deleted {} {}", removed, plural))?;
        }
    }
    Ok(true)
}

pub(super) fn run_prefs_command(command: PrefsCommands) -> Result<bool> {
    let prefs = PreferencesStore::open(Settings::history_db_path())?;
    match command {
        PrefsCommands::Get { key } => match prefs.get(&key)? {
            Some(value) => println!("{}", value),
            None => {
                print_failure(&format!("Preference '{}' not set", key));
                return Ok(false);
            }
        },
        PrefsCommands::Set { key, value } => {
            prefs.set(&key, &value)?;
            print_success(&format!("{} = {}", key, value))?;
        }
        PrefsCommands::Delete { key } => {
            if !prefs.delete(&key)? {
                print_failure(&format!("Preference '{}' not set", key));
                return Ok(false);
            }
            print_success(&format!("Removed {}", key))?;
        }
    }
    Ok(true)
}
