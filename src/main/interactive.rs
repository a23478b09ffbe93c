// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interactive translation session (no subcommand)

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::{
    cursor::MoveTo,
    style::{Color, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    ExecutableCommand,
};

use bab::cli::session::resolve_model_choice;
use bab::cli::{parse_command, SessionCommand, SessionState};
use bab::config::Settings;
use bab::error::{BabError, Result};
use bab::manager::ModelManager;
use bab::models::{get_language_codes, get_model_info, language_name};
use bab::storage::PreferencesStore;

use super::cli_commands::{print_failure, print_success, record_history};

struct Session {
    manager: Arc<ModelManager>,
    prefs: PreferencesStore,
    state: SessionState,
}

pub(super) async fn run_interactive(manager: Arc<ModelManager>) -> Result<bool> {
    let prefs = PreferencesStore::open(Settings::history_db_path())?;
    let state = SessionState::restore(&prefs, manager.default_model())?;
    let mut session = Session {
        manager,
        prefs,
        state,
    };

    session.print_welcome()?;
    let stdin = io::stdin();
    loop {
        session.print_prompt()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        match parse_command(&line) {
            SessionCommand::Empty => continue,
            SessionCommand::Quit => break,
            SessionCommand::Model(choice) => session.set_model(choice)?,
            SessionCommand::Source(code) => session.set_language(code, true)?,
            SessionCommand::Target(code) => session.set_language(code, false)?,
            SessionCommand::Swap => session.swap()?,
            SessionCommand::Status => session.show_status()?,
            SessionCommand::Languages(filter) => session.show_languages(filter.as_deref())?,
            SessionCommand::Models => session.show_models()?,
            SessionCommand::Clear => {
                let mut stdout = io::stdout();
                stdout.execute(Clear(ClearType::All))?;
                stdout.execute(MoveTo(0, 0))?;
            }
            SessionCommand::Help => print_help(),
            SessionCommand::Unknown(command) => {
                println!("Unknown command: {}", command);
                print_dim("Type /help for available commands.")?;
            }
            SessionCommand::Translate(text) => session.translate(&text).await?,
        }
    }

    println!("\nGoodbye!\n");
    Ok(true)
}

fn print_dim(message: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::DarkGrey))?;
    println!("  {}", message);
    stdout.execute(ResetColor)?;
    Ok(())
}

fn print_warning(message: &str) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Yellow))?;
    println!("⚠ {}", message);
    stdout.execute(ResetColor)?;
    Ok(())
}

fn print_help() {
    println!();
    println!("Commands:");
    for (command, help) in [
        ("/model [id|n]", "Select translation model"),
        ("/source <code>", "Set source language"),
        ("/target <code>", "Set target language"),
        ("/swap", "Swap source and target languages"),
        ("/status", "Show current settings and model status"),
        ("/languages [filter]", "List supported languages"),
        ("/models", "List available translation models"),
        ("/clear", "Clear the screen"),
        ("/help", "Show this help"),
        ("/quit, /exit, /q", "Exit"),
    ] {
        println!("  {:<22} {}", command, help);
    }
    println!();
    println!("Any other input is translated.");
    println!();
}

impl Session {
    fn language_display(&self, code: Option<&str>) -> String {
        match code {
            Some(code) => format!("{} ({})", code, language_name(&self.state.model_id, code)),
            None => "not set".to_string(),
        }
    }

    fn print_welcome(&self) -> Result<()> {
        let mut stdout = io::stdout();
        stdout.execute(SetForegroundColor(Color::Cyan))?;
        println!("\nbab - interactive translation");
        stdout.execute(ResetColor)?;
        println!();
        println!("Model:  {}", self.state.model_id);
        println!("Source: {}", self.language_display(self.state.source_lang.as_deref()));
        println!("Target: {}", self.language_display(self.state.target_lang.as_deref()));
        println!();
        print_dim("Type /help for commands. Enter text to translate.")?;
        println!();
        Ok(())
    }

    fn print_prompt(&self) -> Result<()> {
        let mut stdout = io::stdout();
        stdout.execute(SetForegroundColor(Color::Green))?;
        match self.state.language_pair() {
            Some((source, target)) => print!(
                "[{} → {}] {}> ",
                language_name(&self.state.model_id, source),
                language_name(&self.state.model_id, target),
                self.state.model_id
            ),
            None => print!("{}> ", self.state.model_id),
        }
        stdout.execute(ResetColor)?;
        stdout.flush()?;
        Ok(())
    }

    fn set_model(&mut self, choice: Option<String>) -> Result<()> {
        let Some(choice) = choice else {
            self.show_models()?;
            return print_dim("Use /model <number|id> to switch.");
        };

        let model_id = match resolve_model_choice(&choice) {
            Ok(model_id) => model_id,
            Err(BabError::UnknownModel { .. }) => {
                print_failure(&format!("Unknown model: '{}'", choice));
                return Ok(());
            }
            Err(e) => {
                print_failure(&e.to_string());
                return Ok(());
            }
        };

        self.state.set_model(model_id, &self.prefs)?;
        let info = get_model_info(model_id)?;
        print_success(&format!("Switched to {}", info.display_name))?;
        if !self.manager.get_backend(Some(model_id))?.is_downloaded() {
            print_dim(&format!(
                "Note: Model not downloaded. Run 'bab download --model {}' first.",
                model_id
            ))?;
        }
        Ok(())
    }

    fn set_language(&mut self, code: Option<String>, source: bool) -> Result<()> {
        let label = if source { "Source" } else { "Target" };
        let Some(code) = code else {
            let current = if source {
                &self.state.source_lang
            } else {
                &self.state.target_lang
            };
            println!("{}: {}", label, self.language_display(current.as_deref()));
            return print_dim(&format!("Use /{} <code> to change it.", label.to_lowercase()));
        };

        let result = if source {
            self.state.set_source(&code, &self.prefs)
        } else {
            self.state.set_target(&code, &self.prefs)
        };
        match result {
            Ok(()) => print_success(&format!(
                "{} set to {}",
                label,
                self.language_display(Some(&code))
            )),
            Err(BabError::UnsupportedLanguage { .. }) => {
                print_failure(&format!("Unknown language code: '{}'", code));
                print_dim("Use /languages to see available codes.")
            }
            Err(e) => Err(e),
        }
    }

    fn swap(&mut self) -> Result<()> {
        if !self.state.swap(&self.prefs)? {
            return print_warning("Both source and target languages are not set.");
        }
        print_success(&format!(
            "Languages swapped: {} → {}",
            self.language_display(self.state.source_lang.as_deref()),
            self.language_display(self.state.target_lang.as_deref())
        ))
    }

    fn show_status(&self) -> Result<()> {
        let status = self.manager.model_status(Some(&self.state.model_id))?;
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
        println!();
        println!("Model:      {} ({})", status.model_id, status.model_name);
        println!("Path:       {}", status.model_path.display());
        println!("Downloaded: {}", yes_no(status.is_downloaded));
        println!("Loaded:     {}", yes_no(status.is_loaded));
        println!("Runtime:    {}", self.manager.runtime_name());
        println!("Source:     {}", self.language_display(self.state.source_lang.as_deref()));
        println!("Target:     {}", self.language_display(self.state.target_lang.as_deref()));
        println!();
        Ok(())
    }

    fn show_languages(&self, filter: Option<&str>) -> Result<()> {
        let table = get_language_codes(&self.state.model_id)?;
        let entries = match filter {
            Some(query) => table.search(query),
            None => table.sorted(),
        };
        if entries.is_empty() {
            return print_warning("No matching languages.");
        }

        let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        println!();
        for (name, code) in &entries {
            println!("  {:<width$}  {}", name, code, width = width);
        }
        println!("\nTotal: {} languages\n", entries.len());
        Ok(())
    }

    fn show_models(&self) -> Result<()> {
        println!();
        println!("Available models:");
        println!();
        for (i, info) in self.manager.available_models().iter().enumerate() {
            let downloaded = self
                .manager
                .get_backend(Some(info.model_id))?
                .is_downloaded();
            let current = if info.model_id == self.state.model_id {
                " [current]"
            } else {
                ""
            };
            let auth = if info.requires_auth {
                " [requires HF token]"
            } else {
                ""
            };
            println!(
                "  {}. {} {} - {}{}{}",
                i + 1,
                if downloaded { "✓" } else { "○" },
                info.model_id,
                info.display_name,
                current,
                auth
            );
        }
        println!();
        Ok(())
    }

    async fn translate(&self, text: &str) -> Result<()> {
        let Some(source) = self.state.source_lang.as_deref() else {
            return print_warning("Source language not set. Use /source first.");
        };
        let Some(target) = self.state.target_lang.as_deref() else {
            return print_warning("Target language not set. Use /target first.");
        };

        let model_id = self.state.model_id.as_str();
        let backend = self.manager.get_backend(Some(model_id))?;
        if !backend.is_downloaded() {
            print_failure(&format!("Model '{}' not downloaded.", model_id));
            return print_dim(&format!(
                "Run 'bab download --model {}' from the command line first.",
                model_id
            ));
        }

        match backend.translate(text, source, target).await {
            Ok(translated) => {
                print_dim(&format!(
                    "{} → {}",
                    language_name(model_id, source),
                    language_name(model_id, target)
                ))?;
                println!("{}", translated);
                println!();
                record_history(text, &translated, source, target);
            }
            Err(e) => print_failure(&format!("Translation failed: {}", e)),
        }
        Ok(())
    }
}
