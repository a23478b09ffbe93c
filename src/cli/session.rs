// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interactive session state and command parsing
//!
//! The terminal loop lives in the binary. Everything here is free of I/O
//! apart from the preferences store, so it can be tested directly.

use crate::error::{BabError, Result};
use crate::models::{available_models, get_language_codes, is_known_model};
use crate::storage::PreferencesStore;

pub const PREF_MODEL_ID: &str = "cli:model_id";
pub const PREF_SOURCE_LANG: &str = "cli:source_lang";
pub const PREF_TARGET_LANG: &str = "cli:target_lang";

/// One line of user input, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Blank line
    Empty,
    Quit,
    /// `/model [id|n]`
    Model(Option<String>),
    /// `/source [code]`
    Source(Option<String>),
    /// `/target [code]`
    Target(Option<String>),
    Swap,
    Status,
    /// `/languages [filter]`
    Languages(Option<String>),
    Models,
    Clear,
    Help,
    /// Slash command that is not recognised
    Unknown(String),
    /// Anything else is text to translate
    Translate(String),
}

/// Classify a line of input.
pub fn parse_command(input: &str) -> SessionCommand {
    let input = input.trim();
    if input.is_empty() {
        return SessionCommand::Empty;
    }
    if !input.starts_with('/') {
        return SessionCommand::Translate(input.to_string());
    }

    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "/quit" | "/exit" | "/q" => SessionCommand::Quit,
        "/model" => SessionCommand::Model(arg),
        "/source" => SessionCommand::Source(arg),
        "/target" => SessionCommand::Target(arg),
        "/swap" => SessionCommand::Swap,
        "/status" => SessionCommand::Status,
        "/languages" => SessionCommand::Languages(arg),
        "/models" => SessionCommand::Models,
        "/clear" => SessionCommand::Clear,
        "/help" => SessionCommand::Help,
        _ => SessionCommand::Unknown(input.to_string()),
    }
}

/// Resolve a `/model` argument given as a registry id or 1-based index.
pub fn resolve_model_choice(choice: &str) -> Result<&'static str> {
    let models = available_models();
    if let Ok(n) = choice.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| models.get(i))
            .map(|m| m.model_id)
            .ok_or_else(|| BabError::InvalidInput(format!("Invalid choice: {}", choice)));
    }
    models
        .iter()
        .find(|m| m.model_id == choice)
        .map(|m| m.model_id)
        .ok_or_else(|| BabError::unknown_model(choice))
}

/// Current model and language pair of an interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub model_id: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

impl SessionState {
    /// Restore from preferences, dropping anything no longer valid.
    pub fn restore(prefs: &PreferencesStore, default_model: &str) -> Result<Self> {
        let model_id = prefs
            .get(PREF_MODEL_ID)?
            .filter(|id| is_known_model(id))
            .unwrap_or_else(|| default_model.to_string());
        let table = get_language_codes(&model_id)?;
        let valid = |code: Option<String>| code.filter(|c| table.contains_code(c));

        Ok(Self {
            source_lang: valid(prefs.get(PREF_SOURCE_LANG)?),
            target_lang: valid(prefs.get(PREF_TARGET_LANG)?),
            model_id,
        })
    }

    /// Both languages, once set.
    pub fn language_pair(&self) -> Option<(&str, &str)> {
        Some((self.source_lang.as_deref()?, self.target_lang.as_deref()?))
    }

    /// Switch model and drop language codes the new model does not know.
    pub fn set_model(&mut self, model_id: &str, prefs: &PreferencesStore) -> Result<()> {
        let table = get_language_codes(model_id)?;
        self.model_id = model_id.to_string();
        prefs.set(PREF_MODEL_ID, model_id)?;

        for (slot, key) in [
            (&mut self.source_lang, PREF_SOURCE_LANG),
            (&mut self.target_lang, PREF_TARGET_LANG),
        ] {
            if slot.as_deref().is_some_and(|c| !table.contains_code(c)) {
                *slot = None;
                prefs.delete(key)?;
            }
        }
        Ok(())
    }

    pub fn set_source(&mut self, code: &str, prefs: &PreferencesStore) -> Result<()> {
        self.check_code(code)?;
        self.source_lang = Some(code.to_string());
        prefs.set(PREF_SOURCE_LANG, code)
    }

    pub fn set_target(&mut self, code: &str, prefs: &PreferencesStore) -> Result<()> {
        self.check_code(code)?;
        self.target_lang = Some(code.to_string());
        prefs.set(PREF_TARGET_LANG, code)
    }

    /// Swap source and target. Returns false when neither is set.
    pub fn swap(&mut self, prefs: &PreferencesStore) -> Result<bool> {
        if self.source_lang.is_none() && self.target_lang.is_none() {
            return Ok(false);
        }
        std::mem::swap(&mut self.source_lang, &mut self.target_lang);
        for (value, key) in [
            (&self.source_lang, PREF_SOURCE_LANG),
            (&self.target_lang, PREF_TARGET_LANG),
        ] {
            match value {
                Some(code) => prefs.set(key, code)?,
                None => {
                    prefs.delete(key)?;
                }
            }
        }
        Ok(true)
    }

    fn check_code(&self, code: &str) -> Result<()> {
        if get_language_codes(&self.model_id)?.contains_code(code) {
            Ok(())
        } else {
            Err(BabError::UnsupportedLanguage {
                model_id: self.model_id.clone(),
                code: code.to_string(),
            })
        }
    }
}
