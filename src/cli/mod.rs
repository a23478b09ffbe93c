// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI module for bab
//!
//! Argument parsing and the interactive session model.

pub mod args;
pub mod session;

pub use args::*;
pub use session::{parse_command, SessionCommand, SessionState};
