//! Canonical home directory resolution for crew storage
//!
//! Precedence:
//! 1. `CREW_HOME` environment variable (if set and non-empty)
//! 2. `dirs::home_dir()` platform default
//!
//! Integration tests override the store location via `CREW_HOME` rather
//! than touching the real home directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Directory under the home dir that holds all crew state.
pub const STORE_DIR_NAME: &str = ".crew";

/// Get the home directory for crew operations.
///
/// Checks `CREW_HOME` first (useful for testing and custom deployments),
/// then falls back to the platform default.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("CREW_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir().context("Could not determine home directory")
}

/// Default store root: `<home>/.crew`.
pub fn default_store_root() -> Result<PathBuf> {
    Ok(get_home_dir()?.join(STORE_DIR_NAME))
}
