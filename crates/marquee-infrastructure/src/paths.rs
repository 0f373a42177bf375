//! Unified path management for marquee configuration and data files.
//!
//! All marquee configuration and session data live under the platform's
//! standard config/data directories so every storage component agrees on
//! where files go.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for marquee.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/marquee/           # Config directory
/// └── secret.json              # Supabase URL and anon key
///
/// ~/.local/share/marquee/      # Data directory
/// └── session.json             # Persisted authenticated session
/// ```
pub struct MarqueePaths;

impl MarqueePaths {
    /// Returns the marquee configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/marquee/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("marquee"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the marquee data directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to data directory (e.g., `~/.local/share/marquee/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join("marquee"))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the secret configuration file.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the path to the persisted session file.
    pub fn session_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("session.json"))
    }
}
