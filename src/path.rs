// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations of the files devtier reads and writes: the
//! persisted tier preference dotfile, and the optional configuration file.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to tier preference dotfile.
///
/// Uses `$HOME/.devtier`. Does not check if the path returned actually
/// exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_preference_file() -> Result<PathBuf> {
    home_dir().map(|path| path.join(".devtier"))
}

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/devtier/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("devtier").join("config.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn preference_file_lives_in_home() -> anyhow::Result<()> {
        assert_eq!(default_preference_file()?, PathBuf::from("/home/blah/.devtier"));
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[sealed_test(env = [("XDG_CONFIG_HOME", "/home/blah/.config")])]
    fn config_file_follows_xdg() -> anyhow::Result<()> {
        assert_eq!(
            default_config_file()?,
            PathBuf::from("/home/blah/.config/devtier/config.toml")
        );
        Ok(())
    }
}
