// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Persisted tier preference.
//!
//! The user's chosen tier survives restarts through a plain-text dotfile that
//! holds a single integer. The file is only ever written through explicit user
//! action, e.g., `devtier set 2`, and it is read at every startup.
//!
//! # Preference File Layout
//!
//! The file contains the tier number followed by a newline. Surrounding
//! whitespace is ignored when reading, so a hand-edited file containing `3`
//! without a trailing newline is just as valid.

use crate::tier::{Tier, TierError};

use std::{
    fs::{read_to_string, remove_file, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Read and write the tier preference dotfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Construct new preference store backed by target file path.
    ///
    /// The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to preference dotfile.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Read persisted tier.
    ///
    /// Returns `None` if no preference has been persisted yet.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Read`] if preference file cannot be read.
    /// - Return [`StoreError::Parse`] if preference file does not hold a
    ///   valid tier.
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub fn read(&self) -> Result<Option<Tier>> {
        let content = match read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no tier preference persisted");
                return Ok(None);
            }
            Err(err) => {
                return Err(StoreError::Read {
                    source: err,
                    path: self.path.clone(),
                })
            }
        };

        content
            .parse::<Tier>()
            .map(Some)
            .map_err(|err| StoreError::Parse {
                source: err,
                path: self.path.clone(),
            })
    }

    /// Persist tier, overwriting any previous preference.
    ///
    /// Creates missing parent directories of preference file.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Write`] if preference file cannot be written.
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub fn write(&self, tier: Tier) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(|err| StoreError::Write {
                source: err,
                path: self.path.clone(),
            })?;
        }

        write(&self.path, format!("{}\n", tier.level())).map_err(|err| StoreError::Write {
            source: err,
            path: self.path.clone(),
        })?;
        info!("persisted tier {tier} to {}", self.path.display());

        Ok(())
    }

    /// Remove persisted tier.
    ///
    /// Removing a preference that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Remove`] if preference file cannot be removed.
    pub fn clear(&self) -> Result<()> {
        match remove_file(&self.path) {
            Ok(()) => {
                info!("removed tier preference at {}", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Remove {
                source: err,
                path: self.path.clone(),
            }),
        }
    }
}

/// All possible error types for preference store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Preference file cannot be read.
    #[error("failed to read tier preference at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Preference file does not hold a valid tier.
    #[error("invalid tier preference at {:?}", path.display())]
    Parse {
        #[source]
        source: TierError,
        path: PathBuf,
    },

    /// Preference file cannot be written.
    #[error("failed to write tier preference at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Preference file cannot be removed.
    #[error("failed to remove tier preference at {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;
