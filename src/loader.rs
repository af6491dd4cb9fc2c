// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Cumulative tier composition.
//!
//! Loading tier N means concatenating, in order, what tiers 1 through N each
//! introduce on a surface. The result is a [`LoadedTier`], the flat list of
//! plugins, keybindings, and features that a configuration should apply.
//!
//! Composition rejects registries that cannot be loaded cleanly: a tier entry
//! that is missing, a plugin introduced twice, or two tiers claiming the same
//! key sequence. Callers that must always end up with _something_ loaded use
//! [`TierLoader::load_or_fallback`], which settles on tier 1 instead.

use crate::{
    registry::{Keybinding, Surface, TierRegistry},
    tier::Tier,
};

use std::{
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument, warn};

/// Composed view of a tier on one surface.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadedTier {
    /// Tier that was loaded.
    pub tier: Tier,

    /// Surface tier was loaded for.
    pub surface: Surface,

    /// Display name of highest composed tier.
    pub name: String,

    /// One sentence description of highest composed tier.
    pub summary: String,

    /// Target startup time in milliseconds.
    pub startup_budget: u64,

    /// Every plugin from tier 1 up to this tier.
    pub plugins: Vec<String>,

    /// Every keybinding from tier 1 up to this tier.
    pub keybindings: Vec<Keybinding>,

    /// Every feature from tier 1 up to this tier.
    pub features: Vec<String>,
}

impl LoadedTier {
    /// Number of plugins loaded.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Number of keybindings loaded.
    pub fn keybinding_count(&self) -> usize {
        self.keybindings.len()
    }

    /// Render as one plugin per line.
    pub fn to_lines(&self) -> String {
        self.plugins.iter().map(|plugin| format!("{plugin}\n")).collect()
    }

    /// Render as shell variable assignments.
    ///
    /// Output can be `eval`'d by zsh, or parsed by tmux and Neovim
    /// configurations.
    pub fn to_shell(&self) -> String {
        let keys = self
            .keybindings
            .iter()
            .map(|binding| binding.keys.as_str())
            .collect::<Vec<_>>();

        format!(
            "DEVTIER_TIER={}\nDEVTIER_TIER_NAME={}\nDEVTIER_SURFACE={}\nDEVTIER_PLUGINS={}\nDEVTIER_FEATURES={}\nDEVTIER_KEYBINDINGS={}\n",
            self.tier.level(),
            shell_quote(&self.name),
            self.surface,
            shell_quote(&self.plugins.join(" ")),
            shell_quote(&self.features.join(",")),
            shell_quote(&keys.join(" ")),
        )
    }

    /// Features this tier carries that a lower tier lacks.
    pub fn features_beyond<'a>(&'a self, lower: &LoadedTier) -> Vec<&'a str> {
        self.features
            .iter()
            .filter(|feature| !lower.features.contains(feature))
            .map(String::as_str)
            .collect()
    }
}

impl Display for LoadedTier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} tier {} ({} plugins, {} keybindings, {} features)",
            self.surface,
            self.tier,
            self.plugin_count(),
            self.keybinding_count(),
            self.features.len()
        )
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Compose tiers from registry for one surface.
#[derive(Debug, Clone)]
pub struct TierLoader<'reg> {
    registry: &'reg TierRegistry,
    surface: Surface,
}

impl<'reg> TierLoader<'reg> {
    /// Construct new tier loader.
    pub fn new(registry: &'reg TierRegistry, surface: Surface) -> Self {
        Self { registry, surface }
    }

    /// Compose target tier cumulatively.
    ///
    /// # Errors
    ///
    /// - Return [`LoadError::MissingTier`] if registry lacks any tier up to
    ///   target tier.
    /// - Return [`LoadError::DuplicatePlugin`] if a plugin is introduced more
    ///   than once.
    /// - Return [`LoadError::KeybindingConflict`] if two entries bind the same
    ///   key sequence.
    #[instrument(skip(self), fields(surface = %self.surface), level = "debug")]
    pub fn load(&self, tier: Tier) -> Result<LoadedTier> {
        let mut loaded = LoadedTier {
            tier,
            surface: self.surface,
            ..Default::default()
        };
        let mut plugin_owners: HashMap<String, Tier> = HashMap::new();
        let mut key_owners: HashMap<String, Tier> = HashMap::new();

        for level in tier.range_to() {
            let spec = self.registry.spec(self.surface, level).ok_or(LoadError::MissingTier {
                surface: self.surface,
                tier: level,
            })?;
            debug!("compose {} additions of tier {level}", spec.plugins.len());

            for plugin in &spec.plugins {
                if plugin_owners.insert(plugin.clone(), level).is_some() {
                    return Err(LoadError::DuplicatePlugin {
                        plugin: plugin.clone(),
                        tier: level,
                    });
                }
                loaded.plugins.push(plugin.clone());
            }

            for binding in &spec.keybindings {
                if let Some(first) = key_owners.insert(binding.keys.clone(), level) {
                    return Err(LoadError::KeybindingConflict {
                        keys: binding.keys.clone(),
                        first,
                        second: level,
                    });
                }
                loaded.keybindings.push(binding.clone());
            }

            for feature in &spec.features {
                if !loaded.features.contains(feature) {
                    loaded.features.push(feature.clone());
                }
            }

            loaded.name = spec.name.clone();
            loaded.summary = spec.summary.clone();
            loaded.startup_budget = spec.startup_budget;
        }

        Ok(loaded)
    }

    /// Compose target tier, settling on tier 1 if target cannot be loaded.
    ///
    /// # Errors
    ///
    /// - Return [`LoadError`] only if tier 1 itself cannot be loaded.
    pub fn load_or_fallback(&self, tier: Tier) -> Result<LoadedTier> {
        match self.load(tier) {
            Ok(loaded) => Ok(loaded),
            Err(error) if tier != Tier::MIN => {
                warn!("{error}, loading tier {} instead", Tier::MIN);
                self.load(Tier::MIN)
            }
            Err(error) => Err(error),
        }
    }
}

/// All possible error types for tier composition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Registry has no entry for a tier.
    #[error("{surface} has no definition for tier {tier}")]
    MissingTier { surface: Surface, tier: Tier },

    /// Plugin introduced by more than one tier.
    #[error("plugin {plugin:?} introduced again by tier {tier}")]
    DuplicatePlugin { plugin: String, tier: Tier },

    /// Two tiers bind the same key sequence.
    #[error("keys {keys:?} bound by tier {first} and again by tier {second}")]
    KeybindingConflict { keys: String, first: Tier, second: Tier },
}

/// Friendly result alias :3
type Result<T, E = LoadError> = std::result::Result<T, E>;
