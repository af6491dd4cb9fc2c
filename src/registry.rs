// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tier registry.
//!
//! The __tier registry__ maps each configuration surface and tier to the
//! plugins, keybindings, and features that the tier _introduces_ on that
//! surface. Entries only describe additions. Composing the cumulative set for
//! a tier is the job of the [`loader`](crate::loader).
//!
//! # Canonical Definition
//!
//! There is exactly one canonical definition of each tier, the built-in
//! registry returned by [`TierRegistry::builtin`]. Plugin and keybinding
//! counts are never written down anywhere. They are always derived from the
//! registry, so documentation and configuration cannot drift apart.
//!
//! Users may replace individual entries through the `[[tier]]` tables of the
//! configuration file. See [`TierRegistry::apply_config`].

use crate::{config::Config, tier::Tier};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::debug;

/// Configuration surface that consumes tiers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Neovim editor configuration.
    #[default]
    #[serde(alias = "nvim")]
    Neovim,

    /// Tmux terminal multiplexer configuration.
    Tmux,
}

impl Surface {
    /// Every known surface.
    pub const ALL: [Surface; 2] = [Surface::Neovim, Surface::Tmux];

    /// Canonical lowercase name of surface.
    pub fn name(self) -> &'static str {
        match self {
            Self::Neovim => "neovim",
            Self::Tmux => "tmux",
        }
    }
}

impl FromStr for Surface {
    type Err = UnknownSurface;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data.trim().to_ascii_lowercase().as_str() {
            "neovim" | "nvim" => Ok(Self::Neovim),
            "tmux" => Ok(Self::Tmux),
            other => Err(UnknownSurface(other.into())),
        }
    }
}

impl Display for Surface {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.name())
    }
}

/// Surface name that is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown surface {0:?}, expected neovim or tmux")]
pub struct UnknownSurface(pub String);

/// Keybinding declared by a tier.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Keybinding {
    /// Key sequence, e.g., `<leader>ff` or `prefix |`.
    pub keys: String,

    /// What the key sequence does.
    pub action: String,
}

impl Keybinding {
    /// Construct new keybinding.
    pub fn new(keys: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            keys: keys.into(),
            action: action.into(),
        }
    }
}

impl Display for Keybinding {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{:<14} {}", self.keys, self.action)
    }
}

/// Everything one tier adds to one surface.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierSpec {
    /// Display name of tier.
    pub name: String,

    /// One sentence description of tier.
    #[serde(default)]
    pub summary: String,

    /// Target startup time in milliseconds with this tier fully loaded.
    pub startup_budget: u64,

    /// Plugins introduced by this tier.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Keybindings introduced by this tier.
    #[serde(default)]
    pub keybindings: Vec<Keybinding>,

    /// Features introduced by this tier.
    #[serde(default)]
    pub features: Vec<String>,
}

/// Mapping of surface and tier to tier additions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TierRegistry {
    specs: BTreeMap<(Surface, Tier), TierSpec>,
}

impl TierRegistry {
    /// Construct empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct canonical built-in registry for every surface.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (surface, tier, spec) in neovim_specs().into_iter().chain(tmux_specs()) {
            registry.override_spec(surface, tier, spec);
        }

        registry
    }

    /// Construct built-in registry with overrides from configuration applied.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::builtin();
        registry.apply_config(config);
        registry
    }

    /// Look up what a tier adds to a surface.
    pub fn spec(&self, surface: Surface, tier: Tier) -> Option<&TierSpec> {
        self.specs.get(&(surface, tier))
    }

    /// Insert or replace what a tier adds to a surface.
    ///
    /// Returns the previous entry if one was replaced.
    pub fn override_spec(&mut self, surface: Surface, tier: Tier, spec: TierSpec) -> Option<TierSpec> {
        self.specs.insert((surface, tier), spec)
    }

    /// Remove what a tier adds to a surface.
    pub fn remove_spec(&mut self, surface: Surface, tier: Tier) -> Option<TierSpec> {
        self.specs.remove(&(surface, tier))
    }

    /// Fold every `[[tier]]` override of configuration into registry.
    pub fn apply_config(&mut self, config: &Config) {
        for entry in &config.tiers {
            debug!("override tier {} of {}", entry.level, entry.surface);
            self.override_spec(entry.surface, entry.level, entry.to_spec());
        }
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

fn bindings<const N: usize>(items: [(&str, &str); N]) -> Vec<Keybinding> {
    items
        .into_iter()
        .map(|(keys, action)| Keybinding::new(keys, action))
        .collect()
}

fn neovim_specs() -> Vec<(Surface, Tier, TierSpec)> {
    vec![
        (
            Surface::Neovim,
            Tier::Essential,
            TierSpec {
                name: "essential".into(),
                summary: "Fast editing with fuzzy finding, syntax, and a file tree.".into(),
                startup_budget: 50,
                plugins: strings(["tokyonight.nvim", "telescope.nvim", "nvim-treesitter", "oil.nvim"]),
                keybindings: bindings([
                    ("<leader>ff", "find files"),
                    ("<leader>fg", "live grep"),
                    ("<leader>fb", "list buffers"),
                    ("<leader>e", "open file explorer"),
                    ("<leader>w", "write buffer"),
                    ("<leader>q", "quit window"),
                ]),
                features: strings([
                    "colorscheme",
                    "fuzzy finding",
                    "syntax highlighting",
                    "file explorer",
                ]),
            },
        ),
        (
            Surface::Neovim,
            Tier::Enhanced,
            TierSpec {
                name: "enhanced".into(),
                summary: "Language servers, completion, and git awareness.".into(),
                startup_budget: 100,
                plugins: strings([
                    "nvim-lspconfig",
                    "mason.nvim",
                    "nvim-cmp",
                    "gitsigns.nvim",
                    "nvim-autopairs",
                    "which-key.nvim",
                ]),
                keybindings: bindings([
                    ("gd", "go to definition"),
                    ("gr", "list references"),
                    ("K", "hover documentation"),
                    ("<leader>ca", "code action"),
                    ("<leader>rn", "rename symbol"),
                    ("]h", "next git hunk"),
                    ("[h", "previous git hunk"),
                ]),
                features: strings([
                    "language servers",
                    "completion",
                    "git signs",
                    "auto pairs",
                    "keybinding hints",
                ]),
            },
        ),
        (
            Surface::Neovim,
            Tier::Complete,
            TierSpec {
                name: "complete".into(),
                summary: "Debugging, diagnostics panels, and project workflow tooling.".into(),
                startup_budget: 200,
                plugins: strings([
                    "nvim-dap",
                    "nvim-dap-ui",
                    "trouble.nvim",
                    "harpoon",
                    "undotree",
                    "conform.nvim",
                    "neotest",
                ]),
                keybindings: bindings([
                    ("<leader>db", "toggle breakpoint"),
                    ("<leader>dc", "continue debugging"),
                    ("<leader>xx", "toggle diagnostics"),
                    ("<leader>a", "harpoon file"),
                    ("<C-e>", "harpoon menu"),
                    ("<leader>u", "toggle undotree"),
                    ("<leader>tn", "run nearest test"),
                ]),
                features: strings([
                    "debugging",
                    "diagnostics panel",
                    "file marks",
                    "undo history",
                    "format on save",
                    "test runner",
                ]),
            },
        ),
    ]
}

fn tmux_specs() -> Vec<(Surface, Tier, TierSpec)> {
    vec![
        (
            Surface::Tmux,
            Tier::Essential,
            TierSpec {
                name: "essential".into(),
                summary: "Sane prefix, mouse support, and vi copy mode.".into(),
                startup_budget: 30,
                plugins: Vec::new(),
                keybindings: bindings([
                    ("prefix |", "split vertically"),
                    ("prefix -", "split horizontally"),
                    ("prefix r", "reload configuration"),
                    ("prefix c", "new window in current path"),
                ]),
                features: strings(["ctrl-a prefix", "mouse support", "vi copy mode", "base index 1"]),
            },
        ),
        (
            Surface::Tmux,
            Tier::Enhanced,
            TierSpec {
                name: "enhanced".into(),
                summary: "Plugin manager, seamless pane navigation, and a status line.".into(),
                startup_budget: 80,
                plugins: strings(["tpm", "tmux-sensible", "vim-tmux-navigator"]),
                keybindings: bindings([
                    ("C-h", "select left pane"),
                    ("C-j", "select lower pane"),
                    ("C-k", "select upper pane"),
                    ("C-l", "select right pane"),
                    ("prefix H", "resize pane left"),
                    ("prefix L", "resize pane right"),
                ]),
                features: strings(["plugin manager", "editor-aware pane navigation", "status line"]),
            },
        ),
        (
            Surface::Tmux,
            Tier::Complete,
            TierSpec {
                name: "complete".into(),
                summary: "Session persistence, clipboard integration, and a sessionizer.".into(),
                startup_budget: 150,
                plugins: strings(["tmux-resurrect", "tmux-continuum", "tmux-yank"]),
                keybindings: bindings([
                    ("prefix C-s", "save session"),
                    ("prefix C-r", "restore session"),
                    ("prefix f", "open sessionizer"),
                    ("prefix y", "copy to system clipboard"),
                ]),
                features: strings([
                    "session persistence",
                    "automatic session saving",
                    "system clipboard",
                    "sessionizer",
                ]),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierOverride;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn builtin_covers_every_surface_and_tier() {
        let registry = TierRegistry::builtin();
        for surface in Surface::ALL {
            for tier in Tier::ALL {
                let spec = registry.spec(surface, tier);
                assert!(spec.is_some(), "missing {surface} tier {tier}");
                assert_eq!(spec.map(|spec| spec.name.as_str()), Some(tier.name()));
            }
        }
    }

    #[test]
    fn builtin_budgets_grow_with_tier() {
        let registry = TierRegistry::builtin();
        for surface in Surface::ALL {
            let budgets = Tier::ALL
                .into_iter()
                .filter_map(|tier| registry.spec(surface, tier))
                .map(|spec| spec.startup_budget)
                .collect::<Vec<_>>();
            assert!(budgets.windows(2).all(|pair| pair[0] < pair[1]), "{surface}: {budgets:?}");
        }
    }

    #[test]
    fn apply_config_replaces_single_entry() {
        let mut config = Config::default();
        config.tiers.push(TierOverride {
            surface: Surface::Tmux,
            level: Tier::Complete,
            name: "everything".into(),
            summary: String::new(),
            startup_budget: 500,
            plugins: vec!["tmux-fingers".into()],
            keybindings: Vec::new(),
            features: vec!["hints".into()],
        });

        let registry = TierRegistry::from_config(&config);
        let spec = registry.spec(Surface::Tmux, Tier::Complete);
        assert_eq!(spec.map(|spec| spec.name.as_str()), Some("everything"));
        assert_eq!(spec.map(|spec| spec.plugins.clone()), Some(vec![String::from("tmux-fingers")]));

        // Untouched entries stay canonical.
        assert_eq!(
            registry.spec(Surface::Neovim, Tier::Complete),
            TierRegistry::builtin().spec(Surface::Neovim, Tier::Complete)
        );
    }

    #[test_case("neovim", Surface::Neovim; "canonical neovim")]
    #[test_case("nvim", Surface::Neovim; "short neovim")]
    #[test_case(" TMUX ", Surface::Tmux; "tmux ignores case")]
    #[test]
    fn parse_surface(input: &str, expect: Surface) {
        pretty_assertions::assert_eq!(input.parse::<Surface>(), Ok(expect));
    }

    #[test]
    fn parse_unknown_surface() {
        assert_eq!("zsh".parse::<Surface>(), Err(UnknownSurface("zsh".into())));
    }
}
