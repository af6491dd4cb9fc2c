// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional configuration file that devtier reads
//! to simplify the process of serialization and deserialization. The file
//! lives at `$XDG_CONFIG_HOME/devtier/config.toml` by default, and every
//! section of it is optional.
//!
//! # General Layout
//!
//! - `[settings]` where to keep the persisted tier preference.
//! - `[heuristic]` thresholds used to guess a tier from the host machine.
//! - `[bench]` startup commands to time for each surface.
//! - `[[tier]]` replacements for individual entries of the built-in tier
//!   registry.

use crate::{
    registry::{Keybinding, Surface, TierSpec},
    tier::Tier,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Configuration file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub settings: Settings,

    /// Thresholds for heuristic tier detection.
    #[serde(default)]
    pub heuristic: HeuristicThresholds,

    /// Startup commands used by benchmarking.
    #[serde(default)]
    pub bench: BenchCommands,

    /// Replacements for built-in tier registry entries.
    #[serde(default, rename = "tier", skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierOverride>,
}

impl Config {
    /// Read configuration file at target path.
    ///
    /// A missing file is not an error, default configuration is returned
    /// instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Invalid`] if file contents are malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = match read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::Read {
                    source: err,
                    path: path.to_path_buf(),
                })
            }
        };

        data.parse().map_err(|err| ConfigError::Invalid {
            source: Box::new(err),
            path: path.to_path_buf(),
        })
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on state file field.
        if let Some(state_file) = &config.settings.state_file {
            let expanded = shellexpand::full(state_file.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned();
            config.settings.state_file = Some(PathBuf::from(expanded));
        }

        config.heuristic.validate()?;

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Path to tier preference dotfile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

/// Machine size thresholds for heuristic tier detection.
///
/// A machine qualifies for a tier only when it meets _both_ the core count and
/// the memory threshold of that tier.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct HeuristicThresholds {
    /// Minimum logical CPU cores for complete tier.
    pub full_cores: usize,

    /// Minimum total memory in GiB for complete tier.
    pub full_memory_gib: u64,

    /// Minimum logical CPU cores for enhanced tier.
    pub standard_cores: usize,

    /// Minimum total memory in GiB for enhanced tier.
    pub standard_memory_gib: u64,
}

impl HeuristicThresholds {
    fn validate(&self) -> Result<()> {
        if self.standard_cores > self.full_cores || self.standard_memory_gib > self.full_memory_gib {
            return Err(ConfigError::Thresholds(*self));
        }

        Ok(())
    }
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            full_cores: 8,
            full_memory_gib: 16,
            standard_cores: 4,
            standard_memory_gib: 8,
        }
    }
}

/// Startup commands to benchmark, one per surface.
///
/// Each command is a program followed by its arguments.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BenchCommands {
    /// Command that starts and exits Neovim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neovim: Option<Vec<String>>,

    /// Command that starts and exits a tmux server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux: Option<Vec<String>>,
}

impl BenchCommands {
    /// Startup command for target surface, falling back to built-in default.
    pub fn command_for(&self, surface: Surface) -> Vec<String> {
        let configured = match surface {
            Surface::Neovim => self.neovim.as_ref(),
            Surface::Tmux => self.tmux.as_ref(),
        };

        match configured {
            Some(command) if !command.is_empty() => command.clone(),
            _ => default_bench_command(surface),
        }
    }
}

fn default_bench_command(surface: Surface) -> Vec<String> {
    let command: &[&str] = match surface {
        Surface::Neovim => &["nvim", "--headless", "+qa"],
        Surface::Tmux => &[
            "tmux",
            "-L",
            "devtier-bench",
            "-f",
            "/dev/null",
            "start-server",
            ";",
            "kill-server",
        ],
    };

    command.iter().map(ToString::to_string).collect()
}

/// Replacement for one entry of the built-in tier registry.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct TierOverride {
    /// Surface whose entry is replaced.
    pub surface: Surface,

    /// Tier whose entry is replaced.
    pub level: Tier,

    /// Display name of tier.
    pub name: String,

    /// One sentence description of tier.
    #[serde(default)]
    pub summary: String,

    /// Target startup time in milliseconds.
    pub startup_budget: u64,

    /// Plugins introduced by tier.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Keybindings introduced by tier.
    #[serde(default)]
    pub keybindings: Vec<Keybinding>,

    /// Features introduced by tier.
    #[serde(default)]
    pub features: Vec<String>,
}

impl TierOverride {
    /// Convert into registry entry.
    pub fn to_spec(&self) -> TierSpec {
        TierSpec {
            name: self.name.clone(),
            summary: self.summary.clone(),
            startup_budget: self.startup_budget,
            plugins: self.plugins.clone(),
            keybindings: self.keybindings.clone(),
            features: self.features.clone(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Heuristic thresholds of a lower tier exceed those of a higher tier.
    #[error("enhanced tier thresholds exceed complete tier thresholds: {0:?}")]
    Thresholds(HeuristicThresholds),

    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file contents are malformed.
    #[error("invalid configuration file at {:?}", path.display())]
    Invalid {
        #[source]
        source: Box<ConfigError>,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah")])]
    fn deserialize_config() -> anyhow::Result<()> {
        let result: Config = r#"
            [settings]
            state_file = "$BLAH/.devtier"

            [heuristic]
            full_cores = 12
            full_memory_gib = 32

            [bench]
            neovim = ["nvim", "--clean", "--headless", "+qa"]

            [[tier]]
            surface = "nvim"
            level = 2
            name = "enhanced"
            startup_budget = 120
            plugins = ["nvim-lspconfig"]
            keybindings = [{ keys = "gd", action = "go to definition" }]
            features = ["language servers"]
        "#
        .parse()?;

        let expect = Config {
            settings: Settings {
                state_file: Some(PathBuf::from("/home/blah/.devtier")),
            },
            heuristic: HeuristicThresholds {
                full_cores: 12,
                full_memory_gib: 32,
                standard_cores: 4,
                standard_memory_gib: 8,
            },
            bench: BenchCommands {
                neovim: Some(vec![
                    "nvim".into(),
                    "--clean".into(),
                    "--headless".into(),
                    "+qa".into(),
                ]),
                tmux: None,
            },
            tiers: vec![TierOverride {
                surface: Surface::Neovim,
                level: Tier::Enhanced,
                name: "enhanced".into(),
                summary: String::new(),
                startup_budget: 120,
                plugins: vec!["nvim-lspconfig".into()],
                keybindings: vec![Keybinding::new("gd", "go to definition")],
                features: vec!["language servers".into()],
            }],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_config() {
        let mut config = Config::default();
        config.settings.state_file = Some(PathBuf::from("/home/blah/.devtier"));
        config.bench.tmux = Some(vec!["tmux".into(), "-V".into()]);
        let result = config.to_string();

        let expect = indoc! {r#"
            [settings]
            state_file = "/home/blah/.devtier"

            [heuristic]
            full_cores = 8
            full_memory_gib = 16
            standard_cores = 4
            standard_memory_gib = 8

            [bench]
            tmux = [
                "tmux",
                "-V",
            ]
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn empty_config_uses_defaults() -> anyhow::Result<()> {
        let result: Config = "".parse()?;
        assert_eq!(result, Config::default());
        Ok(())
    }

    #[test]
    fn reject_out_of_range_tier_override() {
        let result = r#"
            [[tier]]
            surface = "tmux"
            level = 4
            name = "beyond"
            startup_budget = 10
        "#
        .parse::<Config>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn reject_inverted_thresholds() {
        let result = r#"
            [heuristic]
            standard_cores = 16
        "#
        .parse::<Config>();
        assert!(matches!(result, Err(ConfigError::Thresholds(_))));
    }

    #[test]
    fn default_bench_command_when_unset_or_empty() {
        let mut commands = BenchCommands::default();
        assert_eq!(commands.command_for(Surface::Neovim), vec!["nvim", "--headless", "+qa"]);

        commands.neovim = Some(Vec::new());
        assert_eq!(commands.command_for(Surface::Neovim), vec!["nvim", "--headless", "+qa"]);

        commands.tmux = Some(vec!["tmux".into(), "-V".into()]);
        assert_eq!(commands.command_for(Surface::Tmux), vec!["tmux", "-V"]);
    }

    #[sealed_test]
    fn load_missing_config_file() -> anyhow::Result<()> {
        let result = Config::load("nope.toml")?;
        assert_eq!(result, Config::default());
        Ok(())
    }

    #[sealed_test]
    fn load_malformed_config_file() -> anyhow::Result<()> {
        std::fs::write("config.toml", "[settings\n")?;
        let result = Config::load("config.toml");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        Ok(())
    }
}
