// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Human readable reports for `status` and `tier-help`.

use crate::{
    loader::{LoadError, LoadedTier, TierLoader},
    registry::Surface,
    resolve::Resolution,
    tier::Tier,
};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Current tier status of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// How current tier was resolved.
    pub resolution: Resolution,

    /// What is actually loaded.
    pub loaded: LoadedTier,

    /// What the next tier up would load.
    pub next: Option<LoadedTier>,
}

impl StatusReport {
    /// Compose status report for resolved tier.
    ///
    /// # Errors
    ///
    /// - Return [`LoadError`] if not even tier 1 can be loaded.
    pub fn new(resolution: Resolution, loader: &TierLoader<'_>) -> Result<Self, LoadError> {
        let loaded = loader.load_or_fallback(resolution.tier)?;
        let next = loaded.tier.up().and_then(|tier| loader.load(tier).ok());

        Ok(Self {
            resolution,
            loaded,
            next,
        })
    }
}

impl Display for StatusReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let loaded = &self.loaded;
        writeln!(fmt, "surface:     {}", loaded.surface)?;
        writeln!(fmt, "tier:        {}", loaded.tier)?;
        writeln!(fmt, "source:      {}", self.resolution.source)?;
        if self.resolution.fell_back {
            writeln!(fmt, "note:        source was unusable, fell back to tier {}", Tier::MIN)?;
        }
        if loaded.tier != self.resolution.tier {
            writeln!(
                fmt,
                "note:        tier {} failed to load, fell back to tier {}",
                self.resolution.tier, loaded.tier
            )?;
        }
        writeln!(fmt, "summary:     {}", loaded.summary)?;
        writeln!(fmt, "budget:      {} ms", loaded.startup_budget)?;
        writeln!(fmt, "plugins:     {}", loaded.plugin_count())?;
        writeln!(fmt, "keybindings: {}", loaded.keybinding_count())?;
        writeln!(fmt, "features:    {}", loaded.features.join(", "))?;

        match &self.next {
            Some(next) => writeln!(
                fmt,
                "next tier:   {} adds {}",
                next.tier,
                next.features_beyond(loaded).join(", ")
            ),
            None => writeln!(fmt, "next tier:   none, already at highest tier"),
        }
    }
}

/// Overview of every tier of a surface, plus command usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierGuide {
    /// Surface being described.
    pub surface: Surface,

    /// Every tier that loads cleanly, in ascending order.
    pub tiers: Vec<LoadedTier>,
}

impl TierGuide {
    /// Compose guide for surface.
    ///
    /// Tiers that fail to load are left out.
    pub fn new(loader: &TierLoader<'_>, surface: Surface) -> Self {
        let tiers = Tier::ALL
            .into_iter()
            .filter_map(|tier| loader.load(tier).ok())
            .collect();

        Self { surface, tiers }
    }
}

const USAGE: &[(&str, &str)] = &[
    ("status", "show current tier and where it came from"),
    ("up", "move one tier up and remember it"),
    ("down", "move one tier down and remember it"),
    ("set [N]", "remember tier N, prompting if omitted"),
    ("reset", "forget remembered tier, detect from host again"),
    ("plan", "print composed tier for configurations to consume"),
    ("bench", "time startup against tier budget"),
    ("explain", "show this guide"),
];

impl Display for TierGuide {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{} tiers (cumulative, each includes all below it):", self.surface)?;
        writeln!(fmt)?;
        let mut previous: Option<&LoadedTier> = None;
        for tier in &self.tiers {
            writeln!(
                fmt,
                "  {:<14} {:>4} ms  {:>2} plugins  {:>2} keybindings",
                tier.tier.to_string(),
                tier.startup_budget,
                tier.plugin_count(),
                tier.keybinding_count()
            )?;
            writeln!(fmt, "      {}", tier.summary)?;
            let added = match previous {
                Some(lower) => tier.features_beyond(lower),
                None => tier.features.iter().map(String::as_str).collect(),
            };
            writeln!(fmt, "      adds: {}", added.join(", "))?;
            previous = Some(tier);
        }

        writeln!(fmt)?;
        writeln!(fmt, "commands:")?;
        for (command, description) in USAGE {
            writeln!(fmt, "  devtier {command:<10} {description}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::TierRegistry, resolve::TierSource};
    use pretty_assertions::assert_eq;

    #[test]
    fn status_previews_next_tier() -> anyhow::Result<()> {
        let registry = TierRegistry::builtin();
        let loader = TierLoader::new(&registry, Surface::Neovim);
        let resolution = Resolution {
            tier: Tier::Enhanced,
            source: TierSource::Environment,
            fell_back: false,
        };

        let report = StatusReport::new(resolution, &loader)?;
        assert_eq!(report.loaded.tier, Tier::Enhanced);
        assert_eq!(report.next.as_ref().map(|next| next.tier), Some(Tier::Complete));

        let text = report.to_string();
        assert!(text.contains("tier:        2 (enhanced)"));
        assert!(text.contains("source:      environment (DEVTIER_TIER)"));
        assert!(text.contains("next tier:   3 (complete) adds debugging"));
        assert!(!text.contains("note:"));

        Ok(())
    }

    #[test]
    fn status_at_top_has_no_next_tier() -> anyhow::Result<()> {
        let registry = TierRegistry::builtin();
        let loader = TierLoader::new(&registry, Surface::Tmux);
        let resolution = Resolution {
            tier: Tier::Complete,
            source: TierSource::Heuristic,
            fell_back: false,
        };

        let report = StatusReport::new(resolution, &loader)?;
        assert_eq!(report.next, None);
        assert!(report.to_string().contains("already at highest tier"));

        Ok(())
    }

    #[test]
    fn status_notes_fallback() -> anyhow::Result<()> {
        let registry = TierRegistry::builtin();
        let loader = TierLoader::new(&registry, Surface::Tmux);
        let resolution = Resolution {
            tier: Tier::Essential,
            source: TierSource::Explicit,
            fell_back: true,
        };

        let text = StatusReport::new(resolution, &loader)?.to_string();
        assert!(text.contains("note:        source was unusable, fell back to tier 1 (essential)"));

        Ok(())
    }

    #[test]
    fn guide_lists_every_tier() {
        let registry = TierRegistry::builtin();
        let loader = TierLoader::new(&registry, Surface::Neovim);
        let guide = TierGuide::new(&loader, Surface::Neovim);

        assert_eq!(guide.tiers.len(), 3);
        let text = guide.to_string();
        for tier in Tier::ALL {
            assert!(text.contains(&tier.to_string()));
        }
        assert!(text.contains("devtier bench"));
    }
}
