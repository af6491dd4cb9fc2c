// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tier resolution.
//!
//! Work out which tier to load right now. Several sources can name a tier,
//! and they are consulted in a fixed priority order:
//!
//! 1. An explicit value, e.g., the `--tier` flag.
//! 2. Agent mode through `DEVTIER_AGENT_MODE`, which always means tier 1.
//! 3. The `DEVTIER_TIER` environment variable.
//! 4. The persisted preference file.
//! 5. Heuristic detection from CPU core count and memory.
//!
//! The first source that is _present_ decides. A present source holding
//! garbage does not fall through to the next source. Instead the lowest tier
//! is chosen and a warning is logged. Only a missing preference file lets
//! resolution continue on to heuristic detection.
//!
//! Resolution never fails. The worst case is always tier 1.

pub mod heuristic;

use crate::{
    config::HeuristicThresholds,
    resolve::heuristic::{Heuristic, SysinfoProbe, SystemProbe},
    store::{PreferenceStore, StoreError},
    tier::Tier,
};

use std::{
    env,
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};
use tracing::{debug, instrument, warn};

/// Environment variable holding explicit tier override.
pub const TIER_VAR: &str = "DEVTIER_TIER";

/// Environment variable toggling agent/minimal mode.
pub const AGENT_MODE_VAR: &str = "DEVTIER_AGENT_MODE";

/// Environment variable toggling performance profiling output.
pub const PROFILE_VAR: &str = "DEVTIER_PROFILE";

/// Environment variable overriding preference file path.
pub const STATE_FILE_VAR: &str = "DEVTIER_STATE_FILE";

/// Environment variable overriding configuration file path.
pub const CONFIG_VAR: &str = "DEVTIER_CONFIG";

/// Environment variables devtier consults.
///
/// Empty variables are treated as unset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Raw value of `DEVTIER_TIER`.
    ///
    /// Values that are not valid Unicode are kept lossily converted, so they
    /// still count as present and fail tier parsing.
    pub tier: Option<String>,

    /// Whether `DEVTIER_AGENT_MODE` is switched on.
    pub agent_mode: bool,

    /// Whether `DEVTIER_PROFILE` is switched on.
    pub profile: bool,

    /// Value of `DEVTIER_STATE_FILE`.
    pub state_file: Option<PathBuf>,

    /// Value of `DEVTIER_CONFIG`.
    pub config_file: Option<PathBuf>,
}

impl EnvOverrides {
    /// Read overrides from current process environment.
    pub fn from_env() -> Self {
        Self {
            tier: non_empty_var(TIER_VAR).map(|value| value.to_string_lossy().into_owned()),
            agent_mode: non_empty_var(AGENT_MODE_VAR)
                .is_some_and(|value| is_truthy(&value.to_string_lossy())),
            profile: non_empty_var(PROFILE_VAR)
                .is_some_and(|value| is_truthy(&value.to_string_lossy())),
            state_file: non_empty_var(STATE_FILE_VAR).map(PathBuf::from),
            config_file: non_empty_var(CONFIG_VAR).map(PathBuf::from),
        }
    }
}

fn non_empty_var(name: &str) -> Option<OsString> {
    env::var_os(name).filter(|value| !value.to_string_lossy().trim().is_empty())
}

/// Check if toggle value means "on".
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Where a resolved tier came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierSource {
    /// Explicit value given by caller.
    Explicit,

    /// Agent/minimal mode forced lowest tier.
    AgentMode,

    /// Environment variable override.
    Environment,

    /// Persisted preference file.
    PreferenceFile(PathBuf),

    /// Heuristic detection.
    Heuristic,
}

impl Display for TierSource {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Explicit => fmt.write_str("explicit --tier flag"),
            Self::AgentMode => write!(fmt, "agent mode ({AGENT_MODE_VAR})"),
            Self::Environment => write!(fmt, "environment ({TIER_VAR})"),
            Self::PreferenceFile(path) => write!(fmt, "preference file {}", path.display()),
            Self::Heuristic => fmt.write_str("heuristic detection"),
        }
    }
}

/// Outcome of tier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Tier to load.
    pub tier: Tier,

    /// Source that decided tier.
    pub source: TierSource,

    /// Whether source was unusable, and lowest tier was chosen instead.
    pub fell_back: bool,
}

impl Resolution {
    fn decided(tier: Tier, source: TierSource) -> Self {
        Self {
            tier,
            source,
            fell_back: false,
        }
    }

    fn fallback(source: TierSource) -> Self {
        Self {
            tier: Tier::MIN,
            source,
            fell_back: true,
        }
    }
}

/// Direction to move between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Toward the highest tier.
    Up,

    /// Toward the lowest tier.
    Down,
}

/// Outcome of moving between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierStep {
    /// Tier moved away from.
    pub from: Tier,

    /// Tier moved to, or `None` if already at the bound.
    pub to: Option<Tier>,
}

/// Resolve current tier from every available source.
#[derive(Debug, Clone)]
pub struct TierResolver<P = SysinfoProbe>
where
    P: SystemProbe,
{
    explicit: Option<String>,
    env: EnvOverrides,
    store: PreferenceStore,
    heuristic: Heuristic<P>,
}

impl TierResolver<SysinfoProbe> {
    /// Construct new resolver that measures the real host.
    ///
    /// Environment overrides are read from the current process.
    pub fn new(store: PreferenceStore, thresholds: HeuristicThresholds) -> Self {
        Self::with_heuristic(store, Heuristic::new(SysinfoProbe, thresholds))
    }
}

impl<P> TierResolver<P>
where
    P: SystemProbe,
{
    /// Construct new resolver with custom heuristic.
    pub fn with_heuristic(store: PreferenceStore, heuristic: Heuristic<P>) -> Self {
        Self {
            explicit: None,
            env: EnvOverrides::from_env(),
            store,
            heuristic,
        }
    }

    /// Set explicit value that beats every other source.
    pub fn explicit(mut self, value: Option<impl Into<String>>) -> Self {
        self.explicit = value.map(Into::into);
        self
    }

    /// Replace environment overrides.
    pub fn env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    /// Resolve current tier.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self) -> Resolution {
        if let Some(value) = &self.explicit {
            return parse_or_fallback(value, TierSource::Explicit);
        }

        if self.env.agent_mode {
            debug!("agent mode forces tier {}", Tier::MIN);
            return Resolution::decided(Tier::MIN, TierSource::AgentMode);
        }

        if let Some(value) = &self.env.tier {
            return parse_or_fallback(value, TierSource::Environment);
        }

        self.resolve_persisted()
    }

    /// Resolve tier from preference file and heuristic only.
    ///
    /// Explicit values and environment overrides are ignored.
    pub fn resolve_persisted(&self) -> Resolution {
        let file_source = TierSource::PreferenceFile(self.store.path().to_path_buf());
        match self.store.read() {
            Ok(Some(tier)) => return Resolution::decided(tier, file_source),
            Ok(None) => debug!("no preference persisted, detect tier from host"),
            Err(error) => {
                warn!("{error}: {}, falling back to tier {}", error_source(&error), Tier::MIN);
                return Resolution::fallback(file_source);
            }
        }

        match self.heuristic.detect() {
            Some(tier) => Resolution::decided(tier, TierSource::Heuristic),
            None => {
                warn!("cannot measure host, falling back to tier {}", Tier::MIN);
                Resolution::fallback(TierSource::Heuristic)
            }
        }
    }

    /// Move one tier from the persisted tier, and persist the result.
    ///
    /// Stepping starts from [`resolve_persisted`](Self::resolve_persisted),
    /// so overrides never leak into the preference file. Nothing is written
    /// when already at the bound.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError`] if new tier cannot be persisted.
    #[instrument(skip(self), level = "debug")]
    pub fn step(&self, step: Step) -> Result<TierStep, StoreError> {
        let from = self.resolve_persisted().tier;
        let to = match step {
            Step::Up => from.up(),
            Step::Down => from.down(),
        };

        if let Some(tier) = to {
            self.store.write(tier)?;
        }

        Ok(TierStep { from, to })
    }

    /// Source that would shadow the preference file, if any.
    ///
    /// Used to warn users that persisting a tier will not take effect while
    /// an override is active.
    pub fn shadowing_source(&self) -> Option<TierSource> {
        if self.env.agent_mode {
            Some(TierSource::AgentMode)
        } else if self.env.tier.is_some() {
            Some(TierSource::Environment)
        } else {
            None
        }
    }
}

fn parse_or_fallback(value: &str, source: TierSource) -> Resolution {
    match value.parse::<Tier>() {
        Ok(tier) => Resolution::decided(tier, source),
        Err(error) => {
            warn!("{error} from {source}, falling back to tier {}", Tier::MIN);
            Resolution::fallback(source)
        }
    }
}

fn error_source(error: &dyn std::error::Error) -> String {
    error
        .source()
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::heuristic::tests::FixedProbe;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    fn resolver(probe: FixedProbe) -> TierResolver<FixedProbe> {
        TierResolver::with_heuristic(
            PreferenceStore::new(".devtier"),
            Heuristic::new(probe, HeuristicThresholds::default()),
        )
        .env(EnvOverrides::default())
    }

    fn big_host() -> FixedProbe {
        FixedProbe::new(Some(16), Some(64))
    }

    #[test_case("0"; "zero")]
    #[test_case("4"; "above range")]
    #[test_case("-3"; "negative")]
    #[test_case("lots"; "garbage")]
    #[test]
    fn invalid_explicit_tier_falls_back(value: &str) {
        let result = resolver(big_host()).explicit(Some(value)).resolve();
        pretty_assertions::assert_eq!(result, Resolution::fallback(TierSource::Explicit));
    }

    #[test_case("0"; "zero")]
    #[test_case("9"; "above range")]
    #[test_case("max"; "garbage")]
    #[test]
    fn invalid_env_tier_falls_back(value: &str) {
        let env = EnvOverrides {
            tier: Some(value.into()),
            ..Default::default()
        };
        let result = resolver(big_host()).env(env).resolve();
        pretty_assertions::assert_eq!(result, Resolution::fallback(TierSource::Environment));
    }

    #[test]
    fn explicit_beats_agent_mode_and_env() {
        let env = EnvOverrides {
            tier: Some("2".into()),
            agent_mode: true,
            ..Default::default()
        };
        let result = resolver(big_host()).env(env).explicit(Some("3")).resolve();
        assert_eq!(result, Resolution::decided(Tier::Complete, TierSource::Explicit));
    }

    #[test]
    fn agent_mode_beats_env() {
        let env = EnvOverrides {
            tier: Some("3".into()),
            agent_mode: true,
            ..Default::default()
        };
        let result = resolver(big_host()).env(env).resolve();
        assert_eq!(result, Resolution::decided(Tier::Essential, TierSource::AgentMode));
    }

    #[sealed_test]
    fn env_beats_preference_file() -> anyhow::Result<()> {
        for persisted in Tier::ALL {
            for wanted in Tier::ALL {
                PreferenceStore::new(".devtier").write(persisted)?;
                let env = EnvOverrides {
                    tier: Some(wanted.level().to_string()),
                    ..Default::default()
                };
                let result = resolver(big_host()).env(env).resolve();
                assert_eq!(result, Resolution::decided(wanted, TierSource::Environment));
            }
        }
        Ok(())
    }

    #[sealed_test]
    fn preference_file_beats_heuristic() -> anyhow::Result<()> {
        PreferenceStore::new(".devtier").write(Tier::Enhanced)?;
        let result = resolver(big_host()).resolve();
        assert_eq!(
            result,
            Resolution::decided(Tier::Enhanced, TierSource::PreferenceFile(".devtier".into()))
        );
        Ok(())
    }

    #[sealed_test]
    fn corrupt_preference_file_falls_back() -> anyhow::Result<()> {
        std::fs::write(".devtier", "11\n")?;
        let result = resolver(big_host()).resolve();
        assert_eq!(
            result,
            Resolution::fallback(TierSource::PreferenceFile(".devtier".into()))
        );
        Ok(())
    }

    #[sealed_test]
    fn missing_preference_file_uses_heuristic() {
        let result = resolver(big_host()).resolve();
        assert_eq!(result, Resolution::decided(Tier::Complete, TierSource::Heuristic));
    }

    #[sealed_test]
    fn failed_heuristic_falls_back() {
        for probe in [
            FixedProbe::new(None, Some(64)),
            FixedProbe::new(Some(16), None),
            FixedProbe::new(None, None),
        ] {
            let result = resolver(probe).resolve();
            assert_eq!(result, Resolution::fallback(TierSource::Heuristic));
        }
    }

    #[sealed_test(env = [
        ("DEVTIER_TIER", "2"),
        ("DEVTIER_AGENT_MODE", "Yes"),
        ("DEVTIER_PROFILE", "0"),
        ("DEVTIER_STATE_FILE", "/tmp/tier"),
        ("DEVTIER_CONFIG", ""),
    ])]
    fn read_env_overrides() {
        let expect = EnvOverrides {
            tier: Some("2".into()),
            agent_mode: true,
            profile: false,
            state_file: Some(PathBuf::from("/tmp/tier")),
            config_file: None,
        };
        assert_eq!(EnvOverrides::from_env(), expect);
    }

    #[test]
    fn shadowing_sources() {
        let base = resolver(big_host());
        assert_eq!(base.shadowing_source(), None);

        let env = EnvOverrides {
            tier: Some("1".into()),
            ..Default::default()
        };
        assert_eq!(
            resolver(big_host()).env(env).shadowing_source(),
            Some(TierSource::Environment)
        );

        let env = EnvOverrides {
            agent_mode: true,
            ..Default::default()
        };
        assert_eq!(
            resolver(big_host()).env(env).shadowing_source(),
            Some(TierSource::AgentMode)
        );
    }

    #[cfg(unix)]
    #[sealed_test]
    fn non_unicode_env_tier_falls_back() -> anyhow::Result<()> {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        PreferenceStore::new(".devtier").write(Tier::Complete)?;
        env::set_var(TIER_VAR, OsStr::from_bytes(b"\xff2"));

        let env = EnvOverrides::from_env();
        assert!(env.tier.is_some());
        let result = resolver(big_host()).env(env).resolve();
        assert_eq!(result, Resolution::fallback(TierSource::Environment));
        Ok(())
    }

    #[sealed_test]
    fn step_up_persists_next_tier() -> anyhow::Result<()> {
        PreferenceStore::new(".devtier").write(Tier::Essential)?;
        let result = resolver(big_host()).step(Step::Up)?;
        assert_eq!(
            result,
            TierStep {
                from: Tier::Essential,
                to: Some(Tier::Enhanced)
            }
        );
        assert_eq!(PreferenceStore::new(".devtier").read()?, Some(Tier::Enhanced));
        Ok(())
    }

    #[sealed_test]
    fn step_past_bounds_changes_nothing() -> anyhow::Result<()> {
        let store = PreferenceStore::new(".devtier");

        store.write(Tier::Complete)?;
        let result = resolver(big_host()).step(Step::Up)?;
        assert_eq!(result, TierStep { from: Tier::Complete, to: None });
        assert_eq!(store.read()?, Some(Tier::Complete));

        store.write(Tier::Essential)?;
        let result = resolver(big_host()).step(Step::Down)?;
        assert_eq!(result, TierStep { from: Tier::Essential, to: None });
        assert_eq!(store.read()?, Some(Tier::Essential));
        Ok(())
    }

    #[sealed_test]
    fn step_ignores_env_overrides() -> anyhow::Result<()> {
        PreferenceStore::new(".devtier").write(Tier::Enhanced)?;
        let env = EnvOverrides {
            tier: Some("1".into()),
            ..Default::default()
        };
        let resolver = resolver(big_host()).env(env).explicit(Some("1"));

        let result = resolver.step(Step::Up)?;
        assert_eq!(
            result,
            TierStep {
                from: Tier::Enhanced,
                to: Some(Tier::Complete)
            }
        );
        assert_eq!(resolver.shadowing_source(), Some(TierSource::Environment));
        Ok(())
    }

    #[sealed_test]
    fn step_from_corrupt_preference_starts_at_lowest_tier() -> anyhow::Result<()> {
        std::fs::write(".devtier", "banana\n")?;
        let result = resolver(big_host()).step(Step::Up)?;
        assert_eq!(
            result,
            TierStep {
                from: Tier::Essential,
                to: Some(Tier::Enhanced)
            }
        );
        assert_eq!(PreferenceStore::new(".devtier").read()?, Some(Tier::Enhanced));
        Ok(())
    }

    #[sealed_test]
    fn step_without_preference_starts_from_heuristic() -> anyhow::Result<()> {
        let result = resolver(FixedProbe::new(Some(4), Some(8))).step(Step::Down)?;
        assert_eq!(
            result,
            TierStep {
                from: Tier::Enhanced,
                to: Some(Tier::Essential)
            }
        );
        Ok(())
    }
}
