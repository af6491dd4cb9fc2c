// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Complexity tiers.
//!
//! A __tier__ is a named, ordinal bundle of progressively more numerous
//! plugins, keybindings, and features. Tiers are cumulative: tier N always
//! carries everything that tiers below N carry, plus its own additions.
//!
//! Only three tiers exist. Anything outside that range is rejected at the
//! conversion boundary, so a [`Tier`] value is always valid once constructed.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Complexity tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// Bare essentials with the fastest startup.
    #[default]
    Essential = 1,

    /// Language tooling and editing comforts.
    Enhanced = 2,

    /// Everything, including heavyweight workflow tooling.
    Complete = 3,
}

impl Tier {
    /// Every tier in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Essential, Tier::Enhanced, Tier::Complete];

    /// Lowest tier, also the safe fallback.
    pub const MIN: Tier = Tier::Essential;

    /// Highest tier.
    pub const MAX: Tier = Tier::Complete;

    /// Numeric level of tier.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Canonical lowercase name of tier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Enhanced => "enhanced",
            Self::Complete => "complete",
        }
    }

    /// Next tier up, or `None` if already at the top.
    pub fn up(self) -> Option<Tier> {
        Self::try_from(self.level() + 1).ok()
    }

    /// Next tier down, or `None` if already at the bottom.
    pub fn down(self) -> Option<Tier> {
        self.level()
            .checked_sub(1)
            .and_then(|level| Self::try_from(level).ok())
    }

    /// Iterate tiers from the lowest tier up to and including this one.
    pub fn range_to(self) -> impl Iterator<Item = Tier> {
        Self::ALL.into_iter().take_while(move |tier| *tier <= self)
    }
}

impl TryFrom<u8> for Tier {
    type Error = TierError;

    fn try_from(level: u8) -> Result<Self> {
        Self::try_from(i64::from(level))
    }
}

impl TryFrom<i64> for Tier {
    type Error = TierError;

    fn try_from(level: i64) -> Result<Self> {
        match level {
            1 => Ok(Self::Essential),
            2 => Ok(Self::Enhanced),
            3 => Ok(Self::Complete),
            _ => Err(TierError::OutOfRange(level)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.level()
    }
}

impl FromStr for Tier {
    type Err = TierError;

    fn from_str(data: &str) -> Result<Self> {
        let data = data.trim();
        if let Ok(level) = data.parse::<i64>() {
            return Self::try_from(level);
        }

        Self::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(data))
            .ok_or_else(|| TierError::Unrecognized(data.into()))
    }
}

impl Display for Tier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} ({})", self.level(), self.name())
    }
}

/// Tier conversion error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TierError {
    /// Numeric tier outside of the valid range.
    #[error("tier {0} is out of range, expected 1, 2, or 3")]
    OutOfRange(i64),

    /// Text that is neither a tier number nor a tier name.
    #[error("unrecognized tier {0:?}, expected 1, 2, 3, or a tier name")]
    Unrecognized(String),
}

/// Friendly result alias :3
type Result<T, E = TierError> = std::result::Result<T, E>;
