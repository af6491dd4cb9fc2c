// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tier-based progressive configuration loader.
//!
//! Editor and multiplexer configurations grow heavy over time. Devtier splits
//! them into three cumulative __tiers__, and decides at startup which tier a
//! surface (Neovim or tmux) should load:
//!
//! - [`tier`] the tier type itself.
//! - [`registry`] what each tier adds to each surface.
//! - [`resolve`] which tier applies right now, and why.
//! - [`loader`] cumulative composition of tiers 1 through N.
//! - [`store`] the persisted tier preference dotfile.
//! - [`bench`] startup timing against tier budgets.
//!
//! # See Also
//!
//! 1. [`TierResolver`] for the exact resolution priority order.

pub mod bench;
pub mod config;
pub mod loader;
pub mod path;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod store;
pub mod tier;

pub use crate::{
    config::Config,
    loader::{LoadedTier, TierLoader},
    registry::{Surface, TierRegistry},
    resolve::{EnvOverrides, Resolution, TierResolver, TierSource},
    store::PreferenceStore,
    tier::Tier,
};
