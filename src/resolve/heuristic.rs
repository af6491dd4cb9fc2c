// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Heuristic tier detection.
//!
//! Best-effort guess of a fitting tier from the host's logical CPU core count
//! and total memory. Used only when nothing else tells us which tier to load.
//!
//! Detection is fail-safe rather than fail-loud: whenever either measurement
//! is unavailable or nonsensical, the heuristic yields nothing and the caller
//! settles on the lowest tier.

use crate::{config::HeuristicThresholds, tier::Tier};

use sysinfo::System;
use tracing::{debug, instrument};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Measurements of the host machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Number of logical CPU cores.
    pub cpu_cores: Option<usize>,

    /// Total memory in bytes.
    pub memory_bytes: Option<u64>,
}

/// Layer of indirection for host measurements.
pub trait SystemProbe {
    /// Measure host machine.
    fn snapshot(&self) -> SystemSnapshot;
}

/// Host measurements through sysinfo.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl SystemProbe for SysinfoProbe {
    fn snapshot(&self) -> SystemSnapshot {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return SystemSnapshot::default();
        }

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        SystemSnapshot {
            cpu_cores: Some(sys.cpus().len()).filter(|cores| *cores > 0),
            memory_bytes: Some(sys.total_memory()).filter(|bytes| *bytes > 0),
        }
    }
}

/// Guess tier from host measurements.
#[derive(Debug, Clone)]
pub struct Heuristic<P = SysinfoProbe>
where
    P: SystemProbe,
{
    probe: P,
    thresholds: HeuristicThresholds,
}

impl<P> Heuristic<P>
where
    P: SystemProbe,
{
    /// Construct new heuristic.
    pub fn new(probe: P, thresholds: HeuristicThresholds) -> Self {
        Self { probe, thresholds }
    }

    /// Detect tier fitting the host.
    ///
    /// Returns `None` if the host cannot be measured.
    #[instrument(skip(self), level = "debug")]
    pub fn detect(&self) -> Option<Tier> {
        let snapshot = self.probe.snapshot();
        debug!("measured host: {snapshot:?}");
        let cores = snapshot.cpu_cores.filter(|cores| *cores > 0)?;
        let memory = snapshot.memory_bytes.filter(|bytes| *bytes > 0)?;

        Some(classify(&self.thresholds, cores, memory))
    }
}

/// Map core count and memory onto a tier.
///
/// A tier is only reached when both its core and memory thresholds are met.
/// Memory within half a GiB below a threshold still meets it, since hosts
/// report less than their installed RAM.
pub fn classify(thresholds: &HeuristicThresholds, cores: usize, memory_bytes: u64) -> Tier {
    if cores >= thresholds.full_cores && meets_memory(memory_bytes, thresholds.full_memory_gib) {
        Tier::Complete
    } else if cores >= thresholds.standard_cores
        && meets_memory(memory_bytes, thresholds.standard_memory_gib)
    {
        Tier::Enhanced
    } else {
        Tier::Essential
    }
}

fn meets_memory(memory_bytes: u64, threshold_gib: u64) -> bool {
    memory_bytes >= threshold_gib.saturating_mul(GIB).saturating_sub(GIB / 2)
}
