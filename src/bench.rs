// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Startup benchmarking.
//!
//! Time how long a surface takes to start and exit with a given tier loaded,
//! and hold the result against that tier's startup budget. The benchmarked
//! command learns which tier to load through `DEVTIER_TIER`, exactly like a
//! normal startup would.

use crate::{
    resolve::{AGENT_MODE_VAR, TIER_VAR},
    tier::Tier,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    process::{Command, Stdio},
    time::{Duration, Instant},
};
use tracing::{info, instrument};

/// Repeatedly time a startup command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupBenchmark {
    program: String,
    args: Vec<String>,
    tier: Tier,
    runs: usize,
    profile: bool,
}

impl StartupBenchmark {
    /// Construct new benchmark of command under target tier.
    ///
    /// First element of command is the program, the rest are its arguments.
    /// Defaults to five runs.
    ///
    /// # Errors
    ///
    /// - Return [`BenchError::EmptyCommand`] if command is empty.
    pub fn new(command: impl IntoIterator<Item = impl Into<String>>, tier: Tier) -> Result<Self> {
        let mut command = command.into_iter().map(Into::into);
        let program = command.next().ok_or(BenchError::EmptyCommand)?;

        Ok(Self {
            program,
            args: command.collect(),
            tier,
            runs: 5,
            profile: false,
        })
    }

    /// Set number of runs.
    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Log every sample as it is taken.
    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Run benchmark, and compare against budget in milliseconds.
    ///
    /// # Errors
    ///
    /// - Return [`BenchError::NoRuns`] if number of runs is zero.
    /// - Return [`BenchError::Spawn`] if command cannot be started.
    /// - Return [`BenchError::Failed`] if command exits unsuccessfully.
    /// - Return [`BenchError::IndicatifStyleTemplate`] if progress bar cannot
    ///   be styled.
    #[instrument(skip(self), fields(program = %self.program, tier = %self.tier), level = "debug")]
    pub fn run(&self, budget: u64) -> Result<BenchReport> {
        if self.runs == 0 {
            return Err(BenchError::NoRuns);
        }

        let bar = ProgressBar::new(self.runs as u64);
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<30}  [{wide_bar:.yellow/blue}] {pos}/{len}",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(format!("{} tier {}", self.program, self.tier.level()));

        let mut samples = Vec::with_capacity(self.runs);
        for run in 1..=self.runs {
            let sample = self.sample()?;
            if self.profile {
                bar.suspend(|| info!("run {run}: {} ms", sample.as_millis()));
            }
            samples.push(sample);
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(BenchReport {
            tier: self.tier,
            samples,
            budget: Duration::from_millis(budget),
        })
    }

    fn sample(&self) -> Result<Duration> {
        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .env(TIER_VAR, self.tier.level().to_string())
            .env_remove(AGENT_MODE_VAR)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| BenchError::Spawn {
                source: err,
                program: self.program.clone(),
            })?;
        let elapsed = start.elapsed();

        if !output.status.success() {
            return Err(BenchError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(elapsed)
    }
}

/// Timing results of a benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchReport {
    /// Tier that was benchmarked.
    pub tier: Tier,

    /// Wall-clock time of every run.
    pub samples: Vec<Duration>,

    /// Startup budget of benchmarked tier.
    pub budget: Duration,
}

impl BenchReport {
    /// Fastest run.
    pub fn min(&self) -> Duration {
        self.samples.iter().min().copied().unwrap_or_default()
    }

    /// Slowest run.
    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or_default()
    }

    /// Average run.
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.samples.len()) {
            Ok(count) if count > 0 => self.samples.iter().sum::<Duration>() / count,
            _ => Duration::default(),
        }
    }

    /// Check if average run stays within startup budget.
    pub fn within_budget(&self) -> bool {
        self.mean() <= self.budget
    }
}

impl Display for BenchReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "tier:    {}", self.tier)?;
        writeln!(fmt, "runs:    {}", self.samples.len())?;
        writeln!(fmt, "min:     {} ms", self.min().as_millis())?;
        writeln!(fmt, "mean:    {} ms", self.mean().as_millis())?;
        writeln!(fmt, "max:     {} ms", self.max().as_millis())?;
        writeln!(fmt, "budget:  {} ms", self.budget.as_millis())?;
        let verdict = if self.within_budget() {
            "within budget"
        } else {
            "over budget"
        };
        writeln!(fmt, "verdict: {verdict}")
    }
}

/// All possible error types for startup benchmarking.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// No command to benchmark.
    #[error("benchmark command is empty")]
    EmptyCommand,

    /// Zero runs requested.
    #[error("benchmark needs at least one run")]
    NoRuns,

    /// Command cannot be started.
    #[error("failed to start {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Command exits unsuccessfully.
    #[error("{program:?} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
type Result<T, E = BenchError> = std::result::Result<T, E>;
