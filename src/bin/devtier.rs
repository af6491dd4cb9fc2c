// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use devtier::{
    bench::StartupBenchmark,
    config::Config,
    loader::TierLoader,
    path::{default_config_file, default_preference_file},
    registry::{Surface, TierRegistry},
    report::{StatusReport, TierGuide},
    resolve::{EnvOverrides, Resolution, Step, TierResolver},
    store::PreferenceStore,
    tier::Tier,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::Select;
use std::{path::PathBuf, process::exit, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "devtier [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Configuration surface to act on.
    #[arg(short, long, global = true, default_value = "neovim", value_name = "surface")]
    pub surface: Surface,

    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let session = Session::open(self.surface, self.config)?;
        match self.command {
            Command::Status(opts) => run_status(&session, opts),
            Command::Up => run_step(&session, Step::Up),
            Command::Down => run_step(&session, Step::Down),
            Command::Set(opts) => run_set(&session, opts),
            Command::Reset => run_reset(&session),
            Command::Explain => run_explain(&session),
            Command::Plan(opts) => run_plan(&session, opts),
            Command::Bench(opts) => run_bench(&session, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show current tier, where it came from, and what it loads.
    #[command(visible_alias = "tier-status", override_usage = "devtier status [options]")]
    Status(StatusOptions),

    /// Move one tier up and remember it.
    #[command(visible_alias = "tier-up", override_usage = "devtier up [options]")]
    Up,

    /// Move one tier down and remember it.
    #[command(visible_alias = "tier-down", override_usage = "devtier down [options]")]
    Down,

    /// Remember a tier.
    #[command(visible_alias = "tier-set", override_usage = "devtier set [options] [<tier>]")]
    Set(SetOptions),

    /// Forget remembered tier so it is detected from host again.
    #[command(override_usage = "devtier reset [options]")]
    Reset,

    /// Describe every tier and list commands.
    #[command(visible_alias = "tier-help", override_usage = "devtier explain [options]")]
    Explain,

    /// Print composed tier for configurations to consume.
    #[command(override_usage = "devtier plan [options]")]
    Plan(PlanOptions),

    /// Time startup against tier budget.
    #[command(visible_alias = "benchmark-startup", override_usage = "devtier bench [options]")]
    Bench(BenchOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct StatusOptions {
    /// Report on this tier instead of resolving one.
    #[arg(short, long, value_name = "tier")]
    pub tier: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetOptions {
    /// Tier number or name, prompts interactively if omitted.
    #[arg(value_name = "tier")]
    pub tier: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PlanOptions {
    /// Compose this tier instead of resolving one.
    #[arg(short, long, value_name = "tier")]
    pub tier: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = PlanFormat::Lines)]
    pub format: PlanFormat,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BenchOptions {
    /// Benchmark this tier instead of resolving one.
    #[arg(short, long, value_name = "tier")]
    pub tier: Option<String>,

    /// Number of startups to time.
    #[arg(short, long, default_value_t = 5, value_name = "count")]
    pub runs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlanFormat {
    /// One plugin per line.
    Lines,

    /// Shell variable assignments.
    Shell,
}

/// Everything a command needs, loaded once per invocation.
struct Session {
    surface: Surface,
    env: EnvOverrides,
    config: Config,
    registry: TierRegistry,
    store: PreferenceStore,
}

impl Session {
    fn open(surface: Surface, config_path: Option<PathBuf>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let config_path = match config_path.or_else(|| env.config_file.clone()) {
            Some(path) => path,
            None => default_config_file()?,
        };
        let config = Config::load(&config_path)?;

        let state_file = match env
            .state_file
            .clone()
            .or_else(|| config.settings.state_file.clone())
        {
            Some(path) => path,
            None => default_preference_file()?,
        };

        Ok(Self {
            surface,
            registry: TierRegistry::from_config(&config),
            store: PreferenceStore::new(state_file),
            env,
            config,
        })
    }

    fn resolver(&self, explicit: Option<String>) -> TierResolver {
        TierResolver::new(self.store.clone(), self.config.heuristic)
            .env(self.env.clone())
            .explicit(explicit)
    }

    fn loader(&self) -> TierLoader<'_> {
        TierLoader::new(&self.registry, self.surface)
    }

    fn resolve(&self, explicit: Option<String>) -> Resolution {
        let start = Instant::now();
        let resolution = self.resolver(explicit).resolve();
        if self.env.profile {
            info!("resolved tier {} in {:?}", resolution.tier, start.elapsed());
        }

        resolution
    }

    fn warn_if_shadowed(&self) {
        if let Some(source) = self.resolver(None).shadowing_source() {
            warn!("remembered tier is shadowed by {source} until it is unset");
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_status(session: &Session, opts: StatusOptions) -> Result<()> {
    let resolution = session.resolve(opts.tier);
    let report = StatusReport::new(resolution, &session.loader())?;
    print!("{report}");

    Ok(())
}

fn run_step(session: &Session, step: Step) -> Result<()> {
    let stepped = session.resolver(None).step(step)?;
    let Some(target) = stepped.to else {
        warn!("already at tier {}, nothing to change", stepped.from);
        return Ok(());
    };

    let loaded = session.loader().load_or_fallback(target)?;
    info!("moved from tier {} to {loaded}", stepped.from);
    session.warn_if_shadowed();

    Ok(())
}

fn run_set(session: &Session, opts: SetOptions) -> Result<()> {
    let tier = match opts.tier {
        Some(value) => value
            .parse::<Tier>()
            .with_context(|| format!("refusing to remember tier {value:?}"))?,
        None => {
            let current = session.resolve(None).tier;
            let cursor = Tier::ALL
                .iter()
                .position(|tier| *tier == current)
                .unwrap_or_default();
            Select::new("tier to remember", Tier::ALL.to_vec())
                .with_starting_cursor(cursor)
                .prompt()?
        }
    };

    session.store.write(tier)?;
    session.warn_if_shadowed();

    Ok(())
}

fn run_reset(session: &Session) -> Result<()> {
    session.store.clear()?;
    session.warn_if_shadowed();

    Ok(())
}

fn run_explain(session: &Session) -> Result<()> {
    print!("{}", TierGuide::new(&session.loader(), session.surface));

    Ok(())
}

fn run_plan(session: &Session, opts: PlanOptions) -> Result<()> {
    let resolution = session.resolve(opts.tier);
    let start = Instant::now();
    let loaded = session.loader().load_or_fallback(resolution.tier)?;
    if session.env.profile {
        info!("composed {loaded} in {:?}", start.elapsed());
    }

    match opts.format {
        PlanFormat::Lines => print!("{}", loaded.to_lines()),
        PlanFormat::Shell => print!("{}", loaded.to_shell()),
    }

    Ok(())
}

fn run_bench(session: &Session, opts: BenchOptions) -> Result<()> {
    let resolution = session.resolve(opts.tier);
    let loaded = session.loader().load_or_fallback(resolution.tier)?;
    let command = session.config.bench.command_for(session.surface);
    info!("benchmark {} startup with {loaded}", session.surface);

    let report = StartupBenchmark::new(command, loaded.tier)?
        .runs(opts.runs)
        .profile(session.env.profile)
        .run(loaded.startup_budget)?;
    print!("{report}");

    if !report.within_budget() {
        warn!(
            "{} tier {} averages {} ms, over its {} ms budget",
            session.surface,
            loaded.tier,
            report.mean().as_millis(),
            loaded.startup_budget
        );
    }

    Ok(())
}
