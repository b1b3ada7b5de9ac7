//! NAV Arb - index-token NAV arbitrage bot
//!
//! Run with: cargo run -- dev
//!
//! Each cycle, per chain:
//! - fork the chain and fund the fork account
//! - compare every pool's price with the index NAV
//! - dry-run the arbitrage on the fork, commit it if it clears the threshold

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod chain;
mod config;
mod contracts;
mod deployments;
mod execution;
mod pricing;
mod scheduler;
mod sizing;
mod units;

use bot::{describe, ChainBot};
use chain::{ForkNode, GanacheFork};
use config::{Chain, Config, RunProfile};
use scheduler::Scheduler;

#[derive(Parser, Debug)]
#[command(name = "nav-arb", about = "Index NAV arbitrage bot")]
struct Cli {
    /// dev commits on the fork, prod commits live
    #[arg(value_enum, default_value_t = RunProfile::Dev)]
    profile: RunProfile,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Only run this chain
    #[arg(long, value_enum)]
    chain: Option<Chain>,

    /// Approve the index router and swap routers on the live account first
    #[arg(long)]
    grant_allowances: bool,

    /// Load settings from a TOML file instead of the environment
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a TOML file and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn print_banner(profile: RunProfile) {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!("{}", style(" ⚖️  NAV ARB - Index Premium/Discount Arbitrage").cyan().bold());
    println!(
        "{}",
        style(format!("    Profile: {} | Commit: {}", profile, profile.primary_mode())).cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nav_arb=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    print_banner(cli.profile);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(cli.profile)?,
    };
    config.profile = cli.profile;

    if let Some(path) = &cli.dump_config {
        config.save_to_file(path)?;
        info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }
    config.print_summary();
    println!();

    let fork: Arc<dyn ForkNode> = Arc::new(GanacheFork::new(config.fork_port));
    let chains: Vec<Chain> = match cli.chain {
        Some(chain) => vec![chain],
        None => Chain::ALL.to_vec(),
    };
    let bots = chains
        .into_iter()
        .map(|chain| ChainBot::connect(&config, chain, fork.clone()))
        .collect::<Result<Vec<_>>>()?;

    if cli.grant_allowances {
        if cli.profile != RunProfile::Prod {
            return Err(color_eyre::eyre::eyre!("--grant-allowances needs the prod profile"));
        }
        for bot in &bots {
            println!("{}", style(format!("🔓 Granting allowances on {}", bot.chain())).yellow());
            bot.grant_allowances().await?;
        }
    }

    let max_cycles = cli.once.then_some(1);
    let (scheduler, shutdown) = Scheduler::new(config.cycle_interval(), max_cycles);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current cycle");
            shutdown.shutdown();
        }
    });

    let bots = &bots;
    let cycles = scheduler
        .run(|n| async move {
            println!();
            println!("{}", style(format!("═══ CYCLE {} ═══", n)).blue().bold());

            for bot in bots {
                let start = Instant::now();
                println!("{}", style(format!("▶ {}", bot.chain())).blue());

                match bot.run_cycle().await {
                    Ok(report) => println!(
                        "{} {} ({:.1?})",
                        style("✓").green(),
                        describe(&report),
                        start.elapsed()
                    ),
                    Err(e) => {
                        error!("Cycle on {} failed: {:?}", bot.chain(), e);
                        println!("{} {} cycle failed", style("✗").red(), bot.chain());
                    }
                }
            }
        })
        .await;

    info!("Done after {} cycles", cycles);
    Ok(())
}
