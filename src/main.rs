//! Binary entrypoint for the gridstash CLI.
//!
//! Commands:
//! - `init [--force]` - write a starter `gridstash.toml`
//! - `simulate <session.json>` - replay a scripted session against the simulated authority
//! - `catalog` - list the item definitions from the configured seed file
//!
//! See the library crate docs for module-level details: `gridstash::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use gridstash::config::Config;
use gridstash::simulate::{load_catalog_seed, Session, Simulation, StepResult};

#[derive(Parser)]
#[command(name = "gridstash")]
#[command(about = "Optimistic grid inventory engine with authoritative reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "gridstash.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Run a scripted session against the simulated authority
    Simulate {
        /// Session JSON file
        session: String,
    },
    /// Print the item catalog
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init runs before a config exists; everything else tolerates a missing file.
    let config = match cli.command {
        Commands::Init { .. } => None,
        _ => {
            if tokio::fs::metadata(&cli.config).await.is_ok() {
                Some(Config::load(&cli.config).await?)
            } else {
                eprintln!("{} not found; using defaults", cli.config);
                None
            }
        }
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Init { force } => {
            if !force && tokio::fs::metadata(&cli.config).await.is_ok() {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    cli.config
                ));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Simulate { session } => {
            let config = config.unwrap_or_default();
            let definitions = load_catalog_seed(&config)?;
            let session = Session::load(&session).await?;
            info!(
                "Running {} steps with {} catalog items (approve ratio {})",
                session.steps.len(),
                definitions.len(),
                config.simulation.approve_ratio
            );

            let mut simulation = Simulation::new(&config, definitions);
            let reports = simulation.run(session).await;
            let mut rolled_back = 0;
            for report in &reports {
                let verdict = match &report.result {
                    StepResult::Applied => "applied".to_string(),
                    StepResult::Outcome(outcome) if outcome.is_committed() => {
                        format!("committed {}", outcome.kind())
                    }
                    StepResult::Outcome(outcome) => {
                        rolled_back += 1;
                        format!("rolled back {}", outcome.kind())
                    }
                    StepResult::Refused(reason) => format!("refused: {}", reason),
                };
                println!("#{} {} => {}", report.index, report.description, verdict);
            }
            println!();
            for line in simulation.render().await {
                println!("{}", line);
            }
            if rolled_back > 0 {
                warn!("{} operations rolled back", rolled_back);
            }
            simulation.shutdown();
        }
        Commands::Catalog => {
            let config = config.unwrap_or_default();
            let definitions = load_catalog_seed(&config)?;
            if definitions.is_empty() {
                println!("Catalog is empty");
            }
            let catalog = gridstash::engine::ItemCatalog::with_items(definitions);
            for def in catalog.definitions() {
                let flags = [
                    (def.stack, "stack"),
                    (def.usable, "usable"),
                    (def.close, "close"),
                ]
                .into_iter()
                .filter(|(on, _)| *on)
                .map(|(_, name)| name)
                .collect::<Vec<_>>()
                .join(",");
                println!("{:<16} {:<24} [{}]", def.name, def.label, flags);
                for group in def.grouped_buttons() {
                    let labels: Vec<&str> = group.buttons.iter().map(|(_, l)| l.as_str()).collect();
                    match group.name {
                        Some(name) => println!("    {}: {}", name, labels.join(" | ")),
                        None => println!("    {}", labels.join(" | ")),
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if verbosity == 0 {
            builder.parse_filters(&cfg.logging.level);
        }
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new().create(true).append(true).open(file) {
                let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                // Piped output stays clean for the step listing
                let is_tty = atty::is(atty::Stream::Stdout);

                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());
                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }
                    if is_tty {
                        writeln!(fmt, "{}", line)
                    } else {
                        Ok(())
                    }
                });
                let _ = builder.try_init();
                return;
            }
        }
    }
    builder.format(|fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
    });
    let _ = builder.try_init();
}
