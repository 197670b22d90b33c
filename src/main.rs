//! Consult Mesh - command line entry point
//!
//! Loads the worker roster, builds the mesh, and submits one task as a
//! consultation chain. Ctrl-C cancels the chain.

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use consult_mesh::cli::{Cli, Commands, ConfigSubcommand};
use consult_mesh::config::{self, AppConfig};
use consult_mesh::error::{Error, Result};
use consult_mesh::generation::create_generator;
use consult_mesh::logging;
use consult_mesh::mesh::MeshBuilder;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Workers { config } => {
            let config = AppConfig::load(config.as_deref())?;
            print_workers(&config);
            Ok(())
        }
        Commands::Submit {
            worker,
            config,
            timeout_ms,
            max_depth,
            seed,
            json,
            task,
        } => {
            let mut config = AppConfig::load(config.as_deref())?;

            // CLI arguments take precedence over file and environment
            if let Some(ms) = timeout_ms {
                config.mesh.chain_timeout_ms = ms;
            }
            if max_depth.is_some() {
                config.mesh.max_chain_depth = max_depth;
            }
            if seed.is_some() {
                config.mesh.seed = seed;
            }
            config.validate()?;

            // The guards must be kept alive for the lifetime of the program
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            info!(version = env!("CARGO_PKG_VERSION"), "Starting consult-mesh");

            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.enable_all().thread_name("consult-mesh");
            if config.mesh.worker_threads > 0 {
                builder.worker_threads(config.mesh.worker_threads);
            }
            let runtime = builder
                .build()
                .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

            let report = runtime.block_on(submit_task(&config, worker, task.join(" ")))?;
            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .map_err(|e| Error::Internal(format!("Failed to render report: {}", e)))?;
                println!("{}", rendered);
            } else {
                println!("{}", report.answer);
            }
            Ok(())
        }
    }
}

/// Outcome of one submitted chain
#[derive(Debug, Serialize)]
struct SubmitReport {
    worker: String,
    chain_id: String,
    answer: String,
    deliveries: u64,
    consultations: u64,
}

/// Build the mesh and run one chain, cancelling it on Ctrl-C
async fn submit_task(config: &AppConfig, worker: String, task: String) -> Result<SubmitReport> {
    let generator = create_generator(&config.generation)?;
    let mesh = MeshBuilder::from_config(config, generator)?.build()?;

    let handle = mesh.spawn(worker.as_str(), task);
    let chain_id = handle.chain_id();

    let interrupt = mesh.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(chain_id = %chain_id, "Interrupt received, cancelling chain");
            interrupt.cancel(chain_id);
        }
    });

    let answer = handle.join().await?;

    let stats = mesh.router().stats();
    info!(
        chain_id = %chain_id,
        deliveries = stats.total(),
        consultations = stats.nested(),
        "Chain finished"
    );

    Ok(SubmitReport {
        worker,
        chain_id: chain_id.to_string(),
        answer,
        deliveries: stats.total(),
        consultations: stats.nested(),
    })
}

/// Print the configured roster
fn print_workers(config: &AppConfig) {
    println!(
        "{:<16} {:>11}  {:<16} {}",
        "ID", "CONSULT P", "MODEL", "PERSONA"
    );
    for spec in &config.workers {
        let model = spec
            .model
            .as_deref()
            .unwrap_or(config.generation.default_model.as_str());
        println!(
            "{:<16} {:>11.2}  {:<16} {}",
            spec.id,
            spec.consultation_probability,
            model,
            summarize(&spec.persona, 60)
        );
    }
}

/// First line of `text`, cut to `max` characters
fn summarize(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Handle config subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            println!(
                "Configuration is valid. {} workers, backend {}.",
                cfg.workers.len(),
                cfg.generation.backend
            );
        }
    }

    Ok(())
}
