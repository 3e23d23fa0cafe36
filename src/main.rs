use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pagepulse::config::ProbeConfig;
use pagepulse::driver::playwright::PlaywrightDriver;
use pagepulse::executor::Executor;
use pagepulse::metrics::ProbeRecorder;

#[derive(Parser)]
#[command(
    name = "pagepulse",
    about = "Synthetic browser monitoring probe with Prometheus metrics",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (probe endpoint + daemon metrics)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Path to the YAML plan file
        #[arg(long, default_value = "pagepulse.yaml")]
        config: PathBuf,
    },

    /// Run the plan once and print the report
    Probe {
        /// Path to the YAML plan file
        #[arg(long, default_value = "pagepulse.yaml")]
        config: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Parse a plan file and report validation warnings
    Check {
        /// Path to the YAML plan file
        #[arg(long, default_value = "pagepulse.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            tracing::info!(%bind, config = %config.display(), "Starting pagepulse daemon");
            let config = ProbeConfig::load(&config)?;
            pagepulse::serve(&bind, config).await?;
        }
        Commands::Probe { config, json } => {
            let config = ProbeConfig::load(&config)?;
            for warning in config.validate() {
                tracing::warn!("{warning}");
            }

            let driver = Arc::new(PlaywrightDriver::new(config.settings.headless));
            let executor = Executor::new(driver, config.settings);
            let mut recorder = ProbeRecorder::new();
            let report = executor.run(&config.plan, &mut recorder).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nProbe '{}' (run {})", report.plan, report.run_id);
                println!("{:<25} | {:<10} | {:>12}", "Step", "Result", "Duration (s)");
                println!("{:-<25}-|-{:-<10}-|-{:-<12}", "", "", "");
                for step in &report.steps {
                    let result = if step.succeeded { "OK" } else { "FAIL" };
                    println!(
                        "{:<25} | {:<10} | {:>12.3}",
                        step.name, result, step.duration_seconds
                    );
                    if let Some(err) = &step.error {
                        println!("{:<25} | {:<10} |   -> {}", "", "", err);
                    }
                }
                println!("\nTotal: {:.3}s", report.total_duration_seconds);
                if let Some(err) = &report.error {
                    println!("Aborted: {}", err);
                }
            }

            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        Commands::Check { config } => {
            let config = ProbeConfig::load(&config)?;
            println!(
                "Plan '{}': {} step(s)",
                config.plan.name,
                config.plan.steps.len()
            );
            for step in &config.plan.steps {
                println!(
                    "  {:<25} {} (type: {})",
                    step.name,
                    step.action,
                    step.effective_type(&config.plan.default_type)
                );
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("No warnings.");
            } else {
                for warning in &warnings {
                    println!("WARNING: {warning}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
