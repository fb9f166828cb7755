use clap::{Parser, Subcommand};

mod commands;

use commands::{EvaluateArgs, ExportJournalArgs, PaperSessionArgs};

#[derive(Parser)]
#[command(name = "orbfib")]
#[command(about = "Opening range breakout + Fibonacci pullback options trader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one paper session over recorded bars
    Run(PaperSessionArgs),
    /// Evaluate a 5-minute bar file and print the signal, if any
    Evaluate(EvaluateArgs),
    /// Export the trade journal to CSV
    ExportJournal(ExportJournalArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = orbfib_core::ConfigLoader::load_from(&args.config)?;
            init_logging(&config.logging.level, config.logging.log_file.as_deref())?;
            tracing::info!("Loaded config from {}", args.config);
            commands::run_paper_session(&args, config).await?;
        }
        Commands::Evaluate(args) => {
            init_logging("warn", None)?;
            commands::run_evaluate(&args)?;
        }
        Commands::ExportJournal(args) => {
            init_logging("info", None)?;
            commands::run_export_journal(&args).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over `level`; `log_file` redirects output to an appended file.
fn init_logging(level: &str, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter()).init();
        }
    }
    Ok(())
}
