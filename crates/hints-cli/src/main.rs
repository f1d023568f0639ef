use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "hints-cli", version, about = "HINTS examination CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an examination with simulated sensors and audio
    Run(commands::run::RunArgs),
    /// Print the resolved phase table as JSON
    Phases,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Calibration flag management
    Calibration {
        #[command(subcommand)]
        action: commands::calibration::CalibrationAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("HINTS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Phases => commands::phases::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Calibration { action } => commands::calibration::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
