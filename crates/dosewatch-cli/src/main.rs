use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dosewatch-cli", version, about = "Dosewatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print upcoming trigger instants for a schedule
    Next(commands::next::NextArgs),
    /// Run an offline day simulation of the alarm engine
    Simulate(commands::simulate::SimulateArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Next(args) => commands::next::run(args),
        Commands::Simulate(args) => commands::simulate::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
