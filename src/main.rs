use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;
mod config;
mod db;

use app::App;
use commands::{
    AuthCommand, ConfigCommand, DrinkCommand, GoalCommand, HistoryCommand, StatusCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "water")]
#[command(version)]
#[command(about = "Track daily water intake against a hydration goal", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign up, log in and out
    Auth(AuthCommand),

    /// Log a drink of water
    Drink(DrinkCommand),

    /// Show progress toward today's goal
    Status(StatusCommand),

    /// Show or change the daily goal
    Goal(GoalCommand),

    /// Show logged drinks
    History(HistoryCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drinkwater=warn,drinkwater_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli.config),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let app = App::open(&config).await?;
    match command {
        Commands::Auth(cmd) => cmd.run(&app).await,
        Commands::Drink(cmd) => cmd.run(&app).await,
        Commands::Status(cmd) => cmd.run(&app).await,
        Commands::Goal(cmd) => cmd.run(&app).await,
        Commands::History(cmd) => cmd.run(&app, &config).await,
        Commands::Config(_) => Ok(()),
    }
}
