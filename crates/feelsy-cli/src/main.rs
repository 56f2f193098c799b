use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "feelsy-cli", version, about = "Feelsy CLI")]
struct Cli {
    /// Config file (default: ~/.config/feelsy/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server and streak worker
    Serve(commands::serve::ServeArgs),
    /// Check-ins, history and streak stats
    Feel {
        #[command(subcommand)]
        action: commands::feel::FeelAction,
    },
    /// Good vibes
    Vibe {
        #[command(subcommand)]
        action: commands::vibe::VibeAction,
    },
    /// Friendship edges and the friend feed
    Friend {
        #[command(subcommand)]
        action: commands::friend::FriendAction,
    },
    /// User identity records
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Streak job queue
    Queue {
        #[command(subcommand)]
        action: commands::queue::QueueAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let ctx = Context {
        config_path: cli.config,
        db_path: cli.db,
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &ctx),
        Commands::Feel { action } => commands::feel::run(action, &ctx),
        Commands::Vibe { action } => commands::vibe::run(action, &ctx),
        Commands::Friend { action } => commands::friend::run(action, &ctx),
        Commands::User { action } => commands::user::run(action, &ctx),
        Commands::Queue { action } => commands::queue::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
