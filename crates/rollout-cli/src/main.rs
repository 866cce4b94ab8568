mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{actions::ActionsSubcommand, cache::CacheSubcommand, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Run declared pre/post deployment actions against a target environment",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .rollout/ or .git/)
    #[arg(long, global = true, env = "ROLLOUT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold .rollout/config.yaml in the current project
    Init {
        /// Project name (default: the root directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List, validate and run the declared deployment actions
    Actions {
        #[command(subcommand)]
        subcommand: ActionsSubcommand,
    },

    /// Inspect and reset the run-once cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Actions {
            subcommand: ActionsSubcommand::Run { .. },
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Actions { subcommand } => cmd::actions::run(&root, subcommand, cli.json),
        Commands::Cache { subcommand } => cmd::cache::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
