mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "handover",
    about = "Persona handover workflow: PM, architecture, implementation, QA, security, deployment, release",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .handover/ or .git/)
    #[arg(long, global = true, env = "HANDOVER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and seed the handover record
    Init {
        /// Feature slug used in artifact paths
        #[arg(long)]
        feature: Option<String>,
    },

    /// Run the workflow until it completes, fails, or hits the step budget
    Run {
        /// Override `max_steps` from the config
        #[arg(long)]
        max_steps: Option<u32>,

        /// Don't write the run report to the reports directory
        #[arg(long)]
        no_report: bool,
    },

    /// Show the current persona and phase and what would run next
    Status,

    /// Run a single persona once, without touching the handover record
    Persona {
        /// Handler key (pm, architect, developer, qa, security, devops, releasemanager)
        key: String,

        /// Prompt to pass to the handler
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Inspect the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } | Commands::Persona { .. } => tracing::Level::INFO,
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
        Commands::Init { feature } => cmd::init::run(&root, feature.as_deref()),
        Commands::Run {
            max_steps,
            no_report,
        } => cmd::run::run(&root, max_steps, no_report, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Persona { key, prompt } => {
            cmd::persona::run(&root, &key, prompt.as_deref(), cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
