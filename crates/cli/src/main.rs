mod api_commands;
mod auth_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "jiro", about = "jiro — Jira Cloud from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory (defaults to ~/.config/jiro).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authentication management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// List the Jira Cloud sites the stored token can address.
    Whoami,
    /// Issue a raw authenticated REST call against the configured site.
    Api(api_commands::ApiArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn config_dir(cli: &Cli) -> PathBuf {
    if let Some(dir) = &cli.config_dir {
        return dir.clone();
    }
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".config").join("jiro"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let dir = config_dir(&cli);
    debug!(dir = %dir.display(), "loading config");
    let config = jiro_config::load(&dir)?;

    match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(action, config).await,
        Commands::Whoami => api_commands::whoami(config).await,
        Commands::Api(args) => api_commands::api(args, config).await,
    }
}
