use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use pcbot_config::PcBotConfig;
use pcbot_system::{DryRunActionInvoker, SystemActionInvoker, service};
use pcbot_timer::ActionInvoker;

#[derive(Parser)]
#[command(name = "pcbot", about = "Remote PC control over Telegram")]
struct Cli {
    /// Config file (defaults to ~/.pcbot/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run {
        /// Log power actions instead of running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Register the bot as a Windows service that starts with the system
    RegisterService,
    /// Stop and remove the Windows service
    UnregisterService,
    /// Show the resolved configuration
    Health,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PcBotConfig> {
    let config = match path {
        Some(path) => pcbot_config::load_config_from(path)?,
        None => pcbot_config::load_config()?,
    };
    Ok(config)
}

async fn run_bot(config: PcBotConfig, dry_run: bool) -> anyhow::Result<()> {
    let invoker: Arc<dyn ActionInvoker> = if dry_run || config.actions.dry_run {
        info!("Dry run: power actions will only be logged");
        Arc::new(DryRunActionInvoker)
    } else {
        Arc::new(SystemActionInvoker::new())
    };

    let telegram = pcbot_channel_telegram::create_telegram_channel("telegram", &config)?;
    pcbot_gateway::start_gateway(&config, vec![telegram], invoker).await
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { dry_run: false }) {
        Commands::Run { dry_run } => {
            let config = load_config(cli.config.as_ref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_bot(config, dry_run))?;
        }
        Commands::RegisterService => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(service::register_service())?;
            println!("Service {} registered", service::SERVICE_NAME);
        }
        Commands::UnregisterService => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(service::unregister_service())?;
            println!("Service {} removed", service::SERVICE_NAME);
        }
        Commands::Health => {
            let config = load_config(cli.config.as_ref())?;
            println!("pcbot configuration");
            match &cli.config {
                Some(path) => println!("  config file: {}", path.display()),
                None => match pcbot_config::config_file_path() {
                    Ok(path) => println!("  config file: {}", path.display()),
                    Err(e) => println!("  config file: unavailable ({e})"),
                },
            }
            println!(
                "  bot token: {}",
                if config.bot_token().is_ok() { "set" } else { "missing" }
            );
            match config.telegram.admin_chat_id {
                Some(id) => println!("  admin chat: {id}"),
                None => println!("  admin chat: none"),
            }
            if config.telegram.allowed_users.is_empty() {
                println!("  allowed users: everyone");
            } else {
                println!("  allowed users: {:?}", config.telegram.allowed_users);
            }
            println!("  poll timeout: {}s", config.telegram.poll_timeout_secs);
            println!("  dry run: {}", config.actions.dry_run);
        }
    }

    Ok(())
}
