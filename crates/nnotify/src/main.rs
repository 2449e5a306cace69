use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod alerts;
mod commands;
mod config;
mod output;
mod relay_pool;

use commands::Context;
use output::Output;

#[derive(Parser)]
#[command(name = "nnotify")]
#[command(version)]
#[command(about = "Receive encrypted push notifications over Nostr")]
#[command(long_about = "Listens on Nostr relays for encrypted notification events addressed to your key, \
decrypts them and shows them as terminal alerts.\n\nUse --json for scripts and agents.")]
struct Cli {
    /// Output in JSON format (for agents/scripts)
    #[arg(short, long, global = true)]
    json: bool,

    /// Data directory (default: platform data dir/nnotify)
    #[arg(long, global = true, env = "NNOTIFY_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with a private key
    Login {
        /// Private key (nsec or hex)
        key: String,
    },

    /// Forget the stored private key
    Logout,

    /// Show current identity
    Whoami,

    /// Generate a new private key
    Keygen {
        /// Store the generated key as the current identity
        #[arg(long)]
        save: bool,
    },

    /// Relay management
    #[command(subcommand)]
    Relays(RelayCommands),

    /// Listen for notifications until Ctrl+C
    Listen,

    /// Show received notifications
    History {
        /// Maximum number of notifications to show
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Delete all stored notifications
    Clear,

    /// Show notification statistics
    Stats,

    /// Show a test alert
    TestAlert,

    /// Turn terminal alerts on or off
    Alerts {
        #[arg(value_enum)]
        state: Option<Toggle>,
    },
}

#[derive(Subcommand)]
enum RelayCommands {
    /// Show configured relays
    Show,

    /// Replace the relay list
    Set {
        /// Relay URLs (ws:// or wss://), one per argument or newline separated
        #[arg(required = true)]
        relays: Vec<String>,
    },

    /// Add a relay
    Add {
        /// Relay URL (ws:// or wss://)
        url: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = Output::new(cli.json);

    let result = run(cli, &output).await;

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("nnotify"),
    };
    let mut ctx = Context::open(&data_dir)?;
    tracing::debug!(data_dir = %ctx.data_dir.display(), "opened data directory");

    match cli.command {
        Commands::Login { key } => commands::identity::login(&key, &ctx, output).await,
        Commands::Logout => commands::identity::logout(&ctx, output).await,
        Commands::Whoami => commands::identity::whoami(&ctx, output).await,
        Commands::Keygen { save } => commands::identity::keygen(save, &ctx, output).await,
        Commands::Relays(cmd) => match cmd {
            RelayCommands::Show => commands::relays::show(&ctx, output).await,
            RelayCommands::Set { relays } => commands::relays::set(&relays, &ctx, output).await,
            RelayCommands::Add { url } => commands::relays::add(&url, &ctx, output).await,
        },
        Commands::Listen => commands::listen::listen(&ctx, output).await,
        Commands::History { limit } => commands::history::history(limit, &ctx, output).await,
        Commands::Clear => commands::history::clear(&ctx, output).await,
        Commands::Stats => commands::history::stats(&ctx, output).await,
        Commands::TestAlert => commands::history::test_alert(&ctx, output).await,
        Commands::Alerts { state } => {
            let enabled = state.map(|s| matches!(s, Toggle::On));
            commands::alerts::set(enabled, &mut ctx, output).await
        }
    }
}
