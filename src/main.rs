//! VRChat log relay - tails the output log and forwards events over OSC.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrc_log_relay::config::{ConfigLoader, RelayConfig, WatchMode};
use vrc_log_relay::display;
use vrc_log_relay::osc::{DisabledTransport, OscTransport, UdpOscClient};
use vrc_log_relay::relay::{message_queue, Coordinator};
use vrc_log_relay::watcher::LogLocator;

#[derive(Parser)]
#[command(
    name = "vrc-log-relay",
    about = "Relay VRChat join/leave events and the clock over OSC",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing the log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// OSC listener host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// OSC listener port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Poll the log file instead of using native change notifications.
    #[arg(long, global = true)]
    poll: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the latest log and relay events until interrupted.
    Run,
    /// Print the log file that would be watched.
    Latest,
    /// Print the effective configuration as TOML.
    ShowConfig,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<RelayConfig, Box<dyn std::error::Error>> {
    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = loader.load()?;

    if let Some(dir) = &cli.log_dir {
        config.log_dir.clone_from(dir);
    }
    if let Some(host) = &cli.host {
        config.osc.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.osc.port = port;
    }
    if cli.poll {
        config.watch.mode = WatchMode::Poll;
    }

    config.validate()?;
    Ok(config)
}

fn open_transport(config: &RelayConfig) -> Arc<dyn OscTransport> {
    match UdpOscClient::connect(&config.osc.host, config.osc.port) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(endpoint = %config.osc.endpoint(), error = %e, "OSC client unavailable, signals disabled");
            Arc::new(DisabledTransport)
        }
    }
}

async fn run(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (queue, drain) = message_queue();
    let coordinator = Coordinator::from_config(&config, open_transport(&config), queue)?;

    display::print_banner(&config.osc.endpoint(), &config.log_dir);
    tracing::info!(
        log_dir = %config.log_dir.display(),
        endpoint = %config.osc.endpoint(),
        mode = ?config.watch.mode,
        "Starting relay"
    );

    let cancel = CancellationToken::new();
    let display_task = tokio::spawn(display::run_display(
        drain,
        config.watch.display_poll(),
        cancel.clone(),
    ));
    let relay_task = tokio::spawn(coordinator.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, shutting down");
    cancel.cancel();

    relay_task.await?;
    display_task.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Run => run(config).await,
        Commands::Latest => {
            let locator = LogLocator::new(
                config.log_dir.clone(),
                config.file_prefix.clone(),
                config.file_suffix.clone(),
            );
            match locator.find_latest() {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(())
                }
                None => Err(format!("No log file found in {}", config.log_dir.display()).into()),
            }
        }
        Commands::ShowConfig => toml::to_string_pretty(&config)
            .map(|text| print!("{text}"))
            .map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
