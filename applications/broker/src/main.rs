/// Media Hub Broker - media session broker daemon
use clap::{Parser, Subcommand};
use hub_broker::{AppState, BrokerConfig, Scenario, ScenarioRunner};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hub-broker")]
#[command(about = "Media session broker with simulated device observers", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./hub-broker.toml if present)
    #[arg(short, long, global = true, env = "HUB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the broker until Ctrl-C
    Serve,
    /// Replay a scenario file and print the resulting session states
    Simulate {
        /// Scenario TOML file
        scenario: PathBuf,
    },
    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = BrokerConfig::load(cli.config.as_deref())?;
    config.validate()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve => serve(&config).await?,
        Commands::Simulate { scenario } => simulate(&config, &scenario).await?,
        Commands::CheckConfig => println!("{}", config.to_toml()?),
    }

    Ok(())
}

async fn serve(config: &BrokerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting media hub broker");
    tracing::info!(
        "Restricted outputs: {:?}",
        config.arbitration.restricted_outputs
    );

    let state = AppState::start(config);
    let mut events = state.broker.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => tracing::info!(session = %event.key, event = ?event.event, "Track list event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event relay lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    state.broker.shutdown().await?;
    Ok(())
}

async fn simulate(config: &BrokerConfig, path: &Path) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)?;
    let state = AppState::start(config);

    let report = ScenarioRunner::new(&state).run(&scenario).await?;
    println!("{report}");

    state.broker.shutdown().await?;
    Ok(())
}
