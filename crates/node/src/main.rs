// node/src/main.rs
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ember-node")]
#[command(about = "Game-embedded ledger node", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ledger node
    Start {
        /// Configuration file path
        #[arg(short, long, default_value = "./config.toml")]
        config: String,

        /// Override data directory
        #[arg(short, long)]
        data_dir: Option<String>,
    },

    /// Initialize a new node directory
    Init {
        /// Data directory
        #[arg(short, long, default_value = "./data")]
        data_dir: String,
    },

    /// Generate a node keypair
    Keygen {
        /// Output path
        #[arg(short, long)]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Start { config, data_dir } => {
            start_node(&config, data_dir).await?;
        }
        Commands::Init { data_dir } => {
            init_node(&data_dir)?;
        }
        Commands::Keygen { output } => {
            keygen(&output)?;
        }
    }

    Ok(())
}

async fn start_node(config_path: &str, data_dir_override: Option<String>) -> anyhow::Result<()> {
    use ledger_core::GenesisAccount;
    use ledger_crypto::KeyPair;
    use node::{Node, NodeConfig};
    use std::sync::Arc;

    tracing::info!("loading configuration from {}", config_path);
    let mut config = NodeConfig::from_file(config_path)?;

    if let Some(data_dir) = data_dir_override {
        config.data_dir = data_dir;
    }

    let keypair = load_keypair(&config.wallet.key_path)?;
    let genesis_key = KeyPair::from_secret_hex(&keypair.secret_key().to_hex())?;

    let node = Arc::new(Node::new(config, keypair));
    node.ensure_genesis(vec![GenesisAccount::new(genesis_key)])
        .await?;
    node.start().await?;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal");

    node.stop().await;
    tracing::info!("node stopped gracefully");

    Ok(())
}

fn init_node(data_dir: &str) -> anyhow::Result<()> {
    tracing::info!("initializing node at {}", data_dir);

    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(format!("{}/keys", data_dir))?;

    let mut config = node::NodeConfig::default();
    config.data_dir = data_dir.to_string();
    config.wallet.key_path = format!("{}/keys/node.json", data_dir);
    config.to_file(&format!("{}/config.toml", data_dir))?;

    keygen(&config.wallet.key_path)?;

    tracing::info!("node initialized at {}", data_dir);
    tracing::info!("edit {}/config.toml to configure your node", data_dir);

    Ok(())
}

fn keygen(output: &str) -> anyhow::Result<()> {
    use ledger_crypto::{KeyPair, Signer};

    tracing::info!("generating node keypair");
    let keypair = KeyPair::generate();

    let key_json = serde_json::json!({
        "public_key": keypair.public_key().to_hex(),
        "secret_key": keypair.secret_key().to_hex(),
        "address": keypair.address(),
    });

    std::fs::write(output, serde_json::to_string_pretty(&key_json)?)?;
    tracing::info!("keypair saved to {}", output);
    tracing::warn!("keep this file secure!");

    Ok(())
}

fn load_keypair(path: &str) -> anyhow::Result<ledger_crypto::KeyPair> {
    let contents = std::fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&contents)?;
    let secret = parsed
        .get("secret_key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("key file {path} has no secret_key"))?;
    Ok(ledger_crypto::KeyPair::from_secret_hex(secret)?)
}
