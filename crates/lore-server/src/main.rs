use std::path::PathBuf;

use clap::Parser;
use lore_server::LoreConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lore-server", version, about = "Retrieval-augmented knowledge base server")]
struct Cli {
    /// Path to a TOML config file (defaults to config/lore.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the config
    #[arg(long)]
    address: Option<String>,
}

fn init_tracing(debug: bool) {
    let filter = if let Ok(env) = std::env::var("LORE_LOG") {
        EnvFilter::new(env)
    } else if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = LoreConfig::load(cli.config.as_deref())?;
    if let Some(address) = cli.address {
        config.address = address;
    }
    init_tracing(config.debug);
    config.validate()?;

    lore_server::serve(config).await
}
