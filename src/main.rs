use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wsc::cli::{Args, ConfigDiscovery, ExecutionMode, ProbeRequest};
use wsc::{CommandVersionProbe, CoordinatorConfig, Scope};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wsc=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match mode {
        ExecutionMode::Probe(request) => run_probe(request).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info().context("Failed to show configuration")
        }
        ExecutionMode::InitConfig { force } => {
            let path = ConfigDiscovery::create_default_user_config(force)
                .context("Failed to write default configuration")?;
            println!("Configuration: {}", path.display());
            Ok(())
        }
    }
}

async fn run_probe(request: ProbeRequest) -> Result<()> {
    let config = match &request.config_override {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            CoordinatorConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => ConfigDiscovery::discover_config().context("Failed to discover configuration")?,
    };

    let root = std::path::absolute(&request.root)
        .with_context(|| format!("Invalid path {}", request.root.display()))?;
    let probe = CommandVersionProbe::new(config.probe.clone());
    let info = probe.probe(&Scope::file(root)).await;

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
