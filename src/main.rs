use clap::Parser;
use thumbnail_cache::{install_prometheus_recorder, setup_logging, Cli, CliRunner, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    info!("Starting thumbnail-cache v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = if args.print_metrics {
        Some(install_prometheus_recorder()?)
    } else {
        None
    };

    // Load configuration
    let config = load_config(&args).await?;

    let identity = args.identity();
    let cli_runner = CliRunner::new(config, identity);

    let result = tokio::select! {
        result = cli_runner.run(args.command) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }

    if let Err(e) = result {
        error!("Application error ({:?}): {}", e.severity(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn load_config(args: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path).await?
    } else {
        Config::default()
    };

    // Override with CLI arguments
    args.apply_overrides(&mut config);

    config.validate()?;

    info!("Configuration loaded successfully");
    info!("Cache directory: {}", config.cache_dir.display());
    info!("Screenshot timeout: {:?}", config.driver.screenshot_timeout);

    Ok(config)
}
