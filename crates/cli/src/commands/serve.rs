//! `shamba serve`: Start the HTTP USSD gateway.

use std::path::PathBuf;
use tracing::info;

pub async fn run(
    port_override: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
        config.validate()?;
        info!(port, "Port overridden from the command line");
    }

    println!("Shamba USSD Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Callback:   POST /ussd");
    println!("   Registry:   {}", config.registry.backend);
    println!(
        "   Sessions:   expire after {}s idle",
        config.session.timeout_secs
    );

    shamba_gateway::start(config).await?;

    Ok(())
}
