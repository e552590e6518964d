use sheet_dashboard::app;
use sheet_dashboard::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    log::info!("Serving spreadsheet {} with {:?}", config.spreadsheet_id, config.auth);

    // Start the web application
    app::run(config).await?;

    Ok(())
}
