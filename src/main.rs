use anyhow::Result;
use clap::Parser;
use cv_tailor::app_log;
use cv_tailor::cli::{handle_command, Cli, Command};
use cv_tailor::core::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    cv_tailor::logging::init(&config)?;

    app_log!(info, "Configuration loaded for environment: {}", config.environment);

    handle_command(cli.command.unwrap_or(Command::Serve), config).await
}
