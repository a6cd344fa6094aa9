// src/cli.rs
use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app_log;
use crate::core::config_manager::AppConfig;
use crate::core::template_engine::TemplateKind;
use crate::core::{Database, TemplateEngine};
use crate::session_store::SessionStore;

#[derive(Parser)]
#[command(name = "cvtailor")]
#[command(about = "Tailors CVs and cover letters to job descriptions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP API server (default)
    Serve,
    /// Delete generation sessions and cached PDFs past the retention period
    PurgeSessions {
        /// Overrides SESSION_RETENTION_DAYS; 0 deletes nothing
        #[arg(long)]
        older_than_days: Option<u32>,
    },
    /// List the available CV templates
    Templates,
}

pub async fn handle_command(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Serve => crate::web::start_web_server(config).await,

        Command::PurgeSessions { older_than_days } => {
            let days = older_than_days.unwrap_or(config.session_retention_days);
            let db = Database::connect(&config.database_url).await?;
            let store = SessionStore::new(db, config.output_dir.clone());
            let removed = store.purge_expired(days).await?;
            app_log!(info, "Purged {} sessions (retention {} days)", removed, days);
            println!("Removed {} sessions older than {} days", removed, days);
            Ok(())
        }

        Command::Templates => {
            let engine = TemplateEngine::new(config.templates_dir.clone())?;
            for template in engine.templates_of(TemplateKind::Cv) {
                println!("{:<12} {}", template.id, template.description);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_optional() {
        let cli = Cli::try_parse_from(["cvtailor"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_purge_arguments() {
        let cli = Cli::try_parse_from(["cvtailor", "purge-sessions", "--older-than-days", "7"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::PurgeSessions {
                older_than_days: Some(7)
            })
        );
        assert!(Cli::try_parse_from(["cvtailor", "purge-sessions", "--older-than-days", "-1"]).is_err());
    }
}
