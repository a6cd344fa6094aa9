// src/core/config_manager.rs
//! Application configuration: optional `config.yaml` section, then environment
//! variables on top.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::app_log;

const DEFAULT_DATABASE_URL: &str = "sqlite:cv_tailor.db?mode=rwc";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_PDF_RENDERER: &str = "weasyprint - -";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RETENTION_DAYS: u32 = 30;
const LOCAL_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:3001"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub llm_timeout_secs: u64,
    pub secret_key: String,
    /// Origins allowed by CORS, always including the local dev servers.
    pub frontend_origins: Vec<String>,
    /// True when FRONTEND_URL was set, i.e. the frontend lives on another site.
    pub cross_site_frontend: bool,
    pub database_url: String,
    pub output_dir: PathBuf,
    pub templates_dir: PathBuf,
    /// Program and arguments of the HTML-to-PDF engine (HTML on stdin, PDF on stdout).
    pub pdf_renderer: Vec<String>,
    pub render_timeout_secs: u64,
    pub render_on_generate: bool,
    /// 0 keeps sessions forever.
    pub session_retention_days: u32,
    pub port: u16,
    pub log_file: Option<PathBuf>,
}

/// One environment section of `config.yaml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub frontend_url: Option<String>,
    pub database_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub pdf_renderer: Option<String>,
    pub render_timeout_secs: Option<u64>,
    pub render_on_generate: Option<bool>,
    pub session_retention_days: Option<u32>,
    pub port: Option<u16>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: FileSettings,
    production: FileSettings,
}

impl AppConfig {
    /// Load `.env`, then `config.yaml` (if present), then environment variables.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            app_log!(info, "Loaded environment from {}", path.display());
        }

        let environment = std::env::var("CVTAILOR_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string());
        app_log!(info, "Loading configuration for environment: {}", environment);

        let settings = Self::load_file(Path::new("config.yaml"), &environment)?;
        Self::from_sources(&environment, settings, |key| std::env::var(key).ok())
    }

    fn load_file(path: &Path, environment: &str) -> Result<FileSettings> {
        if !path.exists() {
            return Ok(FileSettings::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(match environment {
            "production" => file.production,
            _ => file.local,
        })
    }

    /// Merge file settings with variables looked up through `env`.
    pub fn from_sources<F>(environment: &str, file: FileSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let production = environment == "production";

        let secret_key = match var("SECRET_KEY") {
            Some(secret) => secret,
            None if production => anyhow::bail!("SECRET_KEY must be set in production"),
            None => {
                app_log!(warn, "SECRET_KEY not set, using a random per-process secret");
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };

        let frontend_url = var("FRONTEND_URL").or(file.frontend_url);
        let mut frontend_origins: Vec<String> = frontend_url
            .as_deref()
            .map(parse_origins)
            .unwrap_or_default();
        for origin in LOCAL_ORIGINS {
            if !frontend_origins.iter().any(|o| o == origin) {
                frontend_origins.push(origin.to_string());
            }
        }

        let pdf_renderer_line = var("PDF_RENDERER")
            .or(file.pdf_renderer)
            .unwrap_or_else(|| DEFAULT_PDF_RENDERER.to_string());
        let pdf_renderer: Vec<String> =
            pdf_renderer_line.split_whitespace().map(str::to_string).collect();
        if pdf_renderer.is_empty() {
            anyhow::bail!("PDF_RENDERER must name a program");
        }

        Ok(Self {
            environment: environment.to_string(),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL")
                .or(file.openai_model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: var("OPENAI_BASE_URL")
                .or(file.openai_base_url)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_timeout_secs: parse_var(&var, "LLM_TIMEOUT_SECS")?
                .or(file.llm_timeout_secs)
                .unwrap_or(90),
            secret_key,
            frontend_origins,
            cross_site_frontend: frontend_url.is_some(),
            database_url: var("DATABASE_URL")
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from("out")),
            templates_dir: var("TEMPLATES_DIR")
                .map(PathBuf::from)
                .or(file.templates_dir)
                .unwrap_or_else(|| PathBuf::from("templates")),
            pdf_renderer,
            render_timeout_secs: parse_var(&var, "RENDER_TIMEOUT_SECS")?
                .or(file.render_timeout_secs)
                .unwrap_or(60),
            render_on_generate: parse_var(&var, "RENDER_ON_GENERATE")?
                .or(file.render_on_generate)
                .unwrap_or(true),
            session_retention_days: parse_var(&var, "SESSION_RETENTION_DAYS")?
                .or(file.session_retention_days)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            port: parse_var(&var, "ROCKET_PORT")?
                .or(file.port)
                .unwrap_or(DEFAULT_PORT),
            log_file: var("LOG_FILE").map(PathBuf::from).or(file.log_file),
        })
    }

    /// Ensure all required directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        crate::core::FsOps::ensure_dir_exists(&self.output_dir).await
    }
}

fn parse_var<T, V>(var: &V, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        None => Ok(None),
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)], environment: &str) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_sources(environment, FileSettings::default(), |k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[], "local").unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.pdf_renderer, vec!["weasyprint", "-", "-"]);
        assert_eq!(config.session_retention_days, 30);
        assert!(config.openai_api_key.is_none());
        assert!(!config.cross_site_frontend);
        assert_eq!(config.frontend_origins, LOCAL_ORIGINS);
        assert!(!config.secret_key.is_empty());
    }

    #[test]
    fn test_production_requires_secret() {
        assert!(config_with(&[], "production").is_err());
        assert!(config_with(&[("SECRET_KEY", "s3cret")], "production").is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileSettings {
            database_url: Some("sqlite:file.db".into()),
            port: Some(9000),
            ..Default::default()
        };
        let config = AppConfig::from_sources("local", file, |k| match k {
            "DATABASE_URL" => Some("sqlite:env.db".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.database_url, "sqlite:env.db");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_frontend_origins() {
        let config = config_with(
            &[("FRONTEND_URL", "https://cv.example.com/, https://www.cv.example.com")],
            "local",
        )
        .unwrap();
        assert!(config.cross_site_frontend);
        assert_eq!(config.frontend_origins[0], "https://cv.example.com");
        assert_eq!(config.frontend_origins[1], "https://www.cv.example.com");
        assert!(config.frontend_origins.contains(&"http://localhost:3000".to_string()));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        assert!(config_with(&[("ROCKET_PORT", "eighty")], "local").is_err());
    }
}
