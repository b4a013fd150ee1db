use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::gateway::{LIVE_BASE_URL, SANDBOX_BASE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_id: String,
    pub store_passwd: String,
    pub is_live: bool,
    pub gateway_base_url: String,
    pub gateway_timeout_secs: u64,
    pub public_base_url: String,
    pub frontend_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let server_port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3030".to_string())
            .parse()
            .context("SERVER_PORT must be a port number")?;

        let is_live = parse_bool(&env::var("IS_LIVE").unwrap_or_else(|_| "false".to_string()))
            .context("IS_LIVE must be true or false")?;

        let gateway_base_url = env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| default_gateway_base_url(is_live).to_string());

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let cors_allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(raw) => parse_origins(&raw)?,
            Err(_) => vec![frontend_url.clone()],
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Config {
            server_port,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            store_id: env::var("STORE_ID").context("STORE_ID is required")?,
            store_passwd: env::var("STORE_PASS").context("STORE_PASS is required")?,
            is_live,
            gateway_base_url,
            gateway_timeout_secs: parse_timeout_secs(
                &env::var("GATEWAY_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string()),
            )?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            frontend_url,
            cors_allowed_origins,
            log_format,
        })
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

fn default_gateway_base_url(is_live: bool) -> &'static str {
    if is_live {
        LIVE_BASE_URL
    } else {
        SANDBOX_BASE_URL
    }
}

fn parse_timeout_secs(raw: &str) -> anyhow::Result<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .context("GATEWAY_TIMEOUT_SECS must be a number")?;
    if secs == 0 {
        anyhow::bail!("GATEWAY_TIMEOUT_SECS must be greater than 0");
    }
    Ok(secs)
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => anyhow::bail!("unrecognized boolean '{}'", other),
    }
}

fn parse_origins(raw: &str) -> anyhow::Result<Vec<String>> {
    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            url::Url::parse(entry)
                .with_context(|| format!("invalid origin '{}'", entry))
                .map(|_| entry.trim_end_matches('/').to_string())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS must be a comma-separated list of origins");
    }

    Ok(origins)
}
