use std::env;

use thiserror::Error;

/// Secret used when JWT_SECRET is absent. Development only.
const DEV_JWT_SECRET: &str = "flashdeck-dev-secret";

const DEFAULT_PORT: u16 = 8080;

/// Default ceiling on a single generation job's polling phase, in seconds.
const DEFAULT_GENERATION_DEADLINE_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub api_key: String,
    /// Upper bound on how long a generation request may poll the external
    /// service before aborting with a timeout.
    pub poll_deadline_secs: u64,
}

/// Process configuration, loaded once in main and passed into constructors.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub port: u16,
    pub security: SecurityConfig,
    pub assistant: AssistantSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let api_key = env::var("OPENAI_KEY").map_err(|_| ConfigError::Missing("OPENAI_KEY"))?;

        let environment = environment_from(env::var("ENVIRONMENT").ok().as_deref());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, falling back to the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let poll_deadline_secs = env::var("GENERATION_DEADLINE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_GENERATION_DEADLINE_SECS);

        Ok(Self {
            environment,
            database_url,
            port,
            security: SecurityConfig { jwt_secret },
            assistant: AssistantSettings {
                api_key,
                poll_deadline_secs,
            },
        })
    }
}

fn environment_from(value: Option<&str>) -> Environment {
    match value {
        Some("production") | Some("prod") => Environment::Production,
        _ => Environment::Development,
    }
}
