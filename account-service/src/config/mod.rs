use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub verification: VerificationConfig,
    /// `None` when SMTP is not configured; notifications are then only logged.
    pub smtp: Option<SmtpConfig>,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub name: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub issuer: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub code_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: Secret::new(String::new()),
            issuer: "account-service".to_string(),
            access_token_expiry_minutes: 10,
            refresh_token_expiry_days: 7,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_expiry_minutes: 15,
        }
    }
}

impl AccountConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let environment: Environment = get_env("ENVIRONMENT", Some("dev"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let config = AccountConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("account-service"))?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            database: DatabaseConfig {
                host: get_env("DB_HOST", Some("localhost"))?,
                port: parse_env("DB_PORT", "5432")?,
                user: get_env("DB_USER", None)?,
                password: Secret::new(get_env("DB_PASS", Some(""))?),
                name: get_env("DB_NAME", None)?,
                max_connections: parse_env("DB_MAX_CONNECTIONS", "10")?,
                min_connections: parse_env("DB_MIN_CONNECTIONS", "1")?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None)?),
                issuer: get_env("JWT_ISSUER", Some("account-service"))?,
                access_token_expiry_minutes: parse_env("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", "10")?,
                refresh_token_expiry_days: parse_env("JWT_REFRESH_TOKEN_EXPIRY_DAYS", "7")?,
            },
            verification: VerificationConfig {
                code_expiry_minutes: parse_env("VERIFICATION_CODE_EXPIRY_MINUTES", "15")?,
            },
            smtp: smtp_from_env()?,
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "APP__PORT must be greater than 0"
            )));
        }

        if self.jwt.secret.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.verification.code_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "VERIFICATION_CODE_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.smtp.is_none() {
                tracing::warn!("SMTP is not configured in production; verification codes will only be logged");
            }
        }

        Ok(())
    }
}

/// SMTP is considered configured only when both host and port are set.
fn smtp_from_env() -> Result<Option<SmtpConfig>, AppError> {
    let host = env::var("SMTP_HOST").unwrap_or_default();
    let port = env::var("SMTP_PORT").unwrap_or_default();
    if host.is_empty() || port.is_empty() {
        return Ok(None);
    }

    let port = port.parse().map_err(|e: std::num::ParseIntError| {
        AppError::ConfigError(anyhow::anyhow!("SMTP_PORT: {}", e))
    })?;
    let user = get_env("SMTP_USER", Some(""))?;
    let from_address = match env::var("SMTP_FROM") {
        Ok(from) if !from.is_empty() => from,
        _ => user.clone(),
    };

    Ok(Some(SmtpConfig {
        host,
        port,
        user,
        password: Secret::new(get_env("SMTP_PASS", Some(""))?),
        from_address,
    }))
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default))?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
