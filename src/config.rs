/// Configuration management for the Palisade auth service
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub lockout: LockoutConfig,
    pub reset: ResetConfig,
    pub rate_limit: RateLimitConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// "development" or "production"; controls cookie Secure flag
    pub environment: String,
}

impl ServiceConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Access and refresh token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Login lockout thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    pub max_attempts: i64,
    pub lockout_minutes: i64,
}

/// Password-reset code configuration
///
/// Code length and TTL are a security pair: the short numeric code is only
/// safe while the window stays short and the reset endpoint stays limited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    pub code_length: usize,
    pub code_ttl_minutes: i64,
}

/// Fixed-window rate limits for the sensitive endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub login_max: u32,
    pub login_window_secs: u64,
    pub register_max: u32,
    pub register_window_secs: u64,
    pub reset_max: u32,
    pub reset_window_secs: u64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("AUTH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("AUTH_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| AuthError::Config("Invalid port number".to_string()))?;
        let version = env::var("AUTH_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let environment =
            env::var("AUTH_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let database_path: PathBuf = env::var("AUTH_DATABASE_PATH")
            .unwrap_or_else(|_| "./data/palisade.sqlite".to_string())
            .into();
        let max_connections = env::var("AUTH_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("AUTH_JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT secret required".to_string()))?;
        let jwt_issuer = env::var("AUTH_JWT_ISSUER").unwrap_or_else(|_| "palisade".to_string());
        let jwt_audience = env::var("AUTH_JWT_AUDIENCE").unwrap_or_else(|_| "web-app".to_string());
        let access_ttl_minutes = env::var("AUTH_ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let refresh_ttl_days = env::var("AUTH_REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let memory_kib = env::var("AUTH_ARGON2_MEMORY_KIB")
            .unwrap_or_else(|_| "19456".to_string())
            .parse()
            .unwrap_or(19456);
        let iterations = env::var("AUTH_ARGON2_ITERATIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);
        let parallelism = env::var("AUTH_ARGON2_PARALLELISM")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let max_attempts = env::var("AUTH_LOCKOUT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let lockout_minutes = env::var("AUTH_LOCKOUT_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let code_length = env::var("AUTH_RESET_CODE_LENGTH")
            .unwrap_or_else(|_| "6".to_string())
            .parse()
            .unwrap_or(6);
        let code_ttl_minutes = env::var("AUTH_RESET_CODE_TTL_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let rate_limit_enabled = env::var("AUTH_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let login_max = env::var("AUTH_RATE_LIMIT_LOGIN_MAX")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let login_window_secs = env::var("AUTH_RATE_LIMIT_LOGIN_WINDOW_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .unwrap_or(900);
        let register_max = env::var("AUTH_RATE_LIMIT_REGISTER_MAX")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);
        let register_window_secs = env::var("AUTH_RATE_LIMIT_REGISTER_WINDOW_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let reset_max = env::var("AUTH_RATE_LIMIT_RESET_MAX")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);
        let reset_window_secs = env::var("AUTH_RATE_LIMIT_RESET_WINDOW_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let email = if let Ok(smtp_url) = env::var("AUTH_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("AUTH_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                environment,
            },
            database: DatabaseConfig {
                path: database_path,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: jwt_issuer,
                audience: jwt_audience,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            hashing: HashingConfig {
                memory_kib,
                iterations,
                parallelism,
            },
            lockout: LockoutConfig {
                max_attempts,
                lockout_minutes,
            },
            reset: ResetConfig {
                code_length,
                code_ttl_minutes,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                login_max,
                login_window_secs,
                register_max,
                register_window_secs,
                reset_max,
                reset_window_secs,
            },
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AuthError::Config("Hostname cannot be empty".to_string()));
        }

        if self.jwt.secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.jwt.access_ttl_minutes < 1 || self.jwt.refresh_ttl_days < 1 {
            return Err(AuthError::Config(
                "Token TTLs must be at least one unit".to_string(),
            ));
        }

        if self.lockout.max_attempts < 1 || self.lockout.lockout_minutes < 1 {
            return Err(AuthError::Config(
                "Lockout thresholds must be positive".to_string(),
            ));
        }

        if !(4..=10).contains(&self.reset.code_length) {
            return Err(AuthError::Config(
                "Reset code length must be between 4 and 10 digits".to_string(),
            ));
        }

        // A numeric code under 8 digits only holds up inside a short window
        if self.reset.code_ttl_minutes > 60 && self.reset.code_length < 8 {
            return Err(AuthError::Config(
                "Reset code TTL above 60 minutes requires at least 8 digits".to_string(),
            ));
        }

        if self.hashing.memory_kib < 1024 || self.hashing.iterations < 1 {
            return Err(AuthError::Config(
                "Argon2 parameters below safe minimums".to_string(),
            ));
        }

        Ok(())
    }

    /// Config for tests: in-memory database, low hashing cost, fixed secret
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 0,
                version: "test".to_string(),
                environment: "development".to_string(),
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret-test-secret-test-secret!".to_string(),
                issuer: "palisade".to_string(),
                audience: "web-app".to_string(),
                access_ttl_minutes: 30,
                refresh_ttl_days: 7,
            },
            hashing: HashingConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            lockout: LockoutConfig {
                max_attempts: 5,
                lockout_minutes: 15,
            },
            reset: ResetConfig {
                code_length: 6,
                code_ttl_minutes: 15,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                login_max: 5,
                login_window_secs: 900,
                register_max: 3,
                register_window_secs: 3600,
                reset_max: 3,
                reset_window_secs: 3600,
            },
            email: None,
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_passes_validation() {
        ServerConfig::for_tests().validate().unwrap();
    }

    #[test]
    fn short_jwt_secret_rejected() {
        let mut config = ServerConfig::for_tests();
        config.jwt.secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn long_ttl_with_short_code_rejected() {
        let mut config = ServerConfig::for_tests();
        config.reset.code_ttl_minutes = 120;
        assert!(config.validate().is_err());

        config.reset.code_length = 8;
        assert!(config.validate().is_ok());
    }
}
