/// Application context and dependency injection
use crate::{
    account::AccountManager,
    clock::{self, Clock},
    config::ServerConfig,
    db,
    error::AuthResult,
    mailer::Mailer,
    password::PasswordHasher,
    rate_limit::FixedWindowLimiter,
    reset::PasswordResetManager,
    token::TokenManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub tokens: Arc<TokenManager>,
    pub reset: Arc<PasswordResetManager>,
    pub rate_limiter: Arc<FixedWindowLimiter>,
    pub mailer: Arc<Mailer>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AuthResult<Self> {
        Self::with_clock(config, clock::system_clock()).await
    }

    /// Same as `new` but with an injected time source
    pub async fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize the database
        let db = db::create_pool(
            &config.database.path,
            db::DatabaseOptions {
                max_connections: config.database.max_connections,
                ..Default::default()
            },
        )
        .await?;
        db::init_schema(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        // Wire services; the hasher and token manager are shared by both the
        // account and reset managers
        let hasher = Arc::new(PasswordHasher::new(&config.hashing)?);
        let tokens = Arc::new(TokenManager::new(db.clone(), config.clone(), clock.clone()));
        let accounts = Arc::new(AccountManager::new(
            db.clone(),
            config.clone(),
            hasher.clone(),
            tokens.clone(),
            clock.clone(),
        )?);
        let mailer = Arc::new(Mailer::new(config.email.as_ref().cloned())?);
        let reset = Arc::new(PasswordResetManager::new(
            db.clone(),
            config.clone(),
            hasher,
            accounts.clone(),
            tokens.clone(),
            mailer.clone(),
            clock.clone(),
        ));
        let rate_limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit.clone(),
            clock.clone(),
        ));

        Ok(Self {
            config,
            db,
            accounts,
            tokens,
            reset,
            rate_limiter,
            mailer,
            clock,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
