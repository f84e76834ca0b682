/// Palisade - Username & Password Authentication Service
///
/// A Rust implementation of a credential authentication backend, providing
/// account registration, session issuance and password recovery over HTTP.

mod account;
mod api;
mod auth;
mod clock;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod mailer;
mod metrics;
mod password;
mod rate_limit;
mod reset;
mod server;
mod token;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::AuthResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AuthResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palisade=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = std::sync::Arc::new(ctx);

    // Start background jobs
    let scheduler = std::sync::Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____        ___                  __
   / __ \____ _/ (_)________ ______/ /__
  / /_/ / __ `/ / / ___/ __ `/ __  / _ \
 / ____/ /_/ / / (__  ) /_/ / /_/ /  __/
/_/    \__,_/_/_/____/\__,_/\__,_/\___/

        Username & Password Authentication v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
