/// Background task implementations
use crate::{context::AppContext, error::AuthResult, metrics};

/// Delete refresh tokens past their expiry
pub async fn cleanup_expired_refresh_tokens(ctx: &AppContext) -> AuthResult<u64> {
    ctx.tokens.cleanup_expired().await
}

/// Delete password-reset codes past their expiry
pub async fn cleanup_expired_reset_codes(ctx: &AppContext) -> AuthResult<u64> {
    ctx.reset.cleanup_expired().await
}

/// Drop rate-limit windows whose span has elapsed
pub fn prune_rate_limit_windows(ctx: &AppContext) -> usize {
    ctx.rate_limiter.prune()
}

/// Refresh the account-count gauge
pub async fn refresh_account_stats(ctx: &AppContext) -> AuthResult<()> {
    let total = ctx.accounts.count_accounts().await?;
    metrics::ACCOUNTS_TOTAL.set(total);
    Ok(())
}

/// Health check - verify the store answers
pub async fn health_check(ctx: &AppContext) -> AuthResult<()> {
    crate::db::test_connection(&ctx.db).await
}
