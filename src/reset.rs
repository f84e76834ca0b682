/// Password reset by emailed code
///
/// Codes are short-lived numeric secrets stored hashed, one per email at
/// most. Requesting a reset never reveals whether the email is registered:
/// the response is identical either way, and the hashing work is done on
/// both paths. Completing a reset consumes the code, replaces the password,
/// and revokes every live refresh token for the account.
use crate::{
    account::AccountManager,
    clock::Clock,
    config::ServerConfig,
    db::models::ResetCodeRecord,
    error::{AuthError, AuthResult},
    mailer::Mailer,
    metrics,
    password::PasswordHasher,
    token::TokenManager,
    validation::{check_email, check_password_policy, normalize_email},
};
use chrono::Duration;
use rand::Rng;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Password reset manager service
pub struct PasswordResetManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    hasher: Arc<PasswordHasher>,
    accounts: Arc<AccountManager>,
    tokens: Arc<TokenManager>,
    mailer: Arc<Mailer>,
    clock: Arc<dyn Clock>,
}

impl PasswordResetManager {
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        hasher: Arc<PasswordHasher>,
        accounts: Arc<AccountManager>,
        tokens: Arc<TokenManager>,
        mailer: Arc<Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            config,
            hasher,
            accounts,
            tokens,
            mailer,
            clock,
        }
    }

    /// Accept a reset request. Always succeeds for a well-formed email; the
    /// caller learns nothing about whether an account exists. A code is
    /// generated and hashed on both paths so the work factor matches too.
    pub async fn request_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        if let Some(err) = check_email(&email) {
            return Err(AuthError::Validation(vec![err]));
        }

        metrics::RESET_REQUESTS_TOTAL.inc();

        match self.accounts.find_by_email(&email).await? {
            Some(account) if account.is_active => {
                let code = self.store_code(&email).await?;
                if let Err(e) = self
                    .mailer
                    .send_reset_code(
                        &account.email,
                        &account.name,
                        &code,
                        self.config.reset.code_ttl_minutes,
                    )
                    .await
                {
                    // The response must stay generic even when delivery fails
                    tracing::error!(account_id = %account.id, "failed to send reset code: {}", e);
                }
                tracing::info!(target: "audit", account_id = %account.id, "password reset requested");
            }
            _ => {
                let _ = self.hasher.hash(&generate_code(self.config.reset.code_length))?;
                tracing::info!(target: "security", "password reset requested for unknown or inactive email");
            }
        }

        Ok(())
    }

    /// Generate a fresh code and store its hash, replacing any code already
    /// on file for this email. One transaction, so a crash cannot leave two
    /// live codes or none where one was promised.
    async fn store_code(&self, email: &str) -> AuthResult<String> {
        let code = generate_code(self.config.reset.code_length);
        let code_hash = self.hasher.hash(&code)?;
        let now = self.clock.now();
        let expires_at = now + Duration::minutes(self.config.reset.code_ttl_minutes);

        let mut tx = self.db.begin().await.map_err(AuthError::Database)?;
        sqlx::query("DELETE FROM password_reset_codes WHERE email = ?1")
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(AuthError::Database)?;
        sqlx::query(
            "INSERT INTO password_reset_codes (email, code_hash, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(email)
        .bind(&code_hash)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(AuthError::Database)?;
        tx.commit().await.map_err(AuthError::Database)?;

        Ok(code)
    }

    /// Complete a reset: verify the code, apply the new password, consume
    /// the code, and revoke all refresh tokens for the account.
    ///
    /// Expiry is checked before the hash compare, so an expired code is
    /// reported as expired even when its digits are right. A digit mismatch
    /// leaves the stored code in place; only success consumes it.
    pub async fn confirm_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let email = normalize_email(email);
        let now = self.clock.now();

        let record = sqlx::query_as::<_, ResetCodeRecord>(
            "SELECT email, code_hash, created_at, expires_at
             FROM password_reset_codes WHERE email = ?1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await
        .map_err(AuthError::Database)?;

        let record = match record {
            Some(record) => record,
            None => return Err(AuthError::ResetCodeInvalidOrExpired),
        };

        if record.expires_at <= now {
            self.delete_code(&email).await?;
            return Err(AuthError::ResetCodeInvalidOrExpired);
        }

        if !self.hasher.verify(code, &record.code_hash) {
            tracing::warn!(target: "security", "reset attempted with wrong code");
            return Err(AuthError::ResetCodeInvalid);
        }

        let errors = check_password_policy(new_password);
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        // Account gone since the code was issued: report it like a dead code
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::ResetCodeInvalidOrExpired)?;

        self.accounts.set_password(&account.id, new_password).await?;
        self.delete_code(&email).await?;
        let revoked = self.tokens.revoke_all_for_account(&account.id, None).await?;

        metrics::RESETS_COMPLETED_TOTAL.inc();
        tracing::info!(
            target: "audit",
            account_id = %account.id,
            revoked_sessions = revoked,
            "password reset completed"
        );

        if let Err(e) = self
            .mailer
            .send_password_changed_notice(&account.email, &account.name)
            .await
        {
            tracing::error!(account_id = %account.id, "failed to send password change notice: {}", e);
        }

        Ok(())
    }

    async fn delete_code(&self, email: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = ?1")
            .bind(email)
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;
        Ok(())
    }

    /// Delete codes past their expiry
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_codes WHERE expires_at <= ?1")
            .bind(self.clock.now())
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(result.rows_affected())
    }
}

/// Uniform random numeric code of the configured length
fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect()
}
