/// Token issuance and verification
///
/// Access tokens are stateless HS256 JWTs checked by signature and clock.
/// Refresh tokens are opaque CSPRNG strings stored server-side so they can be
/// rotated and revoked individually. Issuance and verification never mutate
/// account state; rotation and revocation touch only the refresh-token table.
use crate::{
    clock::Clock,
    config::ServerConfig,
    db::models::RefreshTokenRecord,
    error::{AuthError, AuthResult},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

/// CSPRNG bytes per refresh token; hex-encoded to twice this length
const REFRESH_TOKEN_BYTES: usize = 40;

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Access + refresh pair minted on login, register, and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Token manager service
pub struct TokenManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt.secret.as_bytes());
        Self {
            db,
            config,
            clock,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a short-lived access token for an account
    pub fn issue_access(&self, account_id: &str, role: &str) -> AuthResult<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: account_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.jwt.access_ttl_minutes)).timestamp(),
            iss: self.config.jwt.issuer.clone(),
            aud: self.config.jwt.audience.clone(),
            token_type: "access".to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Jwt(format!("Failed to sign access token: {}", e)))
    }

    /// Verify signature, issuer, audience, and expiry of an access token.
    /// No claim is trusted before the signature check passes. Expiry is
    /// compared against the injected clock, not the library's system time.
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt.issuer]);
        validation.set_audience(&[&self.config.jwt.audience]);
        validation.validate_exp = false;

        let data =
            decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid,
                }
            })?;

        let claims = data.claims;
        if claims.token_type != "access" {
            return Err(AuthError::TokenInvalid);
        }
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Generate and store an opaque refresh token
    pub async fn issue_refresh(
        &self,
        account_id: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let now = self.clock.now();
        let expires_at = now + Duration::days(self.config.jwt.refresh_ttl_days);

        sqlx::query(
            "INSERT INTO refresh_tokens (token, account_id, created_at, expires_at, created_by_ip)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&token)
        .bind(account_id)
        .bind(now)
        .bind(expires_at)
        .bind(client_ip)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok((token, expires_at))
    }

    /// Mint an access + refresh pair
    pub async fn issue_pair(
        &self,
        account_id: &str,
        role: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let access_token = self.issue_access(account_id, role)?;
        let (refresh_token, refresh_expires_at) = self.issue_refresh(account_id, client_ip).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Look up a refresh token and require it to be usable
    pub async fn verify_refresh(&self, token: &str) -> AuthResult<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token, account_id, created_at, expires_at, created_by_ip,
                    revoked_at, revoked_by_ip, replaced_by
             FROM refresh_tokens WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(AuthError::Database)?;

        match record {
            Some(record) if record.is_usable(self.clock.now()) => Ok(record),
            _ => Err(AuthError::RefreshTokenInvalid),
        }
    }

    /// Rotate a refresh token: revoke the old one, record the replacement,
    /// and mint a new pair. The revocation predicate is the claim: when two
    /// requests race on the same token, only one UPDATE matches and the other
    /// caller gets `RefreshTokenInvalid`.
    pub async fn rotate_refresh(
        &self,
        old_token: &str,
        account_id: &str,
        role: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let pair = self.issue_pair(account_id, role, client_ip).await?;

        let claimed = sqlx::query(
            "UPDATE refresh_tokens
             SET revoked_at = ?2, revoked_by_ip = ?3, replaced_by = ?4
             WHERE token = ?1 AND revoked_at IS NULL AND expires_at > ?5",
        )
        .bind(old_token)
        .bind(now)
        .bind(client_ip)
        .bind(&pair.refresh_token)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if claimed.rows_affected() == 0 {
            // Lost the race or the token was already dead; drop the new token
            sqlx::query("DELETE FROM refresh_tokens WHERE token = ?1")
                .bind(&pair.refresh_token)
                .execute(&self.db)
                .await
                .map_err(AuthError::Database)?;
            return Err(AuthError::RefreshTokenInvalid);
        }

        Ok(pair)
    }

    /// Revoke a single refresh token. Idempotent: revoking an unknown or
    /// already-revoked token is not an error.
    pub async fn revoke_refresh(&self, token: &str, client_ip: Option<&str>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?2, revoked_by_ip = ?3
             WHERE token = ?1 AND revoked_at IS NULL",
        )
        .bind(token)
        .bind(self.clock.now())
        .bind(client_ip)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    /// Revoke every live refresh token for an account (password change,
    /// deactivation). Returns the number of tokens revoked.
    pub async fn revoke_all_for_account(
        &self,
        account_id: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ?2, revoked_by_ip = ?3
             WHERE account_id = ?1 AND revoked_at IS NULL",
        )
        .bind(account_id)
        .bind(self.clock.now())
        .bind(client_ip)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(result.rows_affected())
    }

    /// Delete refresh tokens past their expiry. Revoked rows are kept until
    /// expiry so the rotation chain stays inspectable.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?1")
            .bind(self.clock.now())
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test::ManualClock;
    use crate::db;

    async fn seed_account(pool: &SqlitePool, id: &str) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO accounts (id, name, email, password_hash, role, is_active,
                                   email_verified, failed_login_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'x', 'user', TRUE, FALSE, 0, ?4, ?4)",
        )
        .bind(id)
        .bind(format!("Account {}", id))
        .bind(format!("{}@example.com", id))
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn manager_with_clock() -> (TokenManager, Arc<ManualClock>) {
        let pool = db::test_pool().await;
        seed_account(&pool, "acct-1").await;
        let clock = ManualClock::starting_at(Utc::now());
        let manager = TokenManager::new(
            pool,
            Arc::new(crate::config::ServerConfig::for_tests()),
            clock.clone(),
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn access_token_round_trip() {
        let (manager, _clock) = manager_with_clock().await;
        let token = manager.issue_access("acct-1", "user").unwrap();
        let claims = manager.verify_access(&token).unwrap();
        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.token_type, "access");
    }

    #[tokio::test]
    async fn access_token_expires_on_the_injected_clock() {
        let (manager, clock) = manager_with_clock().await;
        let ttl = Duration::minutes(30);

        let token = manager.issue_access("acct-1", "user").unwrap();

        // One second before expiry: still valid
        clock.advance(ttl - Duration::seconds(1));
        assert!(manager.verify_access(&token).is_ok());

        // Two seconds later (one past expiry): rejected as expired
        clock.advance(Duration::seconds(2));
        match manager.verify_access(&token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[tokio::test]
    async fn tampered_token_is_invalid_not_expired() {
        let (manager, _clock) = manager_with_clock().await;
        let token = manager.issue_access("acct-1", "user").unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(matches!(
            manager.verify_access(&tampered),
            Err(AuthError::TokenInvalid)
        ));

        assert!(matches!(
            manager.verify_access("not.a.jwt"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn foreign_issuer_rejected() {
        let (manager, clock) = manager_with_clock().await;

        // Same secret, wrong issuer: signature checks out, claims do not
        let mut other_config = crate::config::ServerConfig::for_tests();
        other_config.jwt.issuer = "someone-else".to_string();
        let other = TokenManager::new(
            db::test_pool().await,
            Arc::new(other_config),
            clock.clone(),
        );

        let token = other.issue_access("acct-1", "user").unwrap();
        assert!(matches!(
            manager.verify_access(&token),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn refresh_token_has_expected_entropy_encoding() {
        let (manager, _clock) = manager_with_clock().await;
        let (token, _expires) = manager.issue_refresh("acct-1", Some("10.0.0.1")).await.unwrap();
        assert_eq!(token.len(), REFRESH_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let record = manager.verify_refresh(&token).await.unwrap();
        assert_eq!(record.account_id, "acct-1");
        assert_eq!(record.created_by_ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn rotation_revokes_the_old_token_exactly_once() {
        let (manager, _clock) = manager_with_clock().await;
        let (old_token, _) = manager.issue_refresh("acct-1", None).await.unwrap();

        let pair = manager
            .rotate_refresh(&old_token, "acct-1", "user", Some("10.0.0.2"))
            .await
            .unwrap();
        assert_ne!(pair.refresh_token, old_token);

        // Old token is dead and cannot be rotated again
        assert!(matches!(
            manager.verify_refresh(&old_token).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        assert!(matches!(
            manager
                .rotate_refresh(&old_token, "acct-1", "user", None)
                .await,
            Err(AuthError::RefreshTokenInvalid)
        ));

        // Replacement is live and chained to the old one
        let old_record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token, account_id, created_at, expires_at, created_by_ip,
                    revoked_at, revoked_by_ip, replaced_by
             FROM refresh_tokens WHERE token = ?1",
        )
        .bind(&old_token)
        .fetch_one(&manager.db)
        .await
        .unwrap();
        assert_eq!(old_record.replaced_by.as_deref(), Some(pair.refresh_token.as_str()));
        assert_eq!(old_record.revoked_by_ip.as_deref(), Some("10.0.0.2"));
        assert!(manager.verify_refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_refresh_token_unusable() {
        let (manager, clock) = manager_with_clock().await;
        let (token, _) = manager.issue_refresh("acct-1", None).await.unwrap();

        clock.advance(Duration::days(8));
        assert!(matches!(
            manager.verify_refresh(&token).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[tokio::test]
    async fn revocation_is_idempotent_and_scoped() {
        let (manager, _clock) = manager_with_clock().await;
        let (t1, _) = manager.issue_refresh("acct-1", None).await.unwrap();
        let (t2, _) = manager.issue_refresh("acct-1", None).await.unwrap();

        manager.revoke_refresh(&t1, None).await.unwrap();
        manager.revoke_refresh(&t1, None).await.unwrap(); // second call is a no-op
        assert!(manager.verify_refresh(&t1).await.is_err());
        assert!(manager.verify_refresh(&t2).await.is_ok());

        let revoked = manager.revoke_all_for_account("acct-1", None).await.unwrap();
        assert_eq!(revoked, 1); // t1 already revoked, only t2 remained live
        assert!(manager.verify_refresh(&t2).await.is_err());
    }

    #[tokio::test]
    async fn cleanup_deletes_only_expired_rows() {
        let (manager, clock) = manager_with_clock().await;
        let (old, _) = manager.issue_refresh("acct-1", None).await.unwrap();

        clock.advance(Duration::days(5));
        let (fresh, _) = manager.issue_refresh("acct-1", None).await.unwrap();

        clock.advance(Duration::days(3)); // old is 8 days, fresh is 3 days
        let deleted = manager.cleanup_expired().await.unwrap();
        assert_eq!(deleted, 1);

        assert!(manager.verify_refresh(&old).await.is_err());
        assert!(manager.verify_refresh(&fresh).await.is_ok());
    }
}
