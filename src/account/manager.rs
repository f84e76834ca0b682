/// Account manager implementation using runtime queries
///
/// Owns the accounts table: creation, the login state machine (attempt
/// counting and lockout), whitelisted updates, password changes, and
/// activation toggles. Lockout counting is a single UPDATE .. RETURNING so
/// concurrent failed attempts cannot both read a stale counter.
use crate::{
    account::{UpdateAccountRequest, UpdateOutcome},
    clock::Clock,
    config::ServerConfig,
    db::models::{Account, AccountView, Role},
    error::{AuthError, AuthResult},
    metrics,
    password::PasswordHasher,
    token::{TokenManager, TokenPair},
    validation::{check_email, normalize_email, validate_registration, FieldError},
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenManager>,
    clock: Arc<dyn Clock>,
    /// Verified against when the email is unknown, so rejection cost does
    /// not reveal whether an account exists
    dummy_hash: String,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        hasher: Arc<PasswordHasher>,
        tokens: Arc<TokenManager>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            db,
            config,
            hasher,
            tokens,
            clock,
            dummy_hash,
        })
    }

    /// Create a new account with the default user role
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Account> {
        validate_registration(name, email, password).map_err(AuthError::Validation)?;

        let email = normalize_email(email);
        if self.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(password)?;
        let id = Uuid::new_v4().to_string();
        let now = self.clock.now();

        sqlx::query(
            "INSERT INTO accounts (id, name, email, password_hash, role, is_active,
                                   email_verified, failed_login_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'user', TRUE, FALSE, 0, ?5, ?5)",
        )
        .bind(&id)
        .bind(name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            // Unique index on email catches the race the pre-check missed
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation())
            {
                AuthError::DuplicateEmail
            } else {
                AuthError::Database(e)
            }
        })?;

        metrics::REGISTRATIONS_TOTAL.inc();
        tracing::info!(target: "audit", account_id = %id, "account registered");

        self.get_account(&id).await
    }

    /// Authenticate an email/password pair and mint a token pair.
    ///
    /// Order of checks: active flag, lockout window, then the hash compare.
    /// Mismatches count toward lockout atomically; a match resets the
    /// counter, clears any stale lock, and stamps last_login_at.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<(Account, TokenPair)> {
        let email = normalize_email(email);
        let now = self.clock.now();

        let account = match self.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                // Unknown email costs the same as a wrong password
                let _ = self.hasher.verify(password, &self.dummy_hash);
                metrics::LOGIN_FAILURES_TOTAL.inc();
                tracing::warn!(target: "security", "login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Operational branch, checked before any credential comparison
        if !account.is_active {
            tracing::warn!(target: "security", account_id = %account.id, "login attempt on deactivated account");
            return Err(AuthError::AccountInactive);
        }

        if let Some(until) = account.locked_until {
            if until > now {
                metrics::LOGIN_FAILURES_TOTAL.inc();
                tracing::warn!(target: "security", account_id = %account.id, "login attempt while locked");
                return Err(AuthError::AccountLocked {
                    minutes_remaining: minutes_until(now, until),
                });
            }
        }

        if !self.hasher.verify(password, &account.password_hash) {
            let (attempts, locked_until) = self.record_failed_attempt(&account.id).await?;
            metrics::LOGIN_FAILURES_TOTAL.inc();

            if locked_until.filter(|until| *until > now).is_some() {
                metrics::ACCOUNT_LOCKOUTS_TOTAL.inc();
                tracing::warn!(
                    target: "security",
                    account_id = %account.id,
                    attempts,
                    "account locked after repeated login failures"
                );
            } else {
                tracing::warn!(target: "security", account_id = %account.id, attempts, "failed login attempt");
            }

            // Every mismatch gets the same generic answer, including the one
            // that set the lock; the locked state is reported from the next
            // attempt on.
            return Err(AuthError::InvalidCredentials);
        }

        sqlx::query(
            "UPDATE accounts
             SET failed_login_count = 0, locked_until = NULL, last_login_at = ?2, updated_at = ?2
             WHERE id = ?1",
        )
        .bind(&account.id)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        let pair = self
            .tokens
            .issue_pair(&account.id, &account.role, client_ip)
            .await?;

        metrics::LOGIN_SUCCESSES_TOTAL.inc();
        tracing::info!(target: "audit", account_id = %account.id, "login succeeded");

        let account = self.get_account(&account.id).await?;
        Ok((account, pair))
    }

    /// Count a failed attempt and lock when the threshold is reached, in one
    /// statement. The CASE also clears a lock whose window already elapsed.
    async fn record_failed_attempt(
        &self,
        account_id: &str,
    ) -> AuthResult<(i64, Option<DateTime<Utc>>)> {
        let now = self.clock.now();
        let lock_until = now + Duration::minutes(self.config.lockout.lockout_minutes);

        let row = sqlx::query(
            "UPDATE accounts
             SET failed_login_count = failed_login_count + 1,
                 locked_until = CASE WHEN failed_login_count + 1 >= ?2 THEN ?3 ELSE NULL END,
                 updated_at = ?4
             WHERE id = ?1
             RETURNING failed_login_count, locked_until",
        )
        .bind(account_id)
        .bind(self.config.lockout.max_attempts)
        .bind(lock_until)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok((
            row.try_get("failed_login_count")?,
            row.try_get("locked_until")?,
        ))
    }

    /// Fetch an account by id
    pub async fn get_account(&self, account_id: &str) -> AuthResult<Account> {
        self.find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("account".to_string()))
    }

    pub async fn find_by_id(&self, account_id: &str) -> AuthResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(account)
    }

    /// Lookup by normalized email. The only path that exposes the stored
    /// hash to a caller is this internal one.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(account)
    }

    pub async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Apply a partial update behind the role-dependent field whitelist.
    ///
    /// Admins may set name, email, role, is_active, and email_verified.
    /// Everyone else may set name and email. A non-admin submitting `role`
    /// is rejected outright; every other non-whitelisted field is dropped
    /// and reported back in `blocked_fields`.
    pub async fn update_account(
        &self,
        actor_role: Role,
        target_id: &str,
        update: UpdateAccountRequest,
    ) -> AuthResult<UpdateOutcome> {
        let target = self.get_account(target_id).await?;
        let admin = actor_role.is_admin();

        if update.role.is_some() && !admin {
            metrics::ESCALATION_ATTEMPTS_TOTAL.inc();
            tracing::warn!(
                target: "security",
                target_id = %target.id,
                "privilege escalation attempt: non-admin submitted role change"
            );
            return Err(AuthError::PrivilegeEscalation);
        }

        let mut blocked: Vec<String> = update.unknown.keys().cloned().collect();

        let name = update.name.as_deref().map(str::trim);
        if let Some(name) = name {
            let name_len = name.chars().count();
            if !(crate::validation::NAME_MIN_LEN..=crate::validation::NAME_MAX_LEN)
                .contains(&name_len)
            {
                return Err(AuthError::Validation(vec![FieldError {
                    field: "name".to_string(),
                    message: "Name length out of range".to_string(),
                }]));
            }
        }

        let email = match update.email.as_deref() {
            Some(raw) => {
                let normalized = normalize_email(raw);
                if let Some(err) = check_email(&normalized) {
                    return Err(AuthError::Validation(vec![err]));
                }
                if normalized != target.email && self.email_exists(&normalized).await? {
                    return Err(AuthError::DuplicateEmail);
                }
                Some(normalized)
            }
            None => None,
        };

        let role = match update.role.as_deref() {
            Some(raw) => {
                let role = Role::from_str(raw).map_err(|_| {
                    AuthError::Validation(vec![FieldError {
                        field: "role".to_string(),
                        message: format!("Unknown role: {}", raw),
                    }])
                })?;
                Some(role.as_str().to_string())
            }
            None => None,
        };

        let mut is_active = None;
        if update.is_active.is_some() {
            if admin {
                is_active = update.is_active;
            } else {
                blocked.push("isActive".to_string());
            }
        }

        let mut email_verified = None;
        if update.email_verified.is_some() {
            if admin {
                email_verified = update.email_verified;
            } else {
                blocked.push("emailVerified".to_string());
            }
        }

        sqlx::query(
            "UPDATE accounts SET
                 name = COALESCE(?2, name),
                 email = COALESCE(?3, email),
                 role = COALESCE(?4, role),
                 is_active = COALESCE(?5, is_active),
                 email_verified = COALESCE(?6, email_verified),
                 updated_at = ?7
             WHERE id = ?1",
        )
        .bind(&target.id)
        .bind(name)
        .bind(&email)
        .bind(&role)
        .bind(is_active)
        .bind(email_verified)
        .bind(self.clock.now())
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if let Some(ref new_role) = role {
            tracing::warn!(
                target: "audit",
                target_id = %target.id,
                new_role = %new_role,
                "role changed by administrator"
            );
        }
        if !blocked.is_empty() {
            blocked.sort();
            tracing::warn!(
                target: "security",
                target_id = %target.id,
                blocked = ?blocked,
                "update submitted non-whitelisted fields"
            );
        }

        let account = self.get_account(&target.id).await?;
        Ok(UpdateOutcome {
            account: AccountView::from_account(&account)?,
            blocked_fields: blocked,
        })
    }

    /// Replace the password hash and stamp password_changed_at in one
    /// statement; every access token issued before this moment dies with it.
    /// Fresh credentials also clear the failed-attempt counter and any lock.
    pub async fn set_password(&self, account_id: &str, new_password: &str) -> AuthResult<()> {
        let hash = self.hasher.hash(new_password)?;
        let now = self.clock.now();

        let result = sqlx::query(
            "UPDATE accounts
             SET password_hash = ?2, password_changed_at = ?3, updated_at = ?3,
                 failed_login_count = 0, locked_until = NULL
             WHERE id = ?1",
        )
        .bind(account_id)
        .bind(&hash)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("account".to_string()));
        }

        tracing::info!(target: "security", account_id = %account_id, "password changed");
        Ok(())
    }

    /// Soft delete / restore
    pub async fn set_active(&self, account_id: &str, active: bool) -> AuthResult<Account> {
        let result = sqlx::query(
            "UPDATE accounts SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(account_id)
        .bind(active)
        .bind(self.clock.now())
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("account".to_string()));
        }

        self.get_account(account_id).await
    }

    /// Page through accounts, oldest first
    pub async fn list_accounts(&self, limit: i64, offset: i64) -> AuthResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts ORDER BY created_at ASC, id ASC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(accounts)
    }

    pub async fn count_accounts(&self) -> AuthResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(row.try_get("count")?)
    }
}

fn minutes_until(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let seconds = (until - now).num_seconds().max(0);
    ((seconds + 59) / 60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test::ManualClock;
    use crate::db;

    async fn test_manager() -> (AccountManager, Arc<ManualClock>) {
        let pool = db::test_pool().await;
        let config = Arc::new(ServerConfig::for_tests());
        let clock = ManualClock::starting_at(Utc::now());
        let hasher = Arc::new(PasswordHasher::new(&config.hashing).unwrap());
        let tokens = Arc::new(TokenManager::new(
            pool.clone(),
            config.clone(),
            clock.clone(),
        ));
        let manager =
            AccountManager::new(pool, config, hasher, tokens, clock.clone()).unwrap();
        (manager, clock)
    }

    async fn register_alice(manager: &AccountManager) -> Account {
        manager
            .create_account("Alice", "alice@example.com", "Str0ng!Pass")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_account_normalizes_email_and_defaults() {
        let (manager, _clock) = test_manager().await;
        let account = manager
            .create_account("Alice", "  Alice@EXAMPLE.com ", "Str0ng!Pass")
            .await
            .unwrap();

        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.role, "user");
        assert!(account.is_active);
        assert!(!account.email_verified);
        assert_eq!(account.failed_login_count, 0);
        assert_ne!(account.password_hash, "Str0ng!Pass");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_even_with_different_case() {
        let (manager, _clock) = test_manager().await;
        register_alice(&manager).await;

        let err = manager
            .create_account("Other", "ALICE@example.com", "An0ther!Pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn weak_password_rejected_with_field_detail() {
        let (manager, _clock) = test_manager().await;
        match manager
            .create_account("Alice", "alice@example.com", "weak")
            .await
        {
            Err(AuthError::Validation(fields)) => {
                assert!(fields.iter().all(|f| f.field == "password"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn login_succeeds_and_stamps_last_login() {
        let (manager, _clock) = test_manager().await;
        register_alice(&manager).await;

        let (account, pair) = manager
            .login("alice@example.com", "Str0ng!Pass", Some("10.0.0.1"))
            .await
            .unwrap();
        assert!(account.last_login_at.is_some());
        assert_eq!(account.failed_login_count, 0);
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_report_identically() {
        let (manager, _clock) = test_manager().await;
        register_alice(&manager).await;

        let unknown = manager
            .login("nobody@example.com", "Str0ng!Pass", None)
            .await
            .unwrap_err();
        let mismatch = manager
            .login("alice@example.com", "Wr0ng!Pass", None)
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(mismatch, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), mismatch.to_string());
    }

    #[tokio::test]
    async fn inactive_account_rejected_before_credential_check() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;
        manager.set_active(&account.id, false).await.unwrap();

        // Right and wrong password get the same operational error
        let with_correct = manager
            .login("alice@example.com", "Str0ng!Pass", None)
            .await
            .unwrap_err();
        let with_wrong = manager
            .login("alice@example.com", "Wr0ng!Pass", None)
            .await
            .unwrap_err();
        assert!(matches!(with_correct, AuthError::AccountInactive));
        assert!(matches!(with_wrong, AuthError::AccountInactive));

        // Rejected attempts on an inactive account never count toward lockout
        let account = manager.get_account(&account.id).await.unwrap();
        assert_eq!(account.failed_login_count, 0);
    }

    #[tokio::test]
    async fn fifth_failure_locks_and_correct_password_stays_rejected() {
        let (manager, clock) = test_manager().await;
        let account = register_alice(&manager).await;

        // A fresh login works before any failures
        manager
            .login("alice@example.com", "Str0ng!Pass", None)
            .await
            .unwrap();

        // Five mismatches: generic rejection each time, even the fifth,
        // which silently sets the lock
        for _ in 0..5 {
            let err = manager
                .login("alice@example.com", "wrong", None)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let locked = manager.get_account(&account.id).await.unwrap();
        assert_eq!(locked.failed_login_count, 5);
        assert!(locked.locked_until.is_some());

        // The sixth attempt is the first to report the lock, with the
        // remaining minutes; a correct password changes nothing while locked
        let while_locked = manager
            .login("alice@example.com", "Str0ng!Pass", None)
            .await
            .unwrap_err();
        match while_locked {
            AuthError::AccountLocked { minutes_remaining } => {
                assert_eq!(minutes_remaining, 15);
            }
            other => panic!("expected lockout report on sixth attempt, got {:?}", other),
        }
        let still_locked = manager.get_account(&account.id).await.unwrap();
        assert_eq!(still_locked.failed_login_count, 5);

        // Past the window the correct password goes through again
        clock.advance(Duration::minutes(16));
        let (account, _pair) = manager
            .login("alice@example.com", "Str0ng!Pass", None)
            .await
            .unwrap();
        assert_eq!(account.failed_login_count, 0);
        assert!(account.locked_until.is_none());
    }

    #[tokio::test]
    async fn success_resets_counter_before_threshold() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;

        for _ in 0..3 {
            let _ = manager.login("alice@example.com", "wrong", None).await;
        }
        assert_eq!(
            manager
                .get_account(&account.id)
                .await
                .unwrap()
                .failed_login_count,
            3
        );

        manager
            .login("alice@example.com", "Str0ng!Pass", None)
            .await
            .unwrap();
        assert_eq!(
            manager
                .get_account(&account.id)
                .await
                .unwrap()
                .failed_login_count,
            0
        );

        // One more failure starts from zero, nowhere near a lock
        let err = manager
            .login("alice@example.com", "wrong", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(
            manager
                .get_account(&account.id)
                .await
                .unwrap()
                .failed_login_count,
            1
        );
    }

    #[tokio::test]
    async fn non_admin_update_applies_whitelist_and_reports_blocked() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;

        let mut request = UpdateAccountRequest {
            name: Some("Alice Cooper".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        request.unknown.insert(
            "password_hash".to_string(),
            serde_json::Value::String("sneaky".to_string()),
        );

        let outcome = manager
            .update_account(Role::User, &account.id, request)
            .await
            .unwrap();

        assert_eq!(outcome.account.name, "Alice Cooper");
        assert!(outcome.account.is_active); // not applied
        assert_eq!(outcome.blocked_fields, vec!["isActive", "password_hash"]);
    }

    #[tokio::test]
    async fn non_admin_role_change_is_escalation() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;

        let request = UpdateAccountRequest {
            role: Some("admin".to_string()),
            ..Default::default()
        };
        let err = manager
            .update_account(Role::User, &account.id, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PrivilegeEscalation));

        // Nothing was applied
        let account = manager.get_account(&account.id).await.unwrap();
        assert_eq!(account.role, "user");
    }

    #[tokio::test]
    async fn admin_update_may_set_role_and_flags() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;

        let request = UpdateAccountRequest {
            role: Some("admin".to_string()),
            is_active: Some(false),
            email_verified: Some(true),
            ..Default::default()
        };
        let outcome = manager
            .update_account(Role::Admin, &account.id, request)
            .await
            .unwrap();

        assert_eq!(outcome.account.role, Role::Admin);
        assert!(!outcome.account.is_active);
        assert!(outcome.account.email_verified);
        assert!(outcome.blocked_fields.is_empty());
    }

    #[tokio::test]
    async fn update_email_checks_format_and_uniqueness() {
        let (manager, _clock) = test_manager().await;
        let alice = register_alice(&manager).await;
        manager
            .create_account("Bob", "bob@example.com", "B0bs!Passw")
            .await
            .unwrap();

        let bad_format = UpdateAccountRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager
                .update_account(Role::User, &alice.id, bad_format)
                .await,
            Err(AuthError::Validation(_))
        ));

        let taken = UpdateAccountRequest {
            email: Some("BOB@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update_account(Role::User, &alice.id, taken).await,
            Err(AuthError::DuplicateEmail)
        ));

        // Re-submitting your own email is fine
        let own = UpdateAccountRequest {
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        assert!(manager.update_account(Role::User, &alice.id, own).await.is_ok());
    }

    #[tokio::test]
    async fn set_password_stamps_password_changed_at() {
        let (manager, _clock) = test_manager().await;
        let account = register_alice(&manager).await;
        assert!(account.password_changed_at.is_none());

        manager
            .set_password(&account.id, "N3w!Passwd")
            .await
            .unwrap();

        let account = manager.get_account(&account.id).await.unwrap();
        assert!(account.password_changed_at.is_some());

        manager
            .login("alice@example.com", "N3w!Passwd", None)
            .await
            .unwrap();
        assert!(matches!(
            manager
                .login("alice@example.com", "Str0ng!Pass", None)
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn listing_pages_oldest_first() {
        let (manager, _clock) = test_manager().await;
        for i in 0..5 {
            manager
                .create_account(
                    &format!("User {}", i),
                    &format!("user{}@example.com", i),
                    "Str0ng!Pass",
                )
                .await
                .unwrap();
        }

        assert_eq!(manager.count_accounts().await.unwrap(), 5);

        let first_page = manager.list_accounts(2, 0).await.unwrap();
        let second_page = manager.list_accounts(2, 2).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(second_page.len(), 2);
        assert_ne!(first_page[0].id, second_page[0].id);
    }
}
