/// Authentication extractors and access-control helpers
use crate::{
    context::AppContext,
    db::models::{AccountView, Role},
    error::AuthError,
    metrics,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

/// Cookie carrying the access token for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token for browser clients
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
}

/// Access token from the Authorization header, falling back to the cookie.
/// The header wins when both are present.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}

/// Authenticated context: verifies the access token and re-checks the
/// account it names on every request. A verified signature is not enough;
/// the account must still exist, still be active, and must not have changed
/// its password since the token was issued.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: AccountView,
    pub role: Role,
    pub issued_at: i64,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers).ok_or(AuthError::TokenMissing)?;

        let claims = state.tokens.verify_access(&token)?;

        // A token naming a deleted account is just an invalid token
        let account = match state.accounts.find_by_id(&claims.sub).await? {
            Some(account) => account,
            None => return Err(AuthError::TokenInvalid),
        };

        if !account.is_active {
            return Err(AuthError::AccountInactive);
        }

        // Password changes invalidate every token issued before them
        if let Some(changed_at) = account.password_changed_at {
            if claims.iat < changed_at.timestamp() {
                tracing::warn!(
                    target: "security",
                    account_id = %account.id,
                    "token issued before password change rejected"
                );
                return Err(AuthError::TokenInvalid);
            }
        }

        // The database role is authoritative, not the one baked into claims
        let role = account.role()?;
        let account = AccountView::from_account(&account)?;

        Ok(AuthContext {
            account,
            role,
            issued_at: claims.iat,
        })
    }
}

/// Admin-only context: an `AuthContext` whose role is admin
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub auth: AuthContext,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if !auth.role.is_admin() {
            tracing::warn!(
                target: "security",
                account_id = %auth.account.id,
                role = auth.role.as_str(),
                "admin route denied"
            );
            return Err(AuthError::Forbidden {
                required: vec![Role::Admin.as_str().to_string()],
                actual: auth.role.as_str().to_string(),
            });
        }

        Ok(AdminContext { auth })
    }
}

/// Owner-or-admin check for per-account resources. Admins pass with an audit
/// trail; everyone else must be the target account.
pub fn ensure_owner_or_admin(auth: &AuthContext, target_id: &str) -> Result<(), AuthError> {
    if auth.role.is_admin() {
        if auth.account.id != target_id {
            tracing::info!(
                target: "audit",
                admin_id = %auth.account.id,
                target_id = %target_id,
                "admin accessed another account"
            );
        }
        return Ok(());
    }

    if auth.account.id != target_id {
        metrics::IDOR_ATTEMPTS_TOTAL.inc();
        tracing::warn!(
            target: "security",
            account_id = %auth.account.id,
            target_id = %target_id,
            "cross-account access denied"
        );
        return Err(AuthError::OwnershipViolation);
    }

    Ok(())
}
