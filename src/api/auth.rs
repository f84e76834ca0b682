/// Session endpoints: register, login, refresh, logout, me, and the
/// password-reset pair.
///
/// Tokens travel both ways: the response body carries the pair for
/// non-browser clients, and http-only cookies carry them for browsers. The
/// refresh cookie is path-scoped to this route group so it is never sent
/// anywhere else.
use crate::{
    account::{LoginRequest, RefreshRequest, RegisterRequest, SessionResponse},
    auth::{AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    context::AppContext,
    db::models::AccountView,
    error::{AuthError, AuthResult},
    metrics,
    rate_limit::{ClientIp, Scope},
    token::TokenPair,
    validation::validate_login,
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

/// Build session routes. Register, login, and forgot-password sit behind
/// their own fixed-window scopes; the rest are unmetered.
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    let register = Router::new()
        .route("/api/auth/register", post(self::register))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            crate::rate_limit::limit_register,
        ));

    let login = Router::new()
        .route("/api/auth/login", post(self::login))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            crate::rate_limit::limit_login,
        ));

    let forgot = Router::new()
        .route("/api/auth/forgot-password", post(forgot_password))
        .route_layer(middleware::from_fn_with_state(
            ctx,
            crate::rate_limit::limit_reset,
        ));

    Router::new()
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/reset-password", post(reset_password))
        .merge(register)
        .merge(login)
        .merge(forgot)
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    ClientIp(client_ip): ClientIp,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> AuthResult<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let account = ctx
        .accounts
        .create_account(&req.name, &req.email, &req.password)
        .await?;

    let pair = ctx
        .tokens
        .issue_pair(&account.id, &account.role, client_ip.as_deref())
        .await?;

    let jar = session_cookies(&ctx, jar, &pair);
    let body = SessionResponse {
        account: AccountView::from_account(&account)?,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    ClientIp(client_ip): ClientIp,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AuthResult<(CookieJar, Json<SessionResponse>)> {
    validate_login(&req.email, &req.password).map_err(AuthError::Validation)?;

    let (account, pair) = ctx
        .accounts
        .login(&req.email, &req.password, client_ip.as_deref())
        .await?;

    // Only failed attempts count against the login quota; the key must match
    // the one the middleware counted under
    ctx.rate_limiter
        .forgive(Scope::Login, client_ip.as_deref().unwrap_or("unknown"));

    let jar = session_cookies(&ctx, jar, &pair);
    let body = SessionResponse {
        account: AccountView::from_account(&account)?,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, Json(body)))
}

/// Refresh endpoint. Accepts the refresh token from the cookie or, for
/// non-browser clients, from the request body; rotates it either way.
async fn refresh(
    State(ctx): State<AppContext>,
    ClientIp(client_ip): ClientIp,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AuthResult<(CookieJar, Json<SessionResponse>)> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or(AuthError::RefreshTokenInvalid)?;

    let record = ctx.tokens.verify_refresh(&presented).await?;

    // The account behind the token must still be live
    let account = ctx
        .accounts
        .find_by_id(&record.account_id)
        .await?
        .ok_or(AuthError::RefreshTokenInvalid)?;
    if !account.is_active {
        return Err(AuthError::AccountInactive);
    }

    let pair = ctx
        .tokens
        .rotate_refresh(&presented, &account.id, &account.role, client_ip.as_deref())
        .await?;

    metrics::TOKEN_REFRESHES_TOTAL.inc();

    let jar = session_cookies(&ctx, jar, &pair);
    let body = SessionResponse {
        account: AccountView::from_account(&account)?,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((jar, Json(body)))
}

/// Logout endpoint: revokes the presented refresh token and clears cookies
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ClientIp(client_ip): ClientIp,
    jar: CookieJar,
) -> AuthResult<(CookieJar, Json<serde_json::Value>)> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        ctx.tokens
            .revoke_refresh(cookie.value(), client_ip.as_deref())
            .await?;
    }

    tracing::info!(target: "audit", account_id = %auth.account.id, "logout");

    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE, "/"))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE, "/api/auth"));

    Ok((jar, Json(serde_json::json!({ "success": true }))))
}

/// Current identity endpoint
async fn me(auth: AuthContext) -> Json<AccountView> {
    Json(auth.account)
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

/// Request a reset code. The response is the same whether or not the email
/// maps to an account.
async fn forgot_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.reset.request_reset(&req.email).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "If the email is registered, a reset code is on its way",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest {
    email: String,
    code: String,
    new_password: String,
}

/// Confirm a reset code and set the new password
async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<serde_json::Value>> {
    ctx.reset
        .confirm_reset(&req.email, &req.code, &req.new_password)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password reset. Sign in with the new password",
    })))
}

/// Set both session cookies from a freshly minted pair
fn session_cookies(ctx: &AppContext, jar: CookieJar, pair: &TokenPair) -> CookieJar {
    let access_max_age = time::Duration::minutes(ctx.config.jwt.access_ttl_minutes);
    let refresh_max_age = time::Duration::days(ctx.config.jwt.refresh_ttl_days);

    jar.add(session_cookie(
        ctx,
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        "/",
        access_max_age,
    ))
    .add(session_cookie(
        ctx,
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        "/api/auth",
        refresh_max_age,
    ))
}

fn session_cookie(
    ctx: &AppContext,
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: time::Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(ctx.config.service.is_production())
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path(path)
        .http_only(true)
        .build()
}
