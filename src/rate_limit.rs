/// Fixed-window rate limiting
///
/// One counter per (scope, client) pair. A window opens on the first request
/// and admits up to the scope's quota until it is older than the scope's
/// span, at which point the next request starts a fresh window. Counters are
/// checked and bumped under one lock, so concurrent requests cannot both
/// claim the last slot.
use crate::{
    clock::Clock,
    config::RateLimitConfig,
    context::AppContext,
    error::{AuthError, AuthResult},
    metrics,
};
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Endpoint families with independent quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Login,
    Register,
    ResetRequest,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Login => "login",
            Scope::Register => "register",
            Scope::ResetRequest => "reset_request",
        }
    }
}

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Outcome of an admitted request, surfaced as RateLimit-* headers
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: std::time::Duration,
}

/// Fixed-window limiter over (scope, client key)
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<(Scope, String), Window>>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn quota(&self, scope: Scope) -> (u32, u64) {
        match scope {
            Scope::Login => (self.config.login_max, self.config.login_window_secs),
            Scope::Register => (self.config.register_max, self.config.register_window_secs),
            Scope::ResetRequest => (self.config.reset_max, self.config.reset_window_secs),
        }
    }

    /// Admit or reject one request. Admission consumes a slot.
    pub fn check(&self, scope: Scope, key: &str) -> AuthResult<RateLimitStatus> {
        let (limit, window_secs) = self.quota(scope);
        if !self.config.enabled {
            return Ok(RateLimitStatus {
                limit,
                remaining: limit,
                reset_after: std::time::Duration::ZERO,
            });
        }

        let now = self.clock.now();
        let span = Duration::seconds(window_secs as i64);

        let mut windows = self
            .windows
            .lock()
            .map_err(|_| AuthError::Internal("rate limiter lock poisoned".to_string()))?;

        let window = windows
            .entry((scope, key.to_string()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now - window.started_at >= span {
            window.started_at = now;
            window.count = 0;
        }

        let reset_after = (window.started_at + span - now).to_std().unwrap_or_default();

        if window.count >= limit {
            metrics::record_rate_limit_rejection(scope.as_str());
            tracing::warn!(
                target: "security",
                scope = scope.as_str(),
                key = %key,
                "rate limit exceeded"
            );
            return Err(AuthError::RateLimited {
                retry_after: reset_after,
                limit,
            });
        }

        window.count += 1;
        Ok(RateLimitStatus {
            limit,
            remaining: limit - window.count,
            reset_after,
        })
    }

    /// Hand back one slot. Login calls this on success so only failures
    /// count against the quota.
    pub fn forgive(&self, scope: Scope, key: &str) {
        if !self.config.enabled {
            return;
        }
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(_) => return,
        };
        if let Some(window) = windows.get_mut(&(scope, key.to_string())) {
            if window.count > 0 {
                window.count -= 1;
            }
        }
    }

    /// Drop windows whose span has fully elapsed. Returns how many were
    /// removed; called periodically so idle clients do not accumulate.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(_) => return 0,
        };
        let before = windows.len();
        windows.retain(|key, window| {
            let (scope, _) = key;
            let (_, window_secs) = self.quota(*scope);
            now - window.started_at < Duration::seconds(window_secs as i64)
        });
        before - windows.len()
    }
}

/// Best-effort client key: proxy headers first, then the socket address
pub fn client_ip(headers: &HeaderMap, extensions: &axum::http::Extensions) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
}

/// Extractor form of [`client_ip`] for handlers that log or forgive by key
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Rate limiting middleware, one per scoped route group
pub async fn limit_login(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    run_scoped(ctx, Scope::Login, req, next).await
}

pub async fn limit_register(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    run_scoped(ctx, Scope::Register, req, next).await
}

pub async fn limit_reset(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    run_scoped(ctx, Scope::ResetRequest, req, next).await
}

async fn run_scoped(
    ctx: AppContext,
    scope: Scope,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = client_ip(req.headers(), req.extensions()).unwrap_or_else(|| "unknown".to_string());
    let status = ctx.rate_limiter.check(scope, &key)?;

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("RateLimit-Limit", HeaderValue::from(status.limit));
    headers.insert("RateLimit-Remaining", HeaderValue::from(status.remaining));
    headers.insert(
        "RateLimit-Reset",
        HeaderValue::from(status.reset_after.as_secs()),
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test::ManualClock;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            login_max: 5,
            login_window_secs: 900,
            register_max: 3,
            register_window_secs: 3600,
            reset_max: 3,
            reset_window_secs: 3600,
        }
    }

    fn limiter() -> (FixedWindowLimiter, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Utc::now());
        (FixedWindowLimiter::new(test_config(), clock.clone()), clock)
    }

    #[test]
    fn admits_up_to_the_quota_then_rejects() {
        let (limiter, _clock) = limiter();

        for expected_remaining in (0..5).rev() {
            let status = limiter.check(Scope::Login, "10.0.0.1").unwrap();
            assert_eq!(status.limit, 5);
            assert_eq!(status.remaining, expected_remaining);
        }

        match limiter.check(Scope::Login, "10.0.0.1") {
            Err(AuthError::RateLimited { retry_after, limit }) => {
                assert_eq!(limit, 5);
                assert!(retry_after.as_secs() <= 900);
            }
            other => panic!("expected rate limit rejection, got {:?}", other),
        }
    }

    #[test]
    fn window_expiry_restores_the_full_quota() {
        let (limiter, clock) = limiter();

        for _ in 0..5 {
            limiter.check(Scope::Login, "10.0.0.1").unwrap();
        }
        assert!(limiter.check(Scope::Login, "10.0.0.1").is_err());

        clock.advance(Duration::seconds(901));
        let status = limiter.check(Scope::Login, "10.0.0.1").unwrap();
        assert_eq!(status.remaining, 4);
    }

    #[test]
    fn clients_and_scopes_count_independently() {
        let (limiter, _clock) = limiter();

        for _ in 0..5 {
            limiter.check(Scope::Login, "10.0.0.1").unwrap();
        }
        assert!(limiter.check(Scope::Login, "10.0.0.1").is_err());

        // Another client is unaffected
        assert!(limiter.check(Scope::Login, "10.0.0.2").is_ok());
        // Same client, another scope is unaffected
        assert!(limiter.check(Scope::Register, "10.0.0.1").is_ok());
    }

    #[test]
    fn forgiveness_hands_back_exactly_one_slot() {
        let (limiter, _clock) = limiter();

        for _ in 0..5 {
            limiter.check(Scope::Login, "10.0.0.1").unwrap();
        }
        limiter.forgive(Scope::Login, "10.0.0.1");

        assert!(limiter.check(Scope::Login, "10.0.0.1").is_ok());
        assert!(limiter.check(Scope::Login, "10.0.0.1").is_err());
    }

    #[test]
    fn disabled_limiter_admits_everything() {
        let clock = ManualClock::starting_at(Utc::now());
        let mut config = test_config();
        config.enabled = false;
        let limiter = FixedWindowLimiter::new(config, clock);

        for _ in 0..100 {
            assert!(limiter.check(Scope::Login, "10.0.0.1").is_ok());
        }
    }

    #[test]
    fn prune_drops_only_elapsed_windows() {
        let (limiter, clock) = limiter();

        limiter.check(Scope::Login, "10.0.0.1").unwrap();
        clock.advance(Duration::seconds(850));
        limiter.check(Scope::Login, "10.0.0.2").unwrap();

        clock.advance(Duration::seconds(100)); // first window 950s old, second 100s
        assert_eq!(limiter.prune(), 1);
        assert_eq!(limiter.prune(), 0);
    }

    #[test]
    fn client_ip_prefers_proxy_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        let extensions = axum::http::Extensions::new();
        assert_eq!(
            client_ip(&headers, &extensions),
            Some("1.2.3.4".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(
            client_ip(&headers, &extensions),
            Some("9.9.9.9".to_string())
        );

        let mut extensions = axum::http::Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 8080))));
        assert_eq!(
            client_ip(&HeaderMap::new(), &extensions),
            Some("127.0.0.1".to_string())
        );

        assert_eq!(client_ip(&HeaderMap::new(), &axum::http::Extensions::new()), None);
    }
}
