/// API routes and handlers
pub mod auth;
pub mod health;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes. The context is needed up front so the sensitive
/// session endpoints can carry their scoped rate-limit layers.
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .merge(auth::routes(ctx))
        .merge(users::routes())
        .merge(health::routes())
}
