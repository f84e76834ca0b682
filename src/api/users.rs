/// Account endpoints
///
/// Reads and updates on a single account run behind the owner-or-admin
/// check; listing, deactivation, and reactivation are admin-only. Updates
/// pass through the role-dependent field whitelist in the account manager.
use crate::{
    account::{AccountPage, UpdateAccountRequest, UpdateOutcome},
    auth::{ensure_owner_or_admin, AdminContext, AuthContext},
    context::AppContext,
    db::models::AccountView,
    error::{AuthError, AuthResult},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users/count", get(count))
        .route("/api/users", get(list))
        .route("/api/users/:id", get(get_one).put(update).delete(deactivate))
        .route("/api/users/:id/activate", post(activate))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    total_users: i64,
}

/// Public registration counter
async fn count(State(ctx): State<AppContext>) -> AuthResult<Json<CountResponse>> {
    let total_users = ctx.accounts.count_accounts().await?;
    Ok(Json(CountResponse { total_users }))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<i64>,
    limit: Option<i64>,
}

/// Admin-only paged listing
async fn list(
    State(ctx): State<AppContext>,
    admin: AdminContext,
    Query(params): Query<ListParams>,
) -> AuthResult<Json<AccountPage>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let accounts = ctx.accounts.list_accounts(limit, offset).await?;
    let total = ctx.accounts.count_accounts().await?;

    let accounts = accounts
        .iter()
        .map(AccountView::from_account)
        .collect::<AuthResult<Vec<_>>>()?;

    tracing::info!(
        target: "audit",
        admin_id = %admin.auth.account.id,
        page,
        "admin listed accounts"
    );

    Ok(Json(AccountPage {
        accounts,
        page,
        limit,
        total,
        total_pages: (total + limit - 1) / limit,
    }))
}

/// Fetch one account. Ownership is checked before existence so a non-admin
/// probing foreign ids always sees 403, never a 404 oracle.
async fn get_one(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AuthResult<Json<AccountView>> {
    ensure_owner_or_admin(&auth, &id)?;

    let account = ctx.accounts.get_account(&id).await?;
    Ok(Json(AccountView::from_account(&account)?))
}

/// Partial update behind the field whitelist
async fn update(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> AuthResult<Json<UpdateOutcome>> {
    ensure_owner_or_admin(&auth, &id)?;

    let outcome = ctx.accounts.update_account(auth.role, &id, req).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorRef {
    id: String,
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeactivationReceipt {
    deactivated_user: ActorRef,
    deactivated_by: ActorRef,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Admin soft delete. Deactivation revokes every live refresh token so the
/// account cannot keep a session alive past the flag.
async fn deactivate(
    State(ctx): State<AppContext>,
    admin: AdminContext,
    Path(id): Path<String>,
) -> AuthResult<Json<DeactivationReceipt>> {
    if admin.auth.account.id == id {
        return Err(AuthError::SelfDeactivation);
    }

    let target = ctx.accounts.set_active(&id, false).await?;
    ctx.tokens.revoke_all_for_account(&target.id, None).await?;

    tracing::warn!(
        target: "audit",
        admin_id = %admin.auth.account.id,
        target_id = %target.id,
        "account deactivated by administrator"
    );

    Ok(Json(DeactivationReceipt {
        deactivated_user: ActorRef {
            id: target.id,
            email: target.email,
        },
        deactivated_by: ActorRef {
            id: admin.auth.account.id,
            email: admin.auth.account.email,
        },
        timestamp: ctx.clock.now(),
    }))
}

/// Admin reactivation of a soft-deleted account
async fn activate(
    State(ctx): State<AppContext>,
    admin: AdminContext,
    Path(id): Path<String>,
) -> AuthResult<Json<AccountView>> {
    let account = ctx.accounts.set_active(&id, true).await?;

    tracing::info!(
        target: "audit",
        admin_id = %admin.auth.account.id,
        target_id = %account.id,
        "account reactivated by administrator"
    );

    Ok(Json(AccountView::from_account(&account)?))
}
