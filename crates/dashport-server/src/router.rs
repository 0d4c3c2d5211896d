//! Route table.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use dashport_core::error::DashportError;
use dashport_core::identity::IdentityProvider;
use dashport_core::repository::PrivilegedStore;
use serde_json::{Value, json};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{admin, auth, dashboards, embed, invitations};
use crate::session;
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError(DashportError::not_found("route", "unknown"))
}

fn admin_routes<S, I>() -> Router<AppState<S, I>>
where
    S: PrivilegedStore,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/bootstrap", post(admin::bootstrap::<S, I>))
        .route("/users", get(admin::list_users::<S, I>))
        .route("/users/{id}/role", put(admin::update_user_role::<S, I>))
        .route(
            "/groups",
            get(admin::list_groups::<S, I>).post(admin::create_group::<S, I>),
        )
        .route(
            "/groups/{id}",
            put(admin::update_group::<S, I>).delete(admin::delete_group::<S, I>),
        )
        .route(
            "/groups/{id}/members",
            get(admin::list_members::<S, I>).post(admin::add_member::<S, I>),
        )
        .route("/members/{id}", delete(admin::remove_member::<S, I>))
        .route("/members/{id}/admin", put(admin::set_member_admin::<S, I>))
        .route(
            "/dashboards",
            get(admin::list_dashboards::<S, I>).post(admin::create_dashboard::<S, I>),
        )
        .route(
            "/dashboards/{id}",
            put(admin::update_dashboard::<S, I>).delete(admin::delete_dashboard::<S, I>),
        )
}

fn api_routes<S, I>() -> Router<AppState<S, I>>
where
    S: PrivilegedStore,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/me", get(auth::me::<S, I>))
        .route("/auth/confirm-email", post(auth::confirm_email::<S, I>))
        .route("/invitations/lookup", get(invitations::lookup::<S, I>))
        .route("/invitations/accept", post(invitations::accept::<S, I>))
        .route(
            "/invitations",
            get(invitations::list::<S, I>).post(invitations::create::<S, I>),
        )
        .route("/invitations/{id}", delete(invitations::delete::<S, I>))
        .route("/dashboards", get(dashboards::visible::<S, I>))
        .route("/dashboards/{id}/embed", get(dashboards::embed_credential::<S, I>))
        .route("/powerbi/embed-token", post(embed::powerbi::<S, I>))
        .route("/metabase/embed-token", post(embed::metabase::<S, I>))
        .nest("/admin", admin_routes())
}

/// The full application router with session handling applied.
pub fn router<S, I>(state: AppState<S, I>) -> Router
where
    S: PrivilegedStore,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login::<S, I>))
        .route("/auth/callback", get(auth::callback::<S, I>))
        .route(
            "/auth/logout",
            get(auth::logout::<S, I>).post(auth::logout::<S, I>),
        )
        .nest("/api", api_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::gate::<S, I>,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

