pub mod auth;
mod bookings;
pub mod error;
pub mod rate_limit;
mod rooms;
mod users;
mod validation;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public auth routes; login is on the stricter rate-limit tier
    let auth_routes = Router::new()
        .route(
            "/login",
            post(auth::login).layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::rate_limit_auth,
            )),
        )
        .route("/logout", delete(auth::logout));

    // Session-protected auth routes
    let session_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/sessions", delete(auth::revoke_all_sessions))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    let booking_routes = Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/user/:user_id", get(bookings::list_user_bookings))
        .route(
            "/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .merge(
                    delete(bookings::delete_booking)
                        .route_layer(middleware::from_fn(auth::require_admin)),
                ),
        )
        .route("/:id/cancel", post(bookings::cancel_booking))
        // Protected by auth
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    let room_routes = Router::new()
        .route("/", get(rooms::list_rooms))
        .route("/:id", get(rooms::get_room))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    // Account management, admin only
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", get(users::get_user))
        .route_layer(middleware::from_fn(auth::require_admin))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/bookings", booking_routes)
        .nest("/api/rooms", room_routes)
        .nest("/api/users", user_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
