use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/users/profile",
            get(handlers::users::get_profile).put(handlers::users::update_profile),
        )
        .route(
            "/users/change-password",
            post(handlers::users::change_password),
        )
        .route("/users/vehicles", get(handlers::vehicles::list_vehicles))
        .route(
            "/vehicles",
            get(handlers::vehicles::list_vehicles).post(handlers::vehicles::add_vehicle),
        )
        .route(
            "/vehicles/:id",
            get(handlers::vehicles::get_vehicle).delete(handlers::vehicles::delete_vehicle),
        )
        .route(
            "/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route("/services/search", get(handlers::services::search_services))
        .route(
            "/services/:id",
            get(handlers::services::get_service)
                .put(handlers::services::update_service)
                .delete(handlers::services::deactivate_service),
        )
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/bookings/my-bookings", get(handlers::bookings::my_bookings))
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/bookings/:id/status",
            put(handlers::bookings::update_status),
        )
        .route("/bookings/:id/rate", post(handlers::bookings::rate_booking))
        .route(
            "/bookings/:id/assign",
            put(handlers::bookings::assign_staff),
        )
        .route("/admin/staff", get(handlers::admin::list_staff))
        .route("/admin/users", post(handlers::admin::create_user));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
