//! Route definitions and router setup
//!
//! Configures all API routes and middleware. The per-request pipeline is:
//! input validation, then authentication, then (for admin routes) the role
//! gate, then the handler — except for admin routes, where authentication
//! and the gate run before body validation so a non-admin is rejected with
//! 403 no matter what the body contains.

mod admin;
mod auth;
mod profile;

use crate::auth::{authenticate, require_admin};
use crate::config::Settings;
use crate::response;
use crate::state::SharedState;
use crate::validation::validate_body;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let auth_layer = from_fn_with_state(state.clone(), authenticate);

    let auth_routes = Router::new()
        .route(
            "/register",
            post(auth::register)
                .route_layer(from_fn(|req, next| validate_body(auth::REGISTER_RULES, req, next))),
        )
        .route(
            "/login",
            post(auth::login)
                .route_layer(from_fn(|req, next| validate_body(auth::LOGIN_RULES, req, next))),
        )
        // The logout handler checks the token itself (missing token is 400,
        // not 401), so it sits outside the authentication layer.
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            post(auth::forgot_password)
                .route_layer(from_fn(|req, next| validate_body(auth::EMAIL_RULES, req, next))),
        )
        .route(
            "/resend-verification",
            post(auth::resend_verification)
                .route_layer(from_fn(|req, next| validate_body(auth::EMAIL_RULES, req, next))),
        )
        .route(
            "/refresh",
            post(auth::refresh)
                .route_layer(from_fn(|req, next| validate_body(auth::REFRESH_RULES, req, next))),
        )
        // Layer order matters: validation wraps authentication, so a bad
        // body is rejected without a provider round-trip.
        .route(
            "/reset-password",
            post(auth::reset_password).route_layer(auth_layer.clone()).route_layer(from_fn(
                |req, next| validate_body(auth::RESET_PASSWORD_RULES, req, next),
            )),
        )
        .route(
            "/change-password",
            post(auth::change_password).route_layer(auth_layer.clone()),
        )
        // The profile rules are all optional-field rules, so running them
        // on the GET as well is a no-op.
        .route(
            "/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                .route_layer(auth_layer.clone())
                .route_layer(from_fn(|req, next| {
                    validate_body(profile::UPDATE_PROFILE_RULES, req, next)
                })),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::get_all_users))
        .route(
            "/assign-role",
            post(admin::assign_role).route_layer(from_fn(|req, next| {
                validate_body(admin::ASSIGN_ROLE_RULES, req, next)
            })),
        )
        .layer(from_fn(require_admin))
        .layer(auth_layer);

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(stack)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Health check endpoint
async fn health_check() -> Response {
    response::success(
        serde_json::json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
        StatusCode::OK,
    )
}

/// Fallback for unmatched routes
async fn not_found(uri: Uri) -> Response {
    response::error(format!("Route not found: {uri}"), StatusCode::NOT_FOUND)
}
