//! AuthGate API - Authentication Gateway
//!
//! A thin REST facade over a hosted identity platform. Credential checks,
//! token issuance and validation, password hashing, and session storage all
//! live in the external provider; this service shapes requests into provider
//! calls and reshapes the answers into a uniform JSON envelope.
//!
//! Request pipeline: input validation -> authentication -> role gate (admin
//! routes) -> handler -> response envelope.

mod auth;
mod config;
mod error;
mod provider;
mod response;
mod routes;
mod state;
mod validation;

use crate::config::Settings;
use crate::provider::SupabaseProvider;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting AuthGate - Authentication Gateway...");

    // Load configuration (fails fast when provider credentials are missing)
    let settings = Settings::load()?;
    info!("📋 Configuration loaded (environment: {})", settings.env);

    // Construct the provider client once and inject it everywhere
    let provider = Arc::new(SupabaseProvider::new(&settings.provider)?);
    let state = Arc::new(AppState::new(provider, settings.env));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Authentication ───");
    info!("   POST /api/auth/register            - Register new account");
    info!("   POST /api/auth/login               - Login with email/password");
    info!("   POST /api/auth/logout              - Revoke the current session");
    info!("   POST /api/auth/refresh             - Refresh access token");
    info!("   POST /api/auth/resend-verification - Resend signup verification");
    info!("");
    info!("   ─── Password Management ───");
    info!("   POST /api/auth/forgot-password     - Request a reset email");
    info!("   POST /api/auth/reset-password      - Reset via recovery session");
    info!("   POST /api/auth/change-password     - Change while authenticated");
    info!("");
    info!("   ─── Profile ───");
    info!("   GET  /api/auth/profile             - Get current user");
    info!("   PUT  /api/auth/profile             - Update bio/avatar");
    info!("");
    info!("   ─── Admin ───");
    info!("   GET  /api/admin/users              - List all users (admin)");
    info!("   POST /api/admin/assign-role        - Assign roles (admin)");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,authgate_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
