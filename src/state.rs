//! Application state management
//!
//! Shared state is limited to the injected identity provider client and the
//! deployment environment; requests share no other mutable state.

use crate::config::AppEnv;
use crate::provider::IdentityProvider;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Identity provider client (injected at startup, swappable in tests)
    pub provider: Arc<dyn IdentityProvider>,

    /// Deployment environment (gates development-only behavior)
    pub env: AppEnv,
}

impl AppState {
    pub fn new(provider: Arc<dyn IdentityProvider>, env: AppEnv) -> Self {
        Self { provider, env }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
