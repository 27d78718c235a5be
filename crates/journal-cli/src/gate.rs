//! Route gating on authentication state.

use crate::store::AuthState;

const PUBLIC_ROUTES: [&str; 3] = ["/login", "/signup", "/reset-password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Public,
    Protected,
}

impl RouteKind {
    pub fn classify(path: &str) -> Self {
        let normalized = path.trim().trim_end_matches('/');
        if PUBLIC_ROUTES.contains(&normalized) {
            Self::Public
        } else {
            Self::Protected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session restore has not finished yet
    Wait,
    Render,
    RedirectToLogin,
}

/// Blocks protected routes until the first auth resolution, then never again.
#[derive(Debug, Default)]
pub struct AuthGate {
    resolved: bool,
}

impl AuthGate {
    pub fn decide(&mut self, route: RouteKind, auth: &AuthState) -> GateDecision {
        if auth.initialized {
            self.resolved = true;
        }

        match route {
            RouteKind::Public => GateDecision::Render,
            RouteKind::Protected if !self.resolved => GateDecision::Wait,
            RouteKind::Protected if auth.session.is_none() => GateDecision::RedirectToLogin,
            RouteKind::Protected => GateDecision::Render,
        }
    }
}
