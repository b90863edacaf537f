//! Route guard

use crate::route::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested route
    Allow(Route),
    /// Go here instead
    Redirect(Route),
}

impl GuardDecision {
    /// The route that ends up committed
    pub fn destination(&self) -> &Route {
        match self {
            GuardDecision::Allow(route) | GuardDecision::Redirect(route) => route,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GuardDecision::Redirect(_))
    }
}

/// Decide a transition from the target path and whether a session exists.
pub fn guard(target: &str, has_session: bool) -> GuardDecision {
    let route = Route::parse(target);

    if route.requires_session() && !has_session {
        GuardDecision::Redirect(Route::Login)
    } else if route.is_guest_only() && has_session {
        GuardDecision::Redirect(Route::Root)
    } else {
        GuardDecision::Allow(route)
    }
}
