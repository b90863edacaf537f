//! Current route and forced redirects

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::guard::{guard, GuardDecision};
use crate::route::Route;

const SIGNAL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationSignal {
    /// Something outside the guard moved the user, e.g. an unrecoverable
    /// auth failure
    Redirect { from: Route, to: Route },
}

pub struct Navigator {
    current: Arc<RwLock<Route>>,
    signals: broadcast::Sender<NavigationSignal>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);

        Self {
            current: Arc::new(RwLock::new(initial)),
            signals,
        }
    }

    pub fn current(&self) -> Route {
        self.current.read().clone()
    }

    /// Run the guard and commit whichever route it settles on
    pub fn navigate(&self, target: &str, has_session: bool) -> GuardDecision {
        let decision = guard(target, has_session);

        if let GuardDecision::Redirect(to) = &decision {
            tracing::debug!(path = %target, redirect = %to, "Guard redirected navigation");
        }

        *self.current.write() = decision.destination().clone();
        decision
    }

    /// Send the user to `/login` and tell every subscriber
    pub fn redirect_to_login(&self) {
        self.redirect(Route::Login);
    }

    pub fn redirect(&self, to: Route) {
        let from = std::mem::replace(&mut *self.current.write(), to.clone());

        tracing::warn!(from = %from, to = %to, "Forced redirect");

        // No subscribers is fine; the committed route is still updated
        let _ = self.signals.send(NavigationSignal::Redirect { from, to });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigationSignal> {
        self.signals.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Root)
    }
}

impl Clone for Navigator {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            signals: self.signals.clone(),
        }
    }
}
