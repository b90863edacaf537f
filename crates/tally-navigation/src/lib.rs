//! Tally Navigation
//!
//! Three client routes and the guard that runs before every transition:
//! 1. `/` without a session → `/login`
//! 2. `/login` or `/register` with a session → `/`
//! 3. Anything else → allowed unchanged
//!
//! The [`Navigator`] also carries forced redirects (e.g. after a failed
//! token refresh) to whoever is rendering the current route.

mod error;
mod guard;
mod navigator;
mod route;

pub use error::NavigationError;
pub use guard::{guard, GuardDecision};
pub use navigator::{NavigationSignal, Navigator};
pub use route::Route;

pub type Result<T> = std::result::Result<T, NavigationError>;
