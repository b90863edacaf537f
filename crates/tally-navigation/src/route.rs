//! Client routes

use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Route {
    /// Protected dashboard at `/`
    Root,
    /// `/login`
    Login,
    /// `/register`
    Register,
    /// Any other path, carried through verbatim
    Other(String),
}

impl Route {
    /// Map a path to a route. Query strings and fragments are ignored;
    /// everything else must match exactly.
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        match path {
            "/" => Route::Root,
            "/login" => Route::Login,
            "/register" => Route::Register,
            other => Route::Other(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Other(path) => path,
        }
    }

    /// Routes only reachable with a session
    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Root)
    }

    /// Routes that make no sense once logged in
    pub fn is_guest_only(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl std::str::FromStr for Route {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self> {
        if !s.starts_with('/') {
            return Err(NavigationError::InvalidPath(s.to_string()));
        }
        Ok(Route::parse(s))
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.path().to_string()
    }
}

impl TryFrom<String> for Route {
    type Error = NavigationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
