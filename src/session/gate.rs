use serde::Serialize;

use super::{Role, RoleSet, SessionState};

pub const LOGIN_PATH: &str = "/auth";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Session still loading: render a neutral placeholder, do not redirect.
    Pending,
    Render,
    RedirectToLogin { from: String },
    RedirectHome,
}

/// Decides whether protected content may be shown for the current session.
/// An empty role set admits any signed-in user.
#[derive(Debug, Clone, Default)]
pub struct RoleGate {
    allowed: RoleSet,
}

impl RoleGate {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn check(&self, state: &SessionState, requested: &str) -> GateDecision {
        if state.is_loading {
            return GateDecision::Pending;
        }
        let Some(session) = &state.session else {
            return GateDecision::RedirectToLogin {
                from: requested.to_string(),
            };
        };
        if self.allowed.is_empty() || session.roles.intersects(&self.allowed) {
            GateDecision::Render
        } else {
            GateDecision::RedirectHome
        }
    }
}

/// Client-side navigation targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum ClientRoute {
    Home,
    Auth,
    JobDetails { id: String },
    Profile,
    Employer,
    Jobseeker,
    Admin,
    Unmatched,
}

impl ClientRoute {
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => ClientRoute::Home,
            ["auth"] => ClientRoute::Auth,
            ["jobs", id] => ClientRoute::JobDetails { id: id.to_string() },
            ["profile"] => ClientRoute::Profile,
            ["employer", ..] => ClientRoute::Employer,
            ["jobseeker", ..] => ClientRoute::Jobseeker,
            ["admin", ..] => ClientRoute::Admin,
            _ => ClientRoute::Unmatched,
        }
    }

    /// Gate guarding this route; `None` for public routes.
    pub fn gate(&self) -> Option<RoleGate> {
        match self {
            ClientRoute::Profile => Some(RoleGate::authenticated()),
            ClientRoute::Employer => Some(RoleGate::new([Role::Employer])),
            ClientRoute::Jobseeker => Some(RoleGate::new([Role::Jobseeker])),
            ClientRoute::Admin => Some(RoleGate::new([Role::Admin])),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub route: ClientRoute,
    pub decision: GateDecision,
}

pub fn navigate(path: &str, state: &SessionState) -> Navigation {
    let route = ClientRoute::resolve(path);
    let decision = match (&route, route.gate()) {
        (ClientRoute::Unmatched, _) => GateDecision::RedirectHome,
        (_, Some(gate)) => gate.check(state, path),
        (_, None) => GateDecision::Render,
    };
    Navigation { route, decision }
}
