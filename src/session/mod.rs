//! Authenticated identity and the client-side session lifecycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod gate;
pub mod manager;
mod roles;

pub use roles::{Role, RoleClaim, RoleSet};

/// The identity a request or a screen acts as. Passed by reference into
/// everything that needs to know who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Unix timestamp the underlying token was issued at.
    pub issued_at: i64,
}

impl Session {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            session: None,
            is_loading: true,
        }
    }

    pub fn ready(session: Option<Session>) -> Self {
        Self {
            session,
            is_loading: false,
        }
    }
}
