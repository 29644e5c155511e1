use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{RoleSet, Session};

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// JWT payload. The role claim may be a single value or a list and is
/// normalised into a [`RoleSet`] on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(alias = "roles")]
    pub role: RoleSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl From<Claims> for Session {
    fn from(c: Claims) -> Self {
        Session {
            user_id: c.sub,
            email: c.email,
            roles: c.role,
            company_name: c.company_name,
            issued_at: c.iat as i64,
        }
    }
}
