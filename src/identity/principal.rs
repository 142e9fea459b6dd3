use serde::{Deserialize, Serialize};

pub const ANONYMOUS: &str = "anonymous";
pub const ADMIN_ROLE: &str = "admin";

/// The identity a request acts as.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new<S: Into<String>>(user_id: S) -> Self { Self { user_id: user_id.into(), roles: Vec::new() } }

    pub fn with_role<S: Into<String>>(mut self, role: S) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn anonymous() -> Self { Self::new(ANONYMOUS) }

    pub fn is_anonymous(&self) -> bool { self.user_id == ANONYMOUS && self.roles.is_empty() }

    pub fn is_admin(&self) -> bool { self.roles.iter().any(|r| r.eq_ignore_ascii_case(ADMIN_ROLE)) }
}
