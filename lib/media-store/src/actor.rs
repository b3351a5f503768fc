use serde::{Deserialize, Serialize};

/// The authenticated user and tenant a service call runs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub tenant_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn owns(&self, tenant_id: &str) -> bool {
        self.tenant_id == tenant_id
    }
}
