use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use table_gateway::{FromValue, GatewayError, Value};

/// Access level granted on a file, a folder or through a share link.
///
/// Ordered from most to least privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Commenter,
    #[default]
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Commenter => "commenter",
            Role::Viewer => "viewer",
        }
    }

    pub fn can_edit(&self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    /// Owners and editors may grant access to others.
    pub fn can_share(&self) -> bool {
        self.can_edit()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "commenter" => Ok(Role::Commenter),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

impl From<Role> for Value {
    fn from(role: Role) -> Self {
        Value::String(role.as_str().to_string())
    }
}

impl FromValue for Role {
    fn from_value(column: &str, value: Value) -> Result<Self, GatewayError> {
        let name = String::from_value(column, value)?;
        name.parse().map_err(|_| GatewayError::ColumnType {
            column: column.to_string(),
            expected: "role",
            found: "string",
        })
    }
}
