use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Row, Select, TableGateway,
    WriteResult, time,
};

use super::{qualified, upsert};
use crate::dto::FolderPermissionUserDto;
use crate::entity::FolderPermission;
use crate::{Role, new_id};

/// Gateway for `folder_permission`. A user holds at most one permission per
/// folder.
#[derive(Clone)]
pub struct FolderPermissionTable {
    gateway: TableGateway<FolderPermission>,
}

impl FolderPermissionTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FolderPermission> {
        &self.gateway
    }

    pub async fn fetch_by_id(
        &self,
        permission_id: &str,
    ) -> Result<Option<FolderPermission>, GatewayError> {
        self.gateway.fetch_by_id(permission_id).await
    }

    pub async fn fetch_by_folder_id(
        &self,
        tenant_id: &str,
        folder_id: &str,
    ) -> Result<Vec<FolderPermission>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("folder_id", folder_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_user_and_folder(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
    ) -> Result<Option<FolderPermission>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("folder_id", folder_id)
            .eq("user_id", user_id);
        self.gateway.fetch_entity(select).await
    }

    pub async fn fetch_people_with_access(
        &self,
        tenant_id: &str,
        folder_id: &str,
    ) -> Result<Vec<FolderPermissionUserDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fp",
                FolderPermission::TABLE,
                qualified(
                    "fp",
                    &[
                        "permission_id",
                        "tenant_id",
                        "folder_id",
                        "user_id",
                        "role",
                        "inherit_to_children",
                        "created_by",
                        "created_dt",
                    ],
                ),
            )
            .columns([
                ("user_email", "u.email"),
                ("user_display_name", "u.display_name"),
                ("actor_display_name", "actor.display_name"),
            ])
            .join("u", "app_user", "u.user_id = fp.user_id")
            .join_left("actor", "app_user", "actor.user_id = fp.created_by")
            .eq("fp.tenant_id", tenant_id)
            .eq("fp.folder_id", folder_id)
            .order("fp.created_dt", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    /// Grant `role`, replacing any role the user already holds on the folder.
    pub async fn upsert_permission(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
        role: Role,
        inherit_to_children: bool,
        granted_by: &str,
    ) -> Result<Option<FolderPermission>, GatewayError> {
        let now = time::now();
        let row = Row::new()
            .with("permission_id", new_id())
            .with("tenant_id", tenant_id)
            .with("folder_id", folder_id)
            .with("user_id", user_id)
            .with("role", role)
            .with("inherit_to_children", inherit_to_children)
            .with("created_by", granted_by)
            .with("created_dt", now);
        let set = Row::new()
            .with("role", role)
            .with("inherit_to_children", inherit_to_children)
            .with("created_by", granted_by)
            .with("created_dt", now);
        upsert(&self.gateway, row, &["tenant_id", "folder_id", "user_id"], set).await
    }

    pub async fn delete_permission(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(FolderPermission::TABLE)
            .eq("tenant_id", tenant_id)
            .eq("folder_id", folder_id)
            .eq("user_id", user_id)
            .execute(self.gateway.adapter())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Value};

    #[tokio::test]
    async fn inherit_flag_reads_from_mysql_tinyint() {
        let row = Row::new()
            .with("permission_id", "p1")
            .with("tenant_id", "x")
            .with("folder_id", "f1")
            .with("user_id", "u2")
            .with("group_id", Value::Null)
            .with("role", "commenter")
            .with("inherit_to_children", 1i64)
            .with("created_by", "u1")
            .with("created_dt", Value::Null);
        let mock = Arc::new(MockAdapter::new(Dialect::MySql).append_rows(vec![row]));
        let permissions = FolderPermissionTable::new(mock.clone());

        let permission = permissions
            .fetch_by_user_and_folder("x", "f1", "u2")
            .await
            .unwrap()
            .unwrap();

        assert!(permission.inherit_to_children);
        assert_eq!(permission.role, Role::Commenter);
        assert!(!permission.can_edit());
    }

    #[tokio::test]
    async fn upsert_overwrites_inheritance_too() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(Vec::new()));
        let permissions = FolderPermissionTable::new(mock.clone());

        let granted = permissions
            .upsert_permission("x", "f1", "u2", Role::Editor, false, "u1")
            .await
            .unwrap();

        // nothing came back and nothing matched the re-read
        assert_eq!(granted, None);
        let statements = mock.statements();
        assert!(statements[0].sql.contains(
            "DO UPDATE SET role = $9, inherit_to_children = $10, created_by = $11, created_dt = $12"
        ));
        assert_eq!(statements[0].params[5], Value::Bool(false));
    }
}
