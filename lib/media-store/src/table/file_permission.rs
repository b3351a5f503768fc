use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Row, Select, TableGateway,
    WriteResult, time,
};

use super::{qualified, upsert};
use crate::dto::FilePermissionUserDto;
use crate::entity::FilePermission;
use crate::{Role, new_id};

/// Gateway for `file_permission`. A user holds at most one permission per
/// file.
#[derive(Clone)]
pub struct FilePermissionTable {
    gateway: TableGateway<FilePermission>,
}

impl FilePermissionTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FilePermission> {
        &self.gateway
    }

    pub async fn fetch_by_id(
        &self,
        permission_id: &str,
    ) -> Result<Option<FilePermission>, GatewayError> {
        self.gateway.fetch_by_id(permission_id).await
    }

    pub async fn fetch_by_file_id(
        &self,
        tenant_id: &str,
        file_id: &str,
    ) -> Result<Vec<FilePermission>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("file_id", file_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_user_id(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<FilePermission>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("user_id", user_id)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_user_and_file(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
    ) -> Result<Option<FilePermission>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("file_id", file_id)
            .eq("user_id", user_id);
        self.gateway.fetch_entity(select).await
    }

    /// Everyone with a role on the file, with the granting user's name.
    pub async fn fetch_people_with_access(
        &self,
        tenant_id: &str,
        file_id: &str,
    ) -> Result<Vec<FilePermissionUserDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fp",
                FilePermission::TABLE,
                qualified(
                    "fp",
                    &[
                        "permission_id",
                        "tenant_id",
                        "file_id",
                        "user_id",
                        "role",
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
            .eq("fp.file_id", file_id)
            .order("fp.created_dt", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    /// Grant `role`, replacing any role the user already holds on the file.
    pub async fn upsert_permission(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
        role: Role,
        granted_by: &str,
    ) -> Result<Option<FilePermission>, GatewayError> {
        let now = time::now();
        let row = Row::new()
            .with("permission_id", new_id())
            .with("tenant_id", tenant_id)
            .with("file_id", file_id)
            .with("user_id", user_id)
            .with("role", role)
            .with("created_by", granted_by)
            .with("created_dt", now);
        let set = Row::new()
            .with("role", role)
            .with("created_by", granted_by)
            .with("created_dt", now);
        upsert(&self.gateway, row, &["tenant_id", "file_id", "user_id"], set).await
    }

    pub async fn delete_by_file_and_user(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(FilePermission::TABLE)
            .eq("tenant_id", tenant_id)
            .eq("file_id", file_id)
            .eq("user_id", user_id)
            .execute(self.gateway.adapter())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, StatementKind, Value};

    fn permission_row(role: &str) -> Row {
        Row::new()
            .with("permission_id", "p1")
            .with("tenant_id", "x")
            .with("file_id", "file1")
            .with("user_id", "u2")
            .with("group_id", Value::Null)
            .with("role", role)
            .with("created_by", "u1")
            .with("created_dt", Value::Null)
    }

    #[tokio::test]
    async fn upsert_replaces_the_role_on_conflict() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![permission_row("editor")]),
        );
        let permissions = FilePermissionTable::new(mock.clone());

        let granted = permissions
            .upsert_permission("x", "file1", "u2", Role::Editor, "u1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(granted.role, Role::Editor);
        let statement = mock.last_statement().unwrap();
        assert!(statement.sql.starts_with(
            "INSERT INTO file_permission \
             (permission_id, tenant_id, file_id, user_id, role, created_by, created_dt)"
        ));
        assert!(statement.sql.contains(
            "ON CONFLICT (tenant_id, file_id, user_id) \
             DO UPDATE SET role = $8, created_by = $9, created_dt = $10 RETURNING permission_id"
        ));
        assert_eq!(statement.params[4], Value::from("editor"));
    }

    #[tokio::test]
    async fn upsert_without_returning_rereads_by_conflict_target() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::MySql)
                .append_exec(2, None)
                .append_rows(vec![permission_row("viewer")]),
        );
        let permissions = FilePermissionTable::new(mock.clone());

        let granted = permissions
            .upsert_permission("x", "file1", "u2", Role::Viewer, "u1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(granted.role, Role::Viewer);
        let statements = mock.statements();
        assert_eq!(statements[0].kind, StatementKind::Insert);
        assert!(statements[0].sql.contains("ON DUPLICATE KEY UPDATE role = ?"));
        assert!(statements[1].sql.ends_with(
            "FROM file_permission WHERE tenant_id = ? AND file_id = ? AND user_id = ? LIMIT 1"
        ));
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn people_with_access_need_a_user_row() {
        let mut person = permission_row("owner")
            .with("user_email", "ana@example.com")
            .with("user_display_name", "Ana")
            .with("actor_display_name", Value::Null);
        person.remove("group_id");
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![person]));
        let permissions = FilePermissionTable::new(mock.clone());

        let people = permissions.fetch_people_with_access("x", "file1").await.unwrap();

        assert_eq!(people[0].role, Role::Owner);
        assert_eq!(people[0].actor_display_name, None);
        let sql = mock.last_statement().unwrap().sql;
        assert!(sql.contains("INNER JOIN app_user AS u ON u.user_id = fp.user_id"));
        assert!(sql.contains("LEFT JOIN app_user AS actor ON actor.user_id = fp.created_by"));
    }
}
