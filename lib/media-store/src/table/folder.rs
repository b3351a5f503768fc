use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Select, TableGateway, Update, WriteResult,
    time,
};

use super::{qualified, without_key};
use crate::dto::FolderWithOwnerDto;
use crate::entity::Folder;

/// Gateway for `folder`. Soft-deleted folders are hidden unless a method
/// says otherwise.
#[derive(Clone)]
pub struct FolderTable {
    gateway: TableGateway<Folder>,
}

impl FolderTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<Folder> {
        &self.gateway
    }

    fn live(&self) -> Select {
        self.gateway.select().is_null("deleted_at")
    }

    pub async fn fetch_by_id(&self, folder_id: &str) -> Result<Option<Folder>, GatewayError> {
        self.gateway
            .fetch_entity(self.live().eq("folder_id", folder_id))
            .await
    }

    pub async fn fetch_by_id_include_deleted(
        &self,
        folder_id: &str,
    ) -> Result<Option<Folder>, GatewayError> {
        self.gateway.fetch_by_id(folder_id).await
    }

    pub async fn fetch_by_tenant(&self, tenant_id: &str) -> Result<Vec<Folder>, GatewayError> {
        let select = self
            .live()
            .eq("tenant_id", tenant_id)
            .order("name", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// The tenant's oldest live folder without a parent.
    pub async fn fetch_root_by_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Option<Folder>, GatewayError> {
        let select = self
            .live()
            .eq("tenant_id", tenant_id)
            .is_null("parent_folder_id")
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entity(select).await
    }

    pub async fn fetch_by_parent(&self, parent_id: &str) -> Result<Vec<Folder>, GatewayError> {
        let select = self
            .live()
            .eq("parent_folder_id", parent_id)
            .order("name", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// Live children of `parent_id` with their creator's display name.
    pub async fn fetch_by_parent_with_owner(
        &self,
        parent_id: &str,
    ) -> Result<Vec<FolderWithOwnerDto>, GatewayError> {
        let select = Select::new()
            .from_as("f", Folder::TABLE, qualified("f", Folder::columns()))
            .columns([("owner_name", "u.display_name")])
            .join_left("u", "app_user", "u.user_id = f.created_by")
            .eq("f.parent_folder_id", parent_id)
            .is_null("f.deleted_at")
            .order("f.name", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    /// Soft-deleted folders, most recently deleted first.
    pub async fn fetch_deleted_by_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<Folder>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .is_not_null("deleted_at")
            .order("deleted_at", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn insert(&self, folder: &Folder) -> Result<Option<Folder>, GatewayError> {
        self.gateway.insert(folder.object_copy()).await
    }

    pub async fn update(&self, folder: &Folder) -> Result<WriteResult, GatewayError> {
        self.gateway
            .update_by_id(folder.folder_id.as_str(), without_key(folder))
            .await
    }

    /// Mark a live folder deleted. Already deleted folders are left as they are.
    pub async fn soft_delete(
        &self,
        folder_id: &str,
        deleted_by: &str,
    ) -> Result<WriteResult, GatewayError> {
        Update::for_table(Folder::TABLE)
            .set("deleted_at", time::now())
            .set("deleted_by", deleted_by)
            .eq("folder_id", folder_id)
            .is_null("deleted_at")
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn restore(&self, folder_id: &str) -> Result<WriteResult, GatewayError> {
        Update::for_table(Folder::TABLE)
            .set("deleted_at", None::<String>)
            .set("deleted_by", None::<String>)
            .eq("folder_id", folder_id)
            .execute(self.gateway.adapter())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, Value};

    fn folder_row(id: &str, parent: Option<&str>) -> Row {
        Row::new()
            .with("folder_id", id)
            .with("tenant_id", "x")
            .with("parent_folder_id", parent)
            .with("name", "Media")
            .with("created_by", "u1")
            .with("created_dt", Value::Null)
            .with("deleted_at", Value::Null)
            .with("deleted_by", Value::Null)
    }

    #[tokio::test]
    async fn live_fetch_excludes_deleted_rows() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![folder_row("f1", None)]),
        );
        let folders = FolderTable::new(mock.clone());

        let folder = folders.fetch_by_id("f1").await.unwrap().unwrap();

        assert!(folder.is_root());
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "SELECT folder_id, tenant_id, parent_folder_id, name, created_by, created_dt, \
             deleted_at, deleted_by FROM folder WHERE deleted_at IS NULL AND folder_id = $1 LIMIT 1"
        );
    }

    #[tokio::test]
    async fn children_with_owner_left_join_misses_are_none() {
        let row = folder_row("f2", Some("f1")).with("owner_name", Value::Null);
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![row]));
        let folders = FolderTable::new(mock.clone());

        let children = folders.fetch_by_parent_with_owner("f1").await.unwrap();

        assert_eq!(children.len(), 1);
        assert_eq!(children[0].owner_name, None);
        assert_eq!(children[0].parent_folder_id.as_deref(), Some("f1"));
        let sql = mock.last_statement().unwrap().sql;
        assert!(sql.starts_with("SELECT f.folder_id AS folder_id, f.tenant_id AS tenant_id"));
        assert!(sql.contains(
            "u.display_name AS owner_name FROM folder AS f \
             LEFT JOIN app_user AS u ON u.user_id = f.created_by"
        ));
        assert!(sql.ends_with(
            "WHERE f.parent_folder_id = $1 AND f.deleted_at IS NULL ORDER BY f.name ASC"
        ));
    }

    #[tokio::test]
    async fn soft_delete_and_restore() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_exec(1, None)
                .append_exec(1, None),
        );
        let folders = FolderTable::new(mock.clone());

        assert!(folders.soft_delete("f2", "u1").await.unwrap().success());
        assert!(folders.restore("f2").await.unwrap().success());

        let statements = mock.statements();
        assert_eq!(
            statements[0].sql,
            "UPDATE folder SET deleted_at = $1, deleted_by = $2 \
             WHERE folder_id = $3 AND deleted_at IS NULL"
        );
        assert_eq!(
            statements[1].sql,
            "UPDATE folder SET deleted_at = NULL, deleted_by = NULL WHERE folder_id = $1"
        );
        assert_eq!(statements[1].params, vec![Value::from("f2")]);
    }

    #[tokio::test]
    async fn update_writes_every_column_but_the_key() {
        let mock = Arc::new(MockAdapter::new(Dialect::MySql).append_exec(1, None));
        let folders = FolderTable::new(mock.clone());
        let folder = Folder::from_row(&folder_row("f2", Some("f1"))).unwrap();

        folders.update(&folder).await.unwrap();

        assert_eq!(
            mock.last_statement().unwrap().sql,
            "UPDATE folder SET tenant_id = ?, parent_folder_id = ?, name = ?, created_by = ?, \
             created_dt = NULL, deleted_at = NULL, deleted_by = NULL WHERE folder_id = ?"
        );
    }
}
