use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Select, TableGateway, Update,
    WriteResult, time,
};

use super::qualified;
use crate::dto::FolderShareLinkDto;
use crate::entity::FolderShareLink;

/// Gateway for `folder_share_link`.
#[derive(Clone)]
pub struct FolderShareLinkTable {
    gateway: TableGateway<FolderShareLink>,
}

impl FolderShareLinkTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FolderShareLink> {
        &self.gateway
    }

    pub async fn fetch_by_id(
        &self,
        share_id: &str,
    ) -> Result<Option<FolderShareLink>, GatewayError> {
        self.gateway.fetch_by_id(share_id).await
    }

    pub async fn fetch_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<FolderShareLink>, GatewayError> {
        let select = self.gateway.select().eq("token_hash", token_hash);
        self.gateway.fetch_entity(select).await
    }

    /// Links of a folder, oldest first.
    pub async fn fetch_by_folder_id(
        &self,
        tenant_id: &str,
        folder_id: &str,
    ) -> Result<Vec<FolderShareLink>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("folder_id", folder_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// Links of a folder with the folder and creator names.
    pub async fn fetch_by_folder_with_details(
        &self,
        tenant_id: &str,
        folder_id: &str,
    ) -> Result<Vec<FolderShareLinkDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fsl",
                FolderShareLink::TABLE,
                qualified(
                    "fsl",
                    &[
                        "share_id",
                        "tenant_id",
                        "folder_id",
                        "expires_dt",
                        "revoked_dt",
                        "created_by",
                        "created_dt",
                    ],
                ),
            )
            .columns([
                ("password_protected", "fsl.password_hash IS NOT NULL"),
                ("folder_name", "f.name"),
                ("creator_display_name", "u.display_name"),
            ])
            .join("f", "folder", "f.folder_id = fsl.folder_id")
            .join_left("u", "app_user", "u.user_id = fsl.created_by")
            .eq("fsl.tenant_id", tenant_id)
            .eq("fsl.folder_id", folder_id)
            .order("fsl.created_dt", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn insert(
        &self,
        link: &FolderShareLink,
    ) -> Result<Option<FolderShareLink>, GatewayError> {
        self.gateway.insert(link.object_copy()).await
    }

    /// Revoke an open link of the tenant.
    pub async fn revoke_link(
        &self,
        tenant_id: &str,
        share_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Update::for_table(FolderShareLink::TABLE)
            .set("revoked_dt", time::now())
            .eq("tenant_id", tenant_id)
            .eq("share_id", share_id)
            .is_null("revoked_dt")
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn delete_link(
        &self,
        tenant_id: &str,
        share_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(FolderShareLink::TABLE)
            .eq("tenant_id", tenant_id)
            .eq("share_id", share_id)
            .execute(self.gateway.adapter())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, Value};

    #[tokio::test]
    async fn details_read_mysql_flags_as_bools() {
        let row = Row::new()
            .with("share_id", "s1")
            .with("tenant_id", "x")
            .with("folder_id", "f1")
            .with("expires_dt", Value::Null)
            .with("revoked_dt", Value::Null)
            .with("created_by", Value::Null)
            .with("created_dt", Value::Null)
            .with("password_protected", 0i64)
            .with("folder_name", "Launch")
            .with("creator_display_name", Value::Null);
        let mock = Arc::new(MockAdapter::new(Dialect::MySql).append_rows(vec![row]));
        let links = FolderShareLinkTable::new(mock.clone());

        let details = links.fetch_by_folder_with_details("x", "f1").await.unwrap();

        assert!(!details[0].password_protected);
        assert_eq!(details[0].folder_name.as_deref(), Some("Launch"));
        assert!(mock
            .last_statement()
            .unwrap()
            .sql
            .contains("INNER JOIN folder AS f ON f.folder_id = fsl.folder_id"));
    }

    #[tokio::test]
    async fn links_are_deleted_within_the_tenant() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_exec(0, None));
        let links = FolderShareLinkTable::new(mock.clone());

        assert!(!links.delete_link("x", "s9").await.unwrap().success());
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "DELETE FROM folder_share_link WHERE tenant_id = $1 AND share_id = $2"
        );
    }
}
