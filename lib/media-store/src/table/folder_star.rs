use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Insert, OnConflict, Order, Row, Select,
    TableGateway, WriteResult, time,
};

use crate::dto::FolderStarDto;
use crate::entity::FolderStar;

/// Gateway for `folder_star`, keyed by `(tenant_id, folder_id, user_id)`.
#[derive(Clone)]
pub struct FolderStarTable {
    gateway: TableGateway<FolderStar>,
}

impl FolderStarTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FolderStar> {
        &self.gateway
    }

    /// Star a folder. Starring twice affects no rows.
    pub async fn add(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        let row = Row::new()
            .with("tenant_id", tenant_id)
            .with("folder_id", folder_id)
            .with("user_id", user_id)
            .with("created_dt", time::now());
        Insert::into_table(FolderStar::TABLE)
            .set(row)
            .on_conflict(OnConflict::DoNothing)
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn remove(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[tenant_id.into(), folder_id.into(), user_id.into()])
            .await
    }

    pub async fn check(
        &self,
        tenant_id: &str,
        folder_id: &str,
        user_id: &str,
    ) -> Result<bool, GatewayError> {
        let star = self
            .gateway
            .fetch_by_key(&[tenant_id.into(), folder_id.into(), user_id.into()])
            .await?;
        Ok(star.is_some())
    }

    pub async fn fetch_by_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<FolderStar>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("user_id", user_id)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_ids_by_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let stars = self.fetch_by_user(tenant_id, user_id).await?;
        Ok(stars.into_iter().map(|star| star.folder_id).collect())
    }

    /// Starred live folders with their owner, most recently starred first.
    pub async fn fetch_with_folder_details(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<FolderStarDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fs",
                FolderStar::TABLE,
                [
                    ("folder_id", "f.folder_id"),
                    ("name", "f.name"),
                    ("owner_name", "u.display_name"),
                    ("created_dt", "f.created_dt"),
                    ("starred_dt", "fs.created_dt"),
                ],
            )
            .join("f", "folder", "f.folder_id = fs.folder_id")
            .join_left("u", "app_user", "u.user_id = f.created_by")
            .eq("fs.tenant_id", tenant_id)
            .eq("fs.user_id", user_id)
            .is_null("f.deleted_at")
            .order("fs.created_dt", Order::Desc);
        self.gateway.fetch_projection(select).await
    }
}
