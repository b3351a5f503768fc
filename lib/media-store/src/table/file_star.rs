use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Insert, OnConflict, Order, Row, Select,
    TableGateway, WriteResult, time,
};

use crate::dto::FileStarDto;
use crate::entity::FileStar;

/// Gateway for `file_star`, keyed by `(tenant_id, file_id, user_id)`.
#[derive(Clone)]
pub struct FileStarTable {
    gateway: TableGateway<FileStar>,
}

impl FileStarTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FileStar> {
        &self.gateway
    }

    /// Star a file. Starring twice affects no rows.
    pub async fn add(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        let row = Row::new()
            .with("tenant_id", tenant_id)
            .with("file_id", file_id)
            .with("user_id", user_id)
            .with("created_dt", time::now());
        Insert::into_table(FileStar::TABLE)
            .set(row)
            .on_conflict(OnConflict::DoNothing)
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn remove(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[tenant_id.into(), file_id.into(), user_id.into()])
            .await
    }

    pub async fn check(
        &self,
        tenant_id: &str,
        file_id: &str,
        user_id: &str,
    ) -> Result<bool, GatewayError> {
        let star = self
            .gateway
            .fetch_by_key(&[tenant_id.into(), file_id.into(), user_id.into()])
            .await?;
        Ok(star.is_some())
    }

    pub async fn fetch_by_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<FileStar>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("user_id", user_id)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    /// Starred live files, most recently starred first.
    pub async fn fetch_with_file_details(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<FileStarDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fs",
                FileStar::TABLE,
                [
                    ("file_id", "fm.file_id"),
                    ("name", "COALESCE(fm.title, fm.original_filename)"),
                    ("content_type", "fm.content_type"),
                    ("size_bytes", "fm.size_bytes"),
                    ("starred_dt", "fs.created_dt"),
                ],
            )
            .join(
                "fm",
                "file_metadata",
                "fm.tenant_id = fs.tenant_id AND fm.file_id = fs.file_id",
            )
            .eq("fs.tenant_id", tenant_id)
            .eq("fs.user_id", user_id)
            .is_null("fm.deleted_at")
            .order("fs.created_dt", Order::Desc);
        self.gateway.fetch_projection(select).await
    }
}
