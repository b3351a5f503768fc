use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Row, Select, TableGateway,
    WriteResult, time,
};

use super::qualified;
use crate::dto::CollectionAssetDto;
use crate::entity::CollectionAsset;

/// Gateway for `collection_asset`, keyed by `(collection_id, file_id)`.
#[derive(Clone)]
pub struct CollectionAssetTable {
    gateway: TableGateway<CollectionAsset>,
}

impl CollectionAssetTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<CollectionAsset> {
        &self.gateway
    }

    pub async fn fetch(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<Option<CollectionAsset>, GatewayError> {
        self.gateway
            .fetch_by_key(&[collection_id.into(), file_id.into()])
            .await
    }

    pub async fn fetch_by_collection_id(
        &self,
        collection_id: &str,
    ) -> Result<Vec<CollectionAsset>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("collection_id", collection_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_file_id(
        &self,
        file_id: &str,
    ) -> Result<Vec<CollectionAsset>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("file_id", file_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// Files of a collection with their metadata, most recently added first.
    pub async fn fetch_by_collection_with_file_details(
        &self,
        collection_id: &str,
    ) -> Result<Vec<CollectionAssetDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "ca",
                CollectionAsset::TABLE,
                qualified("ca", CollectionAsset::columns()),
            )
            .columns([
                ("collection_name", "c.name"),
                ("original_filename", "fm.original_filename"),
                ("record_status", "fm.record_status"),
                ("content_type", "fm.content_type"),
                ("size_bytes", "fm.size_bytes"),
            ])
            .join_left("c", "collection", "c.collection_id = ca.collection_id")
            .join_left("fm", "file_metadata", "fm.file_id = ca.file_id")
            .eq("ca.collection_id", collection_id)
            .order("ca.created_dt", Order::Desc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn add_asset(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<Option<CollectionAsset>, GatewayError> {
        let row = Row::new()
            .with("collection_id", collection_id)
            .with("file_id", file_id)
            .with("created_dt", time::now());
        self.gateway.insert(row).await
    }

    pub async fn remove_asset(
        &self,
        collection_id: &str,
        file_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[collection_id.into(), file_id.into()])
            .await
    }

    pub async fn remove_all_assets(
        &self,
        collection_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(CollectionAsset::TABLE)
            .eq("collection_id", collection_id)
            .execute(self.gateway.adapter())
            .await
    }
}
