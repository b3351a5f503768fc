use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Page, Select, TableGateway, WriteResult,
};

use super::{qualified, without_key};
use crate::dto::CollectionDto;
use crate::entity::Collection;

#[derive(Clone)]
pub struct CollectionTable {
    gateway: TableGateway<Collection>,
}

impl CollectionTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<Collection> {
        &self.gateway
    }

    pub async fn fetch_by_id(
        &self,
        collection_id: &str,
    ) -> Result<Option<Collection>, GatewayError> {
        self.gateway.fetch_by_id(collection_id).await
    }

    /// One page of the tenant's collections, newest first.
    pub async fn fetch_by_tenant_id(
        &self,
        tenant_id: &str,
        page: Page,
    ) -> Result<Vec<Collection>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .order("created_dt", Order::Desc)
            .order("collection_id", Order::Asc)
            .paginate(page);
        self.gateway.fetch_entities(select).await
    }

    /// Collections with their creator's name and asset count, by name.
    pub async fn fetch_by_tenant_with_details(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<CollectionDto>, GatewayError> {
        let select = Select::new()
            .from_as("c", Collection::TABLE, qualified("c", Collection::columns()))
            .columns([
                ("creator_display_name", "u.display_name"),
                ("asset_count", "COUNT(ca.file_id)"),
            ])
            .join_left("u", "app_user", "u.user_id = c.created_by")
            .join_left("ca", "collection_asset", "ca.collection_id = c.collection_id")
            .eq("c.tenant_id", tenant_id)
            .group_by("c.collection_id")
            .group_by("u.display_name")
            .order("c.name", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn insert(
        &self,
        collection: &Collection,
    ) -> Result<Option<Collection>, GatewayError> {
        self.gateway.insert(collection.object_copy()).await
    }

    pub async fn update(&self, collection: &Collection) -> Result<WriteResult, GatewayError> {
        self.gateway
            .update_by_id(collection.collection_id.as_str(), without_key(collection))
            .await
    }

    pub async fn delete_by_id(&self, collection_id: &str) -> Result<WriteResult, GatewayError> {
        self.gateway.delete_by_id(collection_id).await
    }
}
