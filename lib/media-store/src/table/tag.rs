use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Select, TableGateway, WriteResult,
};

use super::{qualified, without_key};
use crate::dto::TagDto;
use crate::entity::Tag;

#[derive(Clone)]
pub struct TagTable {
    gateway: TableGateway<Tag>,
}

impl TagTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<Tag> {
        &self.gateway
    }

    pub async fn fetch_by_id(&self, tag_id: &str) -> Result<Option<Tag>, GatewayError> {
        self.gateway.fetch_by_id(tag_id).await
    }

    pub async fn fetch_by_tenant_id(&self, tenant_id: &str) -> Result<Vec<Tag>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .order("name", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_tenant_and_name(
        &self,
        tenant_id: &str,
        name: &str,
    ) -> Result<Option<Tag>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .eq("name", name);
        self.gateway.fetch_entity(select).await
    }

    /// Tenant's tags with the number of files carrying each, by name.
    pub async fn fetch_by_tenant_with_details(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<TagDto>, GatewayError> {
        let select = Select::new()
            .from_as("t", Tag::TABLE, qualified("t", Tag::columns()))
            .columns([("asset_count", "COUNT(at.file_id)")])
            .join_left("at", "asset_tag", "at.tag_id = t.tag_id")
            .eq("t.tenant_id", tenant_id)
            .group_by("t.tag_id")
            .group_by("t.tenant_id")
            .group_by("t.name")
            .group_by("t.created_dt")
            .order("t.name", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn insert(&self, tag: &Tag) -> Result<Option<Tag>, GatewayError> {
        self.gateway.insert(tag.object_copy()).await
    }

    pub async fn update(&self, tag: &Tag) -> Result<WriteResult, GatewayError> {
        self.gateway
            .update_by_id(tag.tag_id.as_str(), without_key(tag))
            .await
    }

    pub async fn delete_by_id(&self, tag_id: &str) -> Result<WriteResult, GatewayError> {
        self.gateway.delete_by_id(tag_id).await
    }
}
