use std::sync::Arc;

use chrono::{DateTime, Utc};
use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Select, TableGateway, Update, WriteResult,
    time,
};

use super::qualified;
use crate::Role;
use crate::dto::ShareLinkDto;
use crate::entity::ShareLink;

/// Gateway for `share_link`, public links to single files.
#[derive(Clone)]
pub struct ShareLinkTable {
    gateway: TableGateway<ShareLink>,
}

impl ShareLinkTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<ShareLink> {
        &self.gateway
    }

    pub async fn fetch_by_id(&self, share_id: &str) -> Result<Option<ShareLink>, GatewayError> {
        self.gateway.fetch_by_id(share_id).await
    }

    pub async fn fetch_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ShareLink>, GatewayError> {
        let select = self.gateway.select().eq("token_hash", token_hash);
        self.gateway.fetch_entity(select).await
    }

    /// Every link of a file, newest first.
    pub async fn fetch_by_file_id(&self, file_id: &str) -> Result<Vec<ShareLink>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("file_id", file_id)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    /// The newest unrevoked link of a file that has not expired by `now`.
    pub async fn fetch_active_by_file_id(
        &self,
        file_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("file_id", file_id)
            .is_null("revoked_dt")
            .is_null("expires_dt")
            .or_where("expires_dt > ?", now)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entity(select).await
    }

    fn details(&self) -> Select {
        Select::new()
            .from_as(
                "sl",
                ShareLink::TABLE,
                qualified(
                    "sl",
                    &[
                        "share_id",
                        "tenant_id",
                        "file_id",
                        "role",
                        "expires_dt",
                        "revoked_dt",
                        "created_by",
                        "created_dt",
                    ],
                ),
            )
            .columns([
                ("password_protected", "sl.password_hash IS NOT NULL"),
                ("original_filename", "fm.original_filename"),
                ("creator_display_name", "u.display_name"),
            ])
            .join_left("fm", "file_metadata", "fm.file_id = sl.file_id")
            .join_left("u", "app_user", "u.user_id = sl.created_by")
    }

    pub async fn fetch_dto_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ShareLinkDto>, GatewayError> {
        let select = self.details().eq("sl.token_hash", token_hash).limit(1);
        Ok(self.gateway.fetch_projection(select).await?.into_iter().next())
    }

    pub async fn fetch_dtos_by_file_id(
        &self,
        file_id: &str,
    ) -> Result<Vec<ShareLinkDto>, GatewayError> {
        let select = self
            .details()
            .eq("sl.file_id", file_id)
            .order("sl.created_dt", Order::Desc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn insert(&self, link: &ShareLink) -> Result<Option<ShareLink>, GatewayError> {
        self.gateway.insert(link.object_copy()).await
    }

    pub async fn set_role(&self, share_id: &str, role: Role) -> Result<WriteResult, GatewayError> {
        Update::for_table(ShareLink::TABLE)
            .set("role", role)
            .eq("share_id", share_id)
            .execute(self.gateway.adapter())
            .await
    }

    /// Revoke every open link of a file.
    pub async fn revoke(
        &self,
        tenant_id: &str,
        file_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Update::for_table(ShareLink::TABLE)
            .set("revoked_dt", time::now())
            .eq("tenant_id", tenant_id)
            .eq("file_id", file_id)
            .is_null("revoked_dt")
            .execute(self.gateway.adapter())
            .await
    }
}
