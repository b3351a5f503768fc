use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Row, Select, TableGateway,
    WriteResult, time,
};

use super::qualified;
use crate::dto::UserGroupMemberDto;
use crate::entity::UserGroupMember;

/// Gateway for `user_group_member`, keyed by `(group_id, user_id)`.
#[derive(Clone)]
pub struct UserGroupMemberTable {
    gateway: TableGateway<UserGroupMember>,
}

impl UserGroupMemberTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<UserGroupMember> {
        &self.gateway
    }

    pub async fn fetch(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<UserGroupMember>, GatewayError> {
        self.gateway
            .fetch_by_key(&[group_id.into(), user_id.into()])
            .await
    }

    pub async fn fetch_by_group_id(
        &self,
        group_id: &str,
    ) -> Result<Vec<UserGroupMember>, GatewayError> {
        self.gateway.fetch_by("group_id", group_id).await
    }

    pub async fn fetch_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserGroupMember>, GatewayError> {
        self.gateway.fetch_by("user_id", user_id).await
    }

    /// Members of a group with their user and group names.
    pub async fn fetch_by_group_with_user_details(
        &self,
        group_id: &str,
    ) -> Result<Vec<UserGroupMemberDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "m",
                UserGroupMember::TABLE,
                qualified("m", UserGroupMember::columns()),
            )
            .columns([
                ("user_email", "u.email"),
                ("user_display_name", "u.display_name"),
                ("group_name", "g.name"),
            ])
            .join_left("u", "app_user", "u.user_id = m.user_id")
            .join_left("g", "user_group", "g.group_id = m.group_id")
            .eq("m.group_id", group_id)
            .order("u.display_name", Order::Asc)
            .order("m.user_id", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<UserGroupMember>, GatewayError> {
        let row = Row::new()
            .with("group_id", group_id)
            .with("user_id", user_id)
            .with("created_dt", time::now());
        self.gateway.insert(row).await
    }

    pub async fn remove_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[group_id.into(), user_id.into()])
            .await
    }

    pub async fn remove_all_members(&self, group_id: &str) -> Result<WriteResult, GatewayError> {
        Delete::for_table(UserGroupMember::TABLE)
            .eq("group_id", group_id)
            .execute(self.gateway.adapter())
            .await
    }
}
