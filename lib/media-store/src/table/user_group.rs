use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Select, TableGateway, WriteResult,
};

use super::{qualified, without_key};
use crate::dto::UserGroupDto;
use crate::entity::UserGroup;

#[derive(Clone)]
pub struct UserGroupTable {
    gateway: TableGateway<UserGroup>,
}

impl UserGroupTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<UserGroup> {
        &self.gateway
    }

    pub async fn fetch_by_id(&self, group_id: &str) -> Result<Option<UserGroup>, GatewayError> {
        self.gateway.fetch_by_id(group_id).await
    }

    pub async fn fetch_by_tenant_id(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<UserGroup>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .order("name", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// Tenant's groups with their member counts, by name.
    pub async fn fetch_by_tenant_with_details(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<UserGroupDto>, GatewayError> {
        let select = Select::new()
            .from_as("g", UserGroup::TABLE, qualified("g", UserGroup::columns()))
            .columns([("member_count", "COUNT(m.user_id)")])
            .join_left("m", "user_group_member", "m.group_id = g.group_id")
            .eq("g.tenant_id", tenant_id)
            .group_by("g.group_id")
            .group_by("g.tenant_id")
            .group_by("g.name")
            .group_by("g.created_dt")
            .order("g.name", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn insert(&self, group: &UserGroup) -> Result<Option<UserGroup>, GatewayError> {
        self.gateway.insert(group.object_copy()).await
    }

    pub async fn update(&self, group: &UserGroup) -> Result<WriteResult, GatewayError> {
        self.gateway
            .update_by_id(group.group_id.as_str(), without_key(group))
            .await
    }

    pub async fn delete_by_id(&self, group_id: &str) -> Result<WriteResult, GatewayError> {
        self.gateway.delete_by_id(group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, Value};

    #[tokio::test]
    async fn empty_groups_report_zero_members() {
        let row = Row::new()
            .with("group_id", "g1")
            .with("tenant_id", "x")
            .with("name", "Editors")
            .with("created_dt", Value::Null)
            .with("member_count", 0i64);
        let mock = Arc::new(MockAdapter::new(Dialect::MySql).append_rows(vec![row]));
        let groups = UserGroupTable::new(mock.clone());

        let details = groups.fetch_by_tenant_with_details("x").await.unwrap();

        assert_eq!(details[0].member_count, 0);
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "SELECT g.group_id AS group_id, g.tenant_id AS tenant_id, g.name AS name, \
             g.created_dt AS created_dt, COUNT(m.user_id) AS member_count \
             FROM user_group AS g LEFT JOIN user_group_member AS m ON m.group_id = g.group_id \
             WHERE g.tenant_id = ? GROUP BY g.group_id, g.tenant_id, g.name, g.created_dt \
             ORDER BY g.name ASC"
        );
    }

    #[tokio::test]
    async fn delete_by_id_targets_one_group() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_exec(0, None));
        let groups = UserGroupTable::new(mock.clone());

        assert!(!groups.delete_by_id("missing").await.unwrap().success());
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "DELETE FROM user_group WHERE group_id = $1"
        );
    }
}
