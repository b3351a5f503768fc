use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Entity, GatewayError, Order, Page, Row, Select, TableGateway,
    WriteResult, time,
};

use super::qualified;
use crate::dto::TenantMemberUserDto;
use crate::entity::TenantMember;

/// Gateway for `tenant_member`, keyed by `(tenant_id, user_id)`.
#[derive(Clone)]
pub struct TenantMemberTable {
    gateway: TableGateway<TenantMember>,
}

impl TenantMemberTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<TenantMember> {
        &self.gateway
    }

    pub async fn fetch(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Option<TenantMember>, GatewayError> {
        self.gateway
            .fetch_by_key(&[tenant_id.into(), user_id.into()])
            .await
    }

    pub async fn fetch_by_tenant_id(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<TenantMember>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tenant_id", tenant_id)
            .order("created_dt", Order::Asc)
            .order("user_id", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    /// Memberships of a user, newest first.
    pub async fn fetch_by_user_id(&self, user_id: &str) -> Result<Vec<TenantMember>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("user_id", user_id)
            .order("created_dt", Order::Desc);
        self.gateway.fetch_entities(select).await
    }

    /// Members with their user details, oldest membership first. All of them
    /// without a page.
    pub async fn fetch_members_with_user_details(
        &self,
        tenant_id: &str,
        page: Option<Page>,
    ) -> Result<Vec<TenantMemberUserDto>, GatewayError> {
        let mut select = Select::new()
            .from_as("tm", TenantMember::TABLE, qualified("tm", TenantMember::columns()))
            .columns([
                ("user_email", "u.email"),
                ("user_display_name", "u.display_name"),
            ])
            .join("u", "app_user", "u.user_id = tm.user_id")
            .eq("tm.tenant_id", tenant_id)
            .order("tm.created_dt", Order::Asc)
            .order("tm.user_id", Order::Asc);
        if let Some(page) = page {
            select = select.paginate(page);
        }
        self.gateway.fetch_projection(select).await
    }

    pub async fn add_member(
        &self,
        tenant_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<Option<TenantMember>, GatewayError> {
        let row = Row::new()
            .with("tenant_id", tenant_id)
            .with("user_id", user_id)
            .with("role", role)
            .with("created_dt", time::now());
        self.gateway.insert(row).await
    }

    pub async fn remove_member(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[tenant_id.into(), user_id.into()])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Value};

    #[tokio::test]
    async fn membership_is_looked_up_by_both_keys() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(Vec::new()));
        let members = TenantMemberTable::new(mock.clone());

        assert_eq!(members.fetch("x", "u9").await.unwrap(), None);
        let statement = mock.last_statement().unwrap();
        assert_eq!(
            statement.sql,
            "SELECT tenant_id, user_id, role, created_dt FROM tenant_member \
             WHERE tenant_id = $1 AND user_id = $2 LIMIT 1"
        );
        assert_eq!(statement.params, vec![Value::from("x"), Value::from("u9")]);
    }

    #[tokio::test]
    async fn member_details_page_when_asked() {
        let member = Row::new()
            .with("tenant_id", "x")
            .with("user_id", "u1")
            .with("role", "admin")
            .with("created_dt", Value::Null)
            .with("user_email", "ana@example.com")
            .with("user_display_name", Value::Null);
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![member])
                .append_rows(Vec::new()),
        );
        let members = TenantMemberTable::new(mock.clone());

        let all = members.fetch_members_with_user_details("x", None).await.unwrap();
        members
            .fetch_members_with_user_details("x", Some(Page::new(3, 20)))
            .await
            .unwrap();

        assert_eq!(all[0].user_email.as_deref(), Some("ana@example.com"));
        let statements = mock.statements();
        assert!(statements[0].sql.ends_with("ORDER BY tm.created_dt ASC, tm.user_id ASC"));
        assert!(statements[1].sql.ends_with("LIMIT 20 OFFSET 40"));
    }
}
