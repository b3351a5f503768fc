use table_gateway::Page;

use super::{stored, tenant_member};
use crate::dto::TenantMemberUserDto;
use crate::entity::TenantMember;
use crate::table::TenantMemberTable;
use crate::{Actor, ServiceError};

/// Tenant membership. Only admins change it.
#[derive(Clone)]
pub struct MemberService {
    members: TenantMemberTable,
}

impl MemberService {
    pub fn new(members: TenantMemberTable) -> Self {
        Self { members }
    }

    /// The actor's own membership.
    pub async fn membership(&self, actor: &Actor) -> Result<TenantMember, ServiceError> {
        tenant_member(&self.members, actor, &actor.user_id).await
    }

    pub async fn members(
        &self,
        actor: &Actor,
        page: Option<Page>,
    ) -> Result<Vec<TenantMemberUserDto>, ServiceError> {
        self.membership(actor).await?;
        Ok(self
            .members
            .fetch_members_with_user_details(&actor.tenant_id, page)
            .await?)
    }

    async fn admin(&self, actor: &Actor) -> Result<(), ServiceError> {
        if self.membership(actor).await?.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("tenant membership is managed by admins".to_string()))
        }
    }

    pub async fn add_member(
        &self,
        actor: &Actor,
        user_id: &str,
        role: &str,
    ) -> Result<TenantMember, ServiceError> {
        if role != TenantMember::ROLE_ADMIN && role != TenantMember::ROLE_MEMBER {
            return Err(ServiceError::InvalidArgument(format!("unknown member role {role}")));
        }
        self.admin(actor).await?;
        if self.members.fetch(&actor.tenant_id, user_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!("{user_id} is already a member")));
        }

        let member = stored(
            "member",
            self.members.add_member(&actor.tenant_id, user_id, role).await?,
        )?;
        tracing::info!(tenant_id = %actor.tenant_id, user_id, role, "added tenant member");
        Ok(member)
    }

    /// Returns whether a membership was removed. Admins cannot remove
    /// themselves.
    pub async fn remove_member(&self, actor: &Actor, user_id: &str) -> Result<bool, ServiceError> {
        if user_id == actor.user_id {
            return Err(ServiceError::Forbidden("you cannot leave as an admin".to_string()));
        }
        self.admin(actor).await?;
        let removed = self
            .members
            .remove_member(&actor.tenant_id, user_id)
            .await?
            .success();
        if removed {
            tracing::info!(tenant_id = %actor.tenant_id, user_id, "removed tenant member");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::member_row;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, StatementKind};

    fn service(mock: &Arc<MockAdapter>) -> MemberService {
        MemberService::new(TenantMemberTable::new(mock.clone()))
    }

    #[tokio::test]
    async fn members_cannot_add_members() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![member_row("x", "u1")]),
        );

        assert_matches!(
            service(&mock)
                .add_member(&Actor::new("u1", "x"), "u2", TenantMember::ROLE_MEMBER)
                .await,
            Err(ServiceError::Forbidden(_))
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn admins_add_members_once() {
        let admin = member_row("x", "u1").with("role", TenantMember::ROLE_ADMIN);
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![admin.clone()])
                .append_rows(Vec::new())
                .append_rows(vec![member_row("x", "u2")])
                .append_rows(vec![admin])
                .append_rows(vec![member_row("x", "u2")]),
        );
        let members = service(&mock);
        let actor = Actor::new("u1", "x");

        let added = members
            .add_member(&actor, "u2", TenantMember::ROLE_MEMBER)
            .await
            .unwrap();
        assert_eq!(added.user_id, "u2");
        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Insert);

        assert_matches!(
            members.add_member(&actor, "u2", TenantMember::ROLE_MEMBER).await,
            Err(ServiceError::Conflict(_))
        );
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn outsiders_see_no_member_list() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(Vec::new()));

        assert_matches!(
            service(&mock).members(&Actor::new("u9", "x"), None).await,
            Err(ServiceError::NotFound { entity: "user", .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn unknown_roles_are_rejected_before_any_query() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres));

        assert_matches!(
            service(&mock).add_member(&Actor::new("u1", "x"), "u2", "root").await,
            Err(ServiceError::InvalidArgument(_))
        );
        assert!(mock.statements().is_empty());
    }
}
