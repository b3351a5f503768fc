use table_gateway::{ValidatedEntity, time};

use super::{scoped, stored, tenant_member};
use crate::dto::{UserGroupDto, UserGroupMemberDto};
use crate::entity::{UserGroup, UserGroupMember};
use crate::table::{TenantMemberTable, UserGroupMemberTable, UserGroupTable};
use crate::{Actor, ServiceError, new_id};

#[derive(Clone)]
pub struct GroupService {
    groups: UserGroupTable,
    members: UserGroupMemberTable,
    tenant_members: TenantMemberTable,
}

impl GroupService {
    pub fn new(
        groups: UserGroupTable,
        members: UserGroupMemberTable,
        tenant_members: TenantMemberTable,
    ) -> Self {
        Self {
            groups,
            members,
            tenant_members,
        }
    }

    pub async fn group(&self, actor: &Actor, group_id: &str) -> Result<UserGroup, ServiceError> {
        scoped(actor, group_id, self.groups.fetch_by_id(group_id).await?)
    }

    /// The tenant's groups with member counts.
    pub async fn list_groups(&self, actor: &Actor) -> Result<Vec<UserGroupDto>, ServiceError> {
        Ok(self.groups.fetch_by_tenant_with_details(&actor.tenant_id).await?)
    }

    pub async fn create_group(&self, actor: &Actor, name: &str) -> Result<UserGroup, ServiceError> {
        let group = UserGroup {
            group_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            name: name.to_string(),
            created_dt: Some(time::now()),
        }
        .validated()?;

        let group = stored("group", self.groups.insert(&group).await?)?;
        tracing::info!(tenant_id = %actor.tenant_id, group_id = %group.group_id, "created group");
        Ok(group)
    }

    pub async fn rename_group(
        &self,
        actor: &Actor,
        group_id: &str,
        name: &str,
    ) -> Result<UserGroup, ServiceError> {
        let mut group = self.group(actor, group_id).await?;
        group.name = name.to_string();
        let group = group.validated()?;
        self.groups.update(&group).await?;
        tracing::info!(tenant_id = %actor.tenant_id, group_id, "renamed group");
        Ok(group)
    }

    /// Remove every membership, then the group.
    pub async fn delete_group(&self, actor: &Actor, group_id: &str) -> Result<(), ServiceError> {
        self.group(actor, group_id).await?;
        self.members.remove_all_members(group_id).await?;
        self.groups.delete_by_id(group_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, group_id, "deleted group");
        Ok(())
    }

    /// Add a member of the actor's tenant. Adding them twice returns the
    /// existing membership.
    pub async fn add_member(
        &self,
        actor: &Actor,
        group_id: &str,
        user_id: &str,
    ) -> Result<UserGroupMember, ServiceError> {
        self.group(actor, group_id).await?;
        tenant_member(&self.tenant_members, actor, user_id).await?;
        if let Some(existing) = self.members.fetch(group_id, user_id).await? {
            return Ok(existing);
        }
        let member = stored("group member", self.members.add_member(group_id, user_id).await?)?;
        tracing::info!(tenant_id = %actor.tenant_id, group_id, user_id, "added group member");
        Ok(member)
    }

    /// Returns whether a membership was removed.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        group_id: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        self.group(actor, group_id).await?;
        let removed = self.members.remove_member(group_id, user_id).await?.success();
        if removed {
            tracing::info!(
                tenant_id = %actor.tenant_id,
                group_id,
                user_id,
                "removed group member"
            );
        }
        Ok(removed)
    }

    pub async fn members(
        &self,
        actor: &Actor,
        group_id: &str,
    ) -> Result<Vec<UserGroupMemberDto>, ServiceError> {
        self.group(actor, group_id).await?;
        Ok(self.members.fetch_by_group_with_user_details(group_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::member_row;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, StatementKind, Value};

    fn group_row(tenant_id: &str) -> Row {
        Row::new()
            .with("group_id", "g1")
            .with("tenant_id", tenant_id)
            .with("name", "Editors")
            .with("created_dt", Value::Null)
    }

    fn service(mock: &Arc<MockAdapter>) -> GroupService {
        GroupService::new(
            UserGroupTable::new(mock.clone()),
            UserGroupMemberTable::new(mock.clone()),
            TenantMemberTable::new(mock.clone()),
        )
    }

    fn actor() -> Actor {
        Actor::new("u1", "x")
    }

    #[tokio::test]
    async fn members_of_an_empty_group() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![group_row("x")])
                .append_rows(Vec::new()),
        );

        let members = service(&mock).members(&actor(), "g1").await.unwrap();

        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn remove_member_reports_whether_anything_changed() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![group_row("x")])
                .append_exec(0, None),
        );

        let removed = service(&mock)
            .remove_member(&actor(), "g1", "u2")
            .await
            .unwrap();

        assert!(!removed);
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "DELETE FROM user_group_member WHERE group_id = $1 AND user_id = $2"
        );
    }

    #[tokio::test]
    async fn delete_group_clears_memberships_first() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::MySql)
                .append_rows(vec![group_row("x")])
                .append_exec(4, None)
                .append_exec(1, None),
        );

        service(&mock).delete_group(&actor(), "g1").await.unwrap();

        let statements = mock.statements();
        assert_eq!(statements[1].sql, "DELETE FROM user_group_member WHERE group_id = ?");
        assert_eq!(statements[2].sql, "DELETE FROM user_group WHERE group_id = ?");
    }

    #[tokio::test]
    async fn failed_inserts_surface_as_conflicts() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_exec(0, None));

        assert_matches!(
            service(&mock).create_group(&actor(), "Editors").await,
            Err(ServiceError::Conflict(message)) if message == "group was not stored"
        );
    }

    #[tokio::test]
    async fn users_of_other_tenants_cannot_join_a_group() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![group_row("x")])
                .append_rows(Vec::new())
                .append_rows(Vec::new()),
        );

        assert_matches!(
            service(&mock).add_member(&actor(), "g1", "user-of-tenant-y").await,
            Err(ServiceError::NotFound { entity: "user", .. })
        );
        let statements = mock.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[1]
            .sql
            .starts_with("SELECT tenant_id, user_id, role, created_dt FROM tenant_member"));
        assert_eq!(mock.pending(), 1);
    }

    #[tokio::test]
    async fn tenant_members_join_a_group() {
        let membership = Row::new()
            .with("group_id", "g1")
            .with("user_id", "u2")
            .with("created_dt", Value::Null);
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![group_row("x")])
                .append_rows(vec![member_row("x", "u2")])
                .append_rows(Vec::new())
                .append_rows(vec![membership]),
        );

        let member = service(&mock).add_member(&actor(), "g1", "u2").await.unwrap();

        assert_eq!(member.user_id, "u2");
        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Insert);
    }
}
