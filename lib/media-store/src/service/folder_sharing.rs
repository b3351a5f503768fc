use chrono::{DateTime, Utc};
use table_gateway::{ValidatedEntity, time};

use super::{IssuedLink, scoped, stored, tenant_member};
use crate::dto::{FolderPermissionUserDto, FolderShareLinkDto};
use crate::entity::{Folder, FolderPermission, FolderShareLink};
use crate::secret::{self, LinkToken};
use crate::table::{FolderPermissionTable, FolderShareLinkTable, FolderTable, TenantMemberTable};
use crate::{Actor, Role, ServiceError, new_id};

/// Folder permissions and public folder links. A folder's creator is its
/// owner without a permission row.
#[derive(Clone)]
pub struct FolderSharingService {
    folders: FolderTable,
    permissions: FolderPermissionTable,
    links: FolderShareLinkTable,
    members: TenantMemberTable,
}

impl FolderSharingService {
    pub fn new(
        folders: FolderTable,
        permissions: FolderPermissionTable,
        links: FolderShareLinkTable,
        members: TenantMemberTable,
    ) -> Self {
        Self {
            folders,
            permissions,
            links,
            members,
        }
    }

    async fn folder(&self, actor: &Actor, folder_id: &str) -> Result<Folder, ServiceError> {
        scoped(actor, folder_id, self.folders.fetch_by_id(folder_id).await?)
    }

    async fn role_on(&self, actor: &Actor, folder: &Folder) -> Result<Option<Role>, ServiceError> {
        if folder.created_by.as_deref() == Some(actor.user_id.as_str()) {
            return Ok(Some(Role::Owner));
        }
        Ok(self
            .permissions
            .fetch_by_user_and_folder(&actor.tenant_id, &folder.folder_id, &actor.user_id)
            .await?
            .map(|permission| permission.role))
    }

    async fn shareable_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<(Folder, Role), ServiceError> {
        let folder = self.folder(actor, folder_id).await?;
        match self.role_on(actor, &folder).await? {
            Some(role) if role.can_share() => Ok((folder, role)),
            _ => Err(ServiceError::Forbidden(format!("you cannot share folder {folder_id}"))),
        }
    }

    pub async fn role_on_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<Option<Role>, ServiceError> {
        let folder = self.folder(actor, folder_id).await?;
        self.role_on(actor, &folder).await
    }

    pub async fn can_edit(&self, actor: &Actor, folder_id: &str) -> Result<bool, ServiceError> {
        Ok(self
            .role_on_folder(actor, folder_id)
            .await?
            .is_some_and(|role| role.can_edit()))
    }

    pub async fn people_with_access(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<Vec<FolderPermissionUserDto>, ServiceError> {
        self.folder(actor, folder_id).await?;
        Ok(self
            .permissions
            .fetch_people_with_access(&actor.tenant_id, folder_id)
            .await?)
    }

    /// Give a tenant member `role` on a folder, replacing their current role.
    pub async fn grant_access(
        &self,
        actor: &Actor,
        folder_id: &str,
        user_id: &str,
        role: Role,
        inherit_to_children: bool,
    ) -> Result<FolderPermission, ServiceError> {
        let (_, actor_role) = self.shareable_folder(actor, folder_id).await?;
        if user_id == actor.user_id {
            return Err(ServiceError::Forbidden("you cannot change your own role".to_string()));
        }
        if role == Role::Owner && actor_role != Role::Owner {
            return Err(ServiceError::Forbidden("only owners can grant ownership".to_string()));
        }
        tenant_member(&self.members, actor, user_id).await?;

        let permission = self
            .permissions
            .upsert_permission(
                &actor.tenant_id,
                folder_id,
                user_id,
                role,
                inherit_to_children,
                &actor.user_id,
            )
            .await?;
        let permission = stored("folder permission", permission)?;
        tracing::info!(tenant_id = %actor.tenant_id, folder_id, user_id, %role, "shared folder");
        Ok(permission)
    }

    /// Returns whether a permission was removed.
    pub async fn revoke_access(
        &self,
        actor: &Actor,
        folder_id: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        let (_, actor_role) = self.shareable_folder(actor, folder_id).await?;
        let current = self
            .permissions
            .fetch_by_user_and_folder(&actor.tenant_id, folder_id, user_id)
            .await?;
        match current {
            None => return Ok(false),
            Some(permission) if permission.is_owner() && actor_role != Role::Owner => {
                return Err(ServiceError::Forbidden(format!(
                    "a {actor_role} cannot remove the owner of folder {folder_id}"
                )));
            }
            Some(_) => {}
        }

        let removed = self
            .permissions
            .delete_permission(&actor.tenant_id, folder_id, user_id)
            .await?
            .success();
        if removed {
            tracing::info!(
                tenant_id = %actor.tenant_id,
                folder_id,
                user_id,
                "removed folder access",
            );
        }
        Ok(removed)
    }

    /// A new public link to a folder. The token is returned once.
    pub async fn create_link(
        &self,
        actor: &Actor,
        folder_id: &str,
        expires_dt: Option<DateTime<Utc>>,
        password: Option<&str>,
    ) -> Result<IssuedLink<FolderShareLink>, ServiceError> {
        let now = time::now();
        if expires_dt.is_some_and(|expires| expires <= now) {
            return Err(ServiceError::InvalidArgument("link expiry is in the past".to_string()));
        }
        self.shareable_folder(actor, folder_id).await?;

        let token = LinkToken::generate();
        let password_hash = match password {
            Some(password) => Some(secret::hash_password(password)?),
            None => None,
        };
        let link = FolderShareLink {
            share_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            folder_id: folder_id.to_string(),
            token_hash: token.token_hash,
            expires_dt,
            password_hash,
            created_by: Some(actor.user_id.clone()),
            created_dt: Some(now),
            revoked_dt: None,
        }
        .validated()?;
        let link = stored("share link", self.links.insert(&link).await?)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            folder_id,
            share_id = %link.share_id,
            "created folder link",
        );
        Ok(IssuedLink {
            link,
            token: Some(token.token),
        })
    }

    async fn managed_link(
        &self,
        actor: &Actor,
        share_id: &str,
    ) -> Result<FolderShareLink, ServiceError> {
        let link = scoped(actor, share_id, self.links.fetch_by_id(share_id).await?)?;
        self.shareable_folder(actor, &link.folder_id).await?;
        Ok(link)
    }

    /// Returns whether an open link was revoked.
    pub async fn revoke_link(&self, actor: &Actor, share_id: &str) -> Result<bool, ServiceError> {
        self.managed_link(actor, share_id).await?;
        let revoked = self.links.revoke_link(&actor.tenant_id, share_id).await?.success();
        if revoked {
            tracing::info!(tenant_id = %actor.tenant_id, share_id, "revoked folder link");
        }
        Ok(revoked)
    }

    pub async fn delete_link(&self, actor: &Actor, share_id: &str) -> Result<bool, ServiceError> {
        self.managed_link(actor, share_id).await?;
        let deleted = self.links.delete_link(&actor.tenant_id, share_id).await?.success();
        tracing::info!(tenant_id = %actor.tenant_id, share_id, deleted, "deleted folder link");
        Ok(deleted)
    }

    pub async fn links(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<Vec<FolderShareLinkDto>, ServiceError> {
        self.folder(actor, folder_id).await?;
        Ok(self
            .links
            .fetch_by_folder_with_details(&actor.tenant_id, folder_id)
            .await?)
    }

    /// The link and live folder behind a public token.
    pub async fn resolve_link(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<(FolderShareLink, Folder), ServiceError> {
        let link = self
            .links
            .fetch_by_token(&secret::hash_token(token))
            .await?
            .ok_or_else(|| ServiceError::not_found("share link", "for the given token"))?;
        link.state().admit(password, time::now())?;

        let folder = self
            .folders
            .fetch_by_id(&link.folder_id)
            .await?
            .filter(|folder| folder.tenant_id == link.tenant_id)
            .ok_or_else(|| ServiceError::not_found("folder", link.folder_id.clone()))?;
        Ok((link, folder))
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

    fn service(mock: &Arc<MockAdapter>) -> FolderSharingService {
        FolderSharingService::new(
            FolderTable::new(mock.clone()),
            FolderPermissionTable::new(mock.clone()),
            FolderShareLinkTable::new(mock.clone()),
            TenantMemberTable::new(mock.clone()),
        )
    }

    fn folder_row(tenant_id: &str, created_by: &str) -> Row {
        Row::new()
            .with("folder_id", "f1")
            .with("tenant_id", tenant_id)
            .with("parent_folder_id", "root")
            .with("name", "Launch")
            .with("created_by", created_by)
            .with("created_dt", Value::Null)
            .with("deleted_at", Value::Null)
            .with("deleted_by", Value::Null)
    }

    fn folder_permission_row(user_id: &str, role: &str) -> Row {
        Row::new()
            .with("permission_id", "p1")
            .with("tenant_id", "x")
            .with("folder_id", "f1")
            .with("user_id", user_id)
            .with("group_id", Value::Null)
            .with("role", role)
            .with("inherit_to_children", true)
            .with("created_by", "u1")
            .with("created_dt", Value::Null)
    }

    fn link_row(tenant_id: &str) -> Row {
        Row::new()
            .with("share_id", "s1")
            .with("tenant_id", tenant_id)
            .with("folder_id", "f1")
            .with("token_hash", "a".repeat(64))
            .with("expires_dt", Value::Null)
            .with("password_hash", Value::Null)
            .with("created_by", "u1")
            .with("created_dt", Value::Null)
            .with("revoked_dt", Value::Null)
    }

    #[tokio::test]
    async fn creators_own_their_folders() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("x", "u1")])
                .append_rows(vec![member_row("x", "u2")])
                .append_rows(vec![folder_permission_row("u2", "commenter")]),
        );

        let permission = service(&mock)
            .grant_access(&Actor::new("u1", "x"), "f1", "u2", Role::Commenter, true)
            .await
            .unwrap();

        assert_eq!(permission.role, Role::Commenter);
        let statements = mock.statements();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2].kind, StatementKind::Insert);
    }

    #[tokio::test]
    async fn editors_cannot_grant_ownership() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("x", "u1")])
                .append_rows(vec![folder_permission_row("u2", "editor")]),
        );

        assert_matches!(
            service(&mock)
                .grant_access(&Actor::new("u2", "x"), "f1", "u3", Role::Owner, true)
                .await,
            Err(ServiceError::Forbidden(_))
        );
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn granting_to_a_non_member_is_refused() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("x", "u1")])
                .append_rows(Vec::new()),
        );

        assert_matches!(
            service(&mock)
                .grant_access(&Actor::new("u1", "x"), "f1", "u-of-y", Role::Viewer, false)
                .await,
            Err(ServiceError::NotFound { entity: "user", .. })
        );
        assert_eq!(mock.statements().len(), 2);
    }

    #[tokio::test]
    async fn links_of_other_tenants_cannot_be_revoked() {
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![link_row("y")]));

        assert_matches!(
            service(&mock).revoke_link(&Actor::new("u1", "x"), "s1").await,
            Err(ServiceError::AccessDenied { entity: "share link", .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn created_links_store_only_the_digest() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("x", "u1")])
                .append_rows(vec![link_row("x")]),
        );

        let issued = service(&mock)
            .create_link(&Actor::new("u1", "x"), "f1", None, None)
            .await
            .unwrap();

        let token = issued.token.unwrap();
        let insert = mock.last_statement().unwrap();
        assert!(insert.params.contains(&Value::from(secret::hash_token(&token))));
        assert!(!insert.sql.contains("password_hash"));
    }

    #[tokio::test]
    async fn expired_links_do_not_resolve() {
        let expired = link_row("x").with("expires_dt", "2020-01-01T00:00:00Z");
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![expired]));

        assert_matches!(
            service(&mock).resolve_link("anything", None).await,
            Err(ServiceError::LinkUnavailable { reason: "expired", .. })
        );
    }
}
