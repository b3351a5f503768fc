use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use table_gateway::{ValidatedEntity, time};

use super::{stored, tenant_file, tenant_member};
use crate::dto::{FilePermissionUserDto, ShareLinkDto};
use crate::entity::{FileMetadata, FilePermission, ShareLink};
use crate::secret::{self, LinkToken};
use crate::table::{FileMetadataTable, FilePermissionTable, ShareLinkTable, TenantMemberTable};
use crate::{Actor, Role, ServiceError, new_id};

/// Settings of a public file link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicLinkOptions {
    pub role: Role,
    pub expires_dt: Option<DateTime<Utc>>,
    pub password: Option<String>,
}

/// A link plus its token. The token is only known when the link was just
/// created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedLink<L> {
    pub link: L,
    pub token: Option<String>,
}

/// Who can reach a file and how.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharingStatus {
    pub general_access: String,
    pub active_link: Option<ShareLink>,
    pub people: Vec<FilePermissionUserDto>,
}

/// Per-user file permissions and public file links.
#[derive(Clone)]
pub struct FileSharingService {
    files: FileMetadataTable,
    permissions: FilePermissionTable,
    links: ShareLinkTable,
    members: TenantMemberTable,
}

impl FileSharingService {
    pub fn new(
        files: FileMetadataTable,
        permissions: FilePermissionTable,
        links: ShareLinkTable,
        members: TenantMemberTable,
    ) -> Self {
        Self {
            files,
            permissions,
            links,
            members,
        }
    }

    /// The actor's role on a file of their tenant, if any.
    pub async fn role_on_file(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Option<Role>, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        Ok(self
            .permissions
            .fetch_by_user_and_file(&actor.tenant_id, file_id, &actor.user_id)
            .await?
            .map(|permission| permission.role))
    }

    /// The file and the actor's role on it. Only owners and editors share.
    async fn shareable_file(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<(FileMetadata, Role), ServiceError> {
        let file = tenant_file(&self.files, actor, file_id).await?;
        let role = self
            .permissions
            .fetch_by_user_and_file(&actor.tenant_id, file_id, &actor.user_id)
            .await?
            .map(|permission| permission.role);
        match role {
            Some(role) if role.can_share() => Ok((file, role)),
            Some(role) => Err(ServiceError::Forbidden(format!(
                "a {role} cannot share file {file_id}"
            ))),
            None => Err(ServiceError::Forbidden(format!("no access to file {file_id}"))),
        }
    }

    pub async fn people_with_access(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Vec<FilePermissionUserDto>, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        Ok(self
            .permissions
            .fetch_people_with_access(&actor.tenant_id, file_id)
            .await?)
    }

    /// Give a member of the tenant `role` on a file, replacing their current
    /// role. Editors can neither grant ownership nor change an owner.
    pub async fn share_with_user(
        &self,
        actor: &Actor,
        file_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<FilePermission, ServiceError> {
        if role == Role::Commenter {
            return Err(ServiceError::InvalidArgument("files have no commenter role".to_string()));
        }
        let (_, actor_role) = self.shareable_file(actor, file_id).await?;
        if user_id == actor.user_id {
            return Err(ServiceError::Forbidden("you cannot change your own role".to_string()));
        }
        tenant_member(&self.members, actor, user_id).await?;

        if actor_role != Role::Owner {
            if role == Role::Owner {
                return Err(ServiceError::Forbidden("only owners can grant ownership".to_string()));
            }
            let current = self
                .permissions
                .fetch_by_user_and_file(&actor.tenant_id, file_id, user_id)
                .await?;
            if current.is_some_and(|permission| permission.is_owner()) {
                return Err(ServiceError::Forbidden(format!(
                    "a {actor_role} cannot change the owner of file {file_id}"
                )));
            }
        }

        let permission = self
            .permissions
            .upsert_permission(&actor.tenant_id, file_id, user_id, role, &actor.user_id)
            .await?;
        let permission = stored("file permission", permission)?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, user_id, %role, "shared file");
        Ok(permission)
    }

    /// Returns whether a permission was removed.
    pub async fn remove_user_access(
        &self,
        actor: &Actor,
        file_id: &str,
        user_id: &str,
    ) -> Result<bool, ServiceError> {
        let (_, actor_role) = self.shareable_file(actor, file_id).await?;
        let Some(current) = self
            .permissions
            .fetch_by_user_and_file(&actor.tenant_id, file_id, user_id)
            .await?
        else {
            return Ok(false);
        };
        if current.is_owner() && actor_role != Role::Owner {
            return Err(ServiceError::Forbidden(format!(
                "a {actor_role} cannot remove the owner of file {file_id}"
            )));
        }
        if current.is_owner() && user_id == actor.user_id {
            return Err(ServiceError::Forbidden(
                "owners cannot remove their own access".to_string(),
            ));
        }

        let removed = self
            .permissions
            .delete_by_file_and_user(&actor.tenant_id, file_id, user_id)
            .await?
            .success();
        if removed {
            tracing::info!(tenant_id = %actor.tenant_id, file_id, user_id, "removed file access");
        }
        Ok(removed)
    }

    /// Open a file to anyone with its link. An active link is reused with the
    /// requested role and returned without a token.
    pub async fn create_public_link(
        &self,
        actor: &Actor,
        file_id: &str,
        options: PublicLinkOptions,
    ) -> Result<IssuedLink<ShareLink>, ServiceError> {
        if !matches!(options.role, Role::Viewer | Role::Editor) {
            return Err(ServiceError::InvalidArgument(format!(
                "links cannot grant the {} role",
                options.role
            )));
        }
        let now = time::now();
        if options.expires_dt.is_some_and(|expires| expires <= now) {
            return Err(ServiceError::InvalidArgument("link expiry is in the past".to_string()));
        }
        self.shareable_file(actor, file_id).await?;
        self.files
            .set_general_access(
                &actor.tenant_id,
                file_id,
                FileMetadata::ACCESS_ANYONE_WITH_LINK,
                &actor.user_id,
            )
            .await?;

        if let Some(mut link) = self.links.fetch_active_by_file_id(file_id, now).await? {
            if link.role != options.role {
                self.links.set_role(&link.share_id, options.role).await?;
                link.role = options.role;
            }
            return Ok(IssuedLink { link, token: None });
        }

        let token = LinkToken::generate();
        let password_hash = match options.password.as_deref() {
            Some(password) => Some(secret::hash_password(password)?),
            None => None,
        };
        let link = ShareLink {
            share_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            file_id: file_id.to_string(),
            token_hash: token.token_hash,
            expires_dt: options.expires_dt,
            password_hash,
            created_by: Some(actor.user_id.clone()),
            created_dt: Some(now),
            revoked_dt: None,
            role: options.role,
        }
        .validated()?;
        let link = stored("share link", self.links.insert(&link).await?)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            file_id,
            share_id = %link.share_id,
            "created public link",
        );
        Ok(IssuedLink {
            link,
            token: Some(token.token),
        })
    }

    /// Restrict a file again and revoke its links. Returns whether a link
    /// was revoked.
    pub async fn revoke_public_link(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<bool, ServiceError> {
        self.shareable_file(actor, file_id).await?;
        self.files
            .set_general_access(
                &actor.tenant_id,
                file_id,
                FileMetadata::ACCESS_RESTRICTED,
                &actor.user_id,
            )
            .await?;
        let revoked = self.links.revoke(&actor.tenant_id, file_id).await?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            file_id,
            revoked = revoked.affected_rows,
            "revoked public links"
        );
        Ok(revoked.success())
    }

    pub async fn active_public_link(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Option<ShareLink>, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        Ok(self.links.fetch_active_by_file_id(file_id, time::now()).await?)
    }

    pub async fn links(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Vec<ShareLinkDto>, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        Ok(self.links.fetch_dtos_by_file_id(file_id).await?)
    }

    pub async fn sharing_status(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<SharingStatus, ServiceError> {
        let file = tenant_file(&self.files, actor, file_id).await?;
        let active_link = self.links.fetch_active_by_file_id(file_id, time::now()).await?;
        let people = self
            .permissions
            .fetch_people_with_access(&actor.tenant_id, file_id)
            .await?;
        Ok(SharingStatus {
            general_access: file.general_access,
            active_link,
            people,
        })
    }

    /// The link and live file behind a public token. No actor is involved.
    pub async fn resolve_link(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<(ShareLink, FileMetadata), ServiceError> {
        let token_hash = secret::hash_token(token);
        let link = self
            .links
            .fetch_by_token(&token_hash)
            .await?
            .ok_or_else(|| ServiceError::not_found("share link", "for the given token"))?;
        link.state().admit(password, time::now())?;

        let file = self
            .files
            .fetch_by_id(&link.file_id)
            .await?
            .filter(|file| file.tenant_id == link.tenant_id)
            .ok_or_else(|| ServiceError::not_found("file", link.file_id.clone()))?;
        Ok((link, file))
    }
}
