//! Use cases over the table gateways.
//!
//! Every call takes the [`Actor`] it runs for. Records of other tenants are
//! reported as [`ServiceError::AccessDenied`], missing ones as
//! [`ServiceError::NotFound`].

mod collection;
mod file;
mod folder;
mod folder_sharing;
mod group;
mod member;
mod sharing;
mod star;
mod tag;
mod usage;

pub use collection::CollectionService;
pub use file::{FileService, NewUpload};
pub use folder::{FolderNode, FolderService, ROOT_FOLDER_NAME};
pub use folder_sharing::FolderSharingService;
pub use group::GroupService;
pub use member::MemberService;
pub use sharing::{FileSharingService, IssuedLink, PublicLinkOptions, SharingStatus};
pub use star::StarService;
pub use tag::TagService;
pub use usage::UsageService;

use crate::entity::{
    Collection, FileMetadata, Folder, FolderShareLink, Tag, TenantMember, UserGroup,
};
use crate::table::{FileMetadataTable, TenantMemberTable};
use crate::{Actor, ServiceError};

/// Records scoped to one tenant.
trait TenantScoped {
    const NAME: &'static str;

    fn tenant_id(&self) -> &str;
}

impl TenantScoped for Folder {
    const NAME: &'static str = "folder";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantScoped for Tag {
    const NAME: &'static str = "tag";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantScoped for Collection {
    const NAME: &'static str = "collection";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantScoped for UserGroup {
    const NAME: &'static str = "group";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantScoped for FileMetadata {
    const NAME: &'static str = "file";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl TenantScoped for FolderShareLink {
    const NAME: &'static str = "share link";

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

/// The fetched record, if it exists and belongs to the actor's tenant.
fn scoped<T: TenantScoped>(actor: &Actor, id: &str, found: Option<T>) -> Result<T, ServiceError> {
    match found {
        None => Err(ServiceError::not_found(T::NAME, id)),
        Some(record) if !actor.owns(record.tenant_id()) => {
            tracing::warn!(
                entity = T::NAME,
                id,
                tenant_id = %actor.tenant_id,
                "cross-tenant access refused"
            );
            Err(ServiceError::access_denied(T::NAME, id))
        }
        Some(record) => Ok(record),
    }
}

/// A live file of the actor's tenant.
async fn tenant_file(
    files: &FileMetadataTable,
    actor: &Actor,
    file_id: &str,
) -> Result<FileMetadata, ServiceError> {
    scoped(actor, file_id, files.fetch_by_id(file_id).await?)
}

/// The membership of `user_id` in the actor's tenant. Users of other tenants
/// are reported as missing.
async fn tenant_member(
    members: &TenantMemberTable,
    actor: &Actor,
    user_id: &str,
) -> Result<TenantMember, ServiceError> {
    match members.fetch(&actor.tenant_id, user_id).await? {
        Some(member) => Ok(member),
        None => {
            tracing::warn!(user_id, tenant_id = %actor.tenant_id, "user is not a tenant member");
            Err(ServiceError::not_found("user", user_id))
        }
    }
}

/// The row a gateway insert read back.
fn stored<T>(entity: &'static str, inserted: Option<T>) -> Result<T, ServiceError> {
    inserted.ok_or_else(|| ServiceError::Conflict(format!("{entity} was not stored")))
}
