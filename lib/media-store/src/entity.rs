//! Records mirroring the media store's tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use table_gateway::Entity;
use validator::{Validate, ValidationError};

use crate::Role;
use crate::secret::LinkState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "folder")]
pub struct Folder {
    #[column(key)]
    pub folder_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    /// `None` for the tenant's root folder.
    pub parent_folder_id: Option<String>,
    #[column(trim)]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl Folder {
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "tag")]
pub struct Tag {
    #[column(key)]
    pub tag_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[column(trim)]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub created_dt: Option<DateTime<Utc>>,
}

/// Link between a stored file and a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "asset_tag")]
pub struct AssetTag {
    #[column(key)]
    #[validate(length(min = 1))]
    pub file_id: String,
    #[column(key)]
    #[validate(length(min = 1))]
    pub tag_id: String,
    pub created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "collection")]
pub struct Collection {
    #[column(key)]
    pub collection_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[column(trim)]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[column(trim)]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub created_by: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub updated_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "collection_asset")]
pub struct CollectionAsset {
    #[column(key)]
    #[validate(length(min = 1))]
    pub collection_id: String,
    #[column(key)]
    #[validate(length(min = 1))]
    pub file_id: String,
    pub created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "user_group")]
pub struct UserGroup {
    #[column(key)]
    pub group_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[column(trim)]
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "user_group_member")]
pub struct UserGroupMember {
    #[column(key)]
    #[validate(length(min = 1))]
    pub group_id: String,
    #[column(key)]
    #[validate(length(min = 1))]
    pub user_id: String,
    pub created_dt: Option<DateTime<Utc>>,
}

/// Per-tenant usage counters for one UTC day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "usage_daily")]
pub struct UsageDaily {
    #[column(key)]
    pub usage_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(required)]
    pub day: Option<NaiveDate>,
    pub storage_bytes: i64,
    pub egress_bytes: i64,
    pub uploads_count: i64,
    pub downloads_count: i64,
    pub transforms_count: i64,
}

/// A stored file. Rows are soft-deleted through `deleted_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "file_metadata")]
pub struct FileMetadata {
    #[column(key)]
    pub file_id: String,
    pub folder_id: Option<String>,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[column(trim)]
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[column(trim)]
    #[validate(length(min = 1, max = 255))]
    pub original_filename: String,
    pub content_type: Option<String>,
    #[validate(range(min = 0))]
    pub size_bytes: Option<i64>,
    pub checksum_sha256: Option<String>,
    pub record_status: String,
    pub record_sub_status: String,
    pub visibility: String,
    #[validate(custom(function = "validate_general_access"))]
    pub general_access: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_dt: Option<DateTime<Utc>>,
}

impl FileMetadata {
    pub const STATUS_UPLOAD: &'static str = "upload";
    pub const SUB_STATUS_PENDING: &'static str = "pending";
    pub const SUB_STATUS_COMPLETED: &'static str = "completed";
    pub const SUB_STATUS_FAILED: &'static str = "failed";
    pub const VISIBILITY_PRIVATE: &'static str = "private";
    pub const ACCESS_RESTRICTED: &'static str = "restricted";
    pub const ACCESS_ANYONE_WITH_LINK: &'static str = "anyone_with_link";

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Title when set, otherwise the uploaded file name.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.original_filename)
    }
}

fn validate_general_access(access: &str) -> Result<(), ValidationError> {
    match access {
        FileMetadata::ACCESS_RESTRICTED | FileMetadata::ACCESS_ANYONE_WITH_LINK => Ok(()),
        _ => Err(ValidationError::new("general_access")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "tenant_member")]
pub struct TenantMember {
    #[column(key)]
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[column(key)]
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub role: String,
    pub created_dt: Option<DateTime<Utc>>,
}

impl TenantMember {
    pub const ROLE_ADMIN: &'static str = "admin";
    pub const ROLE_MEMBER: &'static str = "member";

    pub fn is_admin(&self) -> bool {
        self.role == Self::ROLE_ADMIN
    }
}

/// Public link to one file. Only the token's digest is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "share_link")]
pub struct ShareLink {
    #[column(key)]
    pub share_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub file_id: String,
    #[serde(skip_serializing, default)]
    #[validate(length(equal = 64))]
    pub token_hash: String,
    pub expires_dt: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub revoked_dt: Option<DateTime<Utc>>,
    pub role: Role,
}

impl ShareLink {
    pub fn is_revoked(&self) -> bool {
        self.revoked_dt.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_dt.is_some_and(|expires| expires <= now)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    pub(crate) fn state(&self) -> LinkState<'_> {
        LinkState {
            share_id: &self.share_id,
            expires_dt: self.expires_dt,
            revoked_dt: self.revoked_dt,
            password_hash: self.password_hash.as_deref(),
        }
    }
}

/// Public link to a folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "folder_share_link")]
pub struct FolderShareLink {
    #[column(key)]
    pub share_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub folder_id: String,
    #[serde(skip_serializing, default)]
    #[validate(length(equal = 64))]
    pub token_hash: String,
    pub expires_dt: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub revoked_dt: Option<DateTime<Utc>>,
}

impl FolderShareLink {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_dt.is_none() && !self.expires_dt.is_some_and(|expires| expires <= now)
    }

    pub(crate) fn state(&self) -> LinkState<'_> {
        LinkState {
            share_id: &self.share_id,
            expires_dt: self.expires_dt,
            revoked_dt: self.revoked_dt,
            password_hash: self.password_hash.as_deref(),
        }
    }
}

/// A user's role on one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "file_permission")]
pub struct FilePermission {
    #[column(key)]
    pub permission_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub file_id: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    #[validate(custom(function = "validate_file_role"))]
    pub role: Role,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
}

impl FilePermission {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn can_edit(&self) -> bool {
        self.role.can_edit()
    }
}

/// Files have no commenters.
fn validate_file_role(role: &Role) -> Result<(), ValidationError> {
    match role {
        Role::Commenter => Err(ValidationError::new("role")),
        _ => Ok(()),
    }
}

/// A user's role on one folder, optionally inherited by its contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "folder_permission")]
pub struct FolderPermission {
    #[column(key)]
    pub permission_id: String,
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub folder_id: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub role: Role,
    pub inherit_to_children: bool,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
}

impl FolderPermission {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn can_edit(&self) -> bool {
        self.role.can_edit()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "file_star")]
pub struct FileStar {
    #[column(key)]
    pub tenant_id: String,
    #[column(key)]
    pub file_id: String,
    #[column(key)]
    pub user_id: String,
    pub created_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity, Validate)]
#[entity(table = "folder_star")]
pub struct FolderStar {
    #[column(key)]
    pub tenant_id: String,
    #[column(key)]
    pub folder_id: String,
    #[column(key)]
    pub user_id: String,
    pub created_dt: Option<DateTime<Utc>>,
}
