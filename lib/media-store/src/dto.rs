//! Flat projections of join and aggregate queries.
//!
//! Field names are the projected column aliases. Columns coming from a
//! LEFT JOIN are optional.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use table_gateway::Dto;

use crate::Role;

/// A tag with the number of files carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct TagDto {
    pub tag_id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub asset_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct AssetTagDto {
    pub file_id: String,
    pub tag_id: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub tag_name: Option<String>,
    /// Only projected when listing the files of a tag.
    pub original_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct CollectionDto {
    pub collection_id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub updated_dt: Option<DateTime<Utc>>,
    pub creator_display_name: Option<String>,
    pub asset_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct CollectionAssetDto {
    pub collection_id: String,
    pub file_id: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub collection_name: Option<String>,
    pub original_filename: Option<String>,
    pub record_status: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct UserGroupDto {
    pub group_id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct UserGroupMemberDto {
    pub group_id: String,
    pub user_id: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub user_display_name: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FolderWithOwnerDto {
    pub folder_id: String,
    pub tenant_id: String,
    pub parent_folder_id: Option<String>,
    pub name: String,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct UsageDailyDto {
    pub usage_id: String,
    pub tenant_id: String,
    pub day: NaiveDate,
    pub storage_bytes: i64,
    pub egress_bytes: i64,
    pub uploads_count: i64,
    pub downloads_count: i64,
    pub transforms_count: i64,
    pub tenant_name: Option<String>,
}

/// A file row for folder listings and the trash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FileListItemDto {
    pub file_id: String,
    pub folder_id: Option<String>,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub record_sub_status: String,
    pub general_access: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub updated_dt: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub owner_name: Option<String>,
}

/// A file someone else shared with the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct SharedFileDto {
    pub file_id: String,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub my_role: Role,
    pub shared_dt: Option<DateTime<Utc>>,
    pub shared_by_name: Option<String>,
    pub owner_name: Option<String>,
}

/// A file share link without its secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct ShareLinkDto {
    pub share_id: String,
    pub tenant_id: String,
    pub file_id: String,
    pub role: Role,
    pub expires_dt: Option<DateTime<Utc>>,
    pub revoked_dt: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub password_protected: bool,
    pub original_filename: Option<String>,
    pub creator_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FolderShareLinkDto {
    pub share_id: String,
    pub tenant_id: String,
    pub folder_id: String,
    pub expires_dt: Option<DateTime<Utc>>,
    pub revoked_dt: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub password_protected: bool,
    pub folder_name: Option<String>,
    pub creator_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FilePermissionUserDto {
    pub permission_id: String,
    pub tenant_id: String,
    pub file_id: String,
    pub user_id: Option<String>,
    pub role: Role,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub user_display_name: Option<String>,
    /// Who granted the permission.
    pub actor_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FolderPermissionUserDto {
    pub permission_id: String,
    pub tenant_id: String,
    pub folder_id: String,
    pub user_id: Option<String>,
    pub role: Role,
    pub inherit_to_children: bool,
    pub created_by: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub user_display_name: Option<String>,
    pub actor_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct TenantMemberUserDto {
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub created_dt: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub user_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FileStarDto {
    pub file_id: String,
    pub name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub starred_dt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Dto)]
pub struct FolderStarDto {
    pub folder_id: String,
    pub name: String,
    pub owner_name: Option<String>,
    pub created_dt: Option<DateTime<Utc>>,
    pub starred_dt: Option<DateTime<Utc>>,
}
