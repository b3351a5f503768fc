use std::sync::Arc;

use table_gateway::Adapter;

use crate::service::{
    CollectionService, FileService, FileSharingService, FolderService, FolderSharingService,
    GroupService, MemberService, StarService, TagService, UsageService,
};
use crate::table::{
    AssetTagTable, CollectionAssetTable, CollectionTable, FileMetadataTable, FilePermissionTable,
    FileStarTable, FolderPermissionTable, FolderShareLinkTable, FolderStarTable, FolderTable,
    ShareLinkTable, TagTable, TenantMemberTable, UsageDailyTable, UserGroupMemberTable,
    UserGroupTable,
};

/// Every table gateway over one shared adapter, and the services built on
/// them.
#[derive(Clone)]
pub struct Store {
    adapter: Arc<dyn Adapter>,
    files: FileMetadataTable,
    folders: FolderTable,
    tags: TagTable,
    asset_tags: AssetTagTable,
    collections: CollectionTable,
    collection_assets: CollectionAssetTable,
    groups: UserGroupTable,
    group_members: UserGroupMemberTable,
    tenant_members: TenantMemberTable,
    file_permissions: FilePermissionTable,
    folder_permissions: FolderPermissionTable,
    share_links: ShareLinkTable,
    folder_share_links: FolderShareLinkTable,
    file_stars: FileStarTable,
    folder_stars: FolderStarTable,
    usage: UsageDailyTable,
}

impl Store {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            files: FileMetadataTable::new(adapter.clone()),
            folders: FolderTable::new(adapter.clone()),
            tags: TagTable::new(adapter.clone()),
            asset_tags: AssetTagTable::new(adapter.clone()),
            collections: CollectionTable::new(adapter.clone()),
            collection_assets: CollectionAssetTable::new(adapter.clone()),
            groups: UserGroupTable::new(adapter.clone()),
            group_members: UserGroupMemberTable::new(adapter.clone()),
            tenant_members: TenantMemberTable::new(adapter.clone()),
            file_permissions: FilePermissionTable::new(adapter.clone()),
            folder_permissions: FolderPermissionTable::new(adapter.clone()),
            share_links: ShareLinkTable::new(adapter.clone()),
            folder_share_links: FolderShareLinkTable::new(adapter.clone()),
            file_stars: FileStarTable::new(adapter.clone()),
            folder_stars: FolderStarTable::new(adapter.clone()),
            usage: UsageDailyTable::new(adapter.clone()),
            adapter,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn files(&self) -> FileService {
        FileService::new(
            self.files.clone(),
            self.folders.clone(),
            self.file_permissions.clone(),
        )
    }

    pub fn folders(&self) -> FolderService {
        FolderService::new(self.folders.clone(), self.files.clone())
    }

    pub fn file_sharing(&self) -> FileSharingService {
        FileSharingService::new(
            self.files.clone(),
            self.file_permissions.clone(),
            self.share_links.clone(),
            self.tenant_members.clone(),
        )
    }

    pub fn folder_sharing(&self) -> FolderSharingService {
        FolderSharingService::new(
            self.folders.clone(),
            self.folder_permissions.clone(),
            self.folder_share_links.clone(),
            self.tenant_members.clone(),
        )
    }

    pub fn tags(&self) -> TagService {
        TagService::new(self.tags.clone(), self.asset_tags.clone(), self.files.clone())
    }

    pub fn collections(&self) -> CollectionService {
        CollectionService::new(
            self.collections.clone(),
            self.collection_assets.clone(),
            self.files.clone(),
        )
    }

    pub fn groups(&self) -> GroupService {
        GroupService::new(
            self.groups.clone(),
            self.group_members.clone(),
            self.tenant_members.clone(),
        )
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.tenant_members.clone())
    }

    pub fn stars(&self) -> StarService {
        StarService::new(
            self.files.clone(),
            self.folders.clone(),
            self.file_stars.clone(),
            self.folder_stars.clone(),
        )
    }

    pub fn usage(&self) -> UsageService {
        UsageService::new(self.usage.clone())
    }

    pub fn file_metadata_table(&self) -> &FileMetadataTable {
        &self.files
    }

    pub fn folder_table(&self) -> &FolderTable {
        &self.folders
    }

    pub fn tag_table(&self) -> &TagTable {
        &self.tags
    }

    pub fn asset_tag_table(&self) -> &AssetTagTable {
        &self.asset_tags
    }

    pub fn collection_table(&self) -> &CollectionTable {
        &self.collections
    }

    pub fn collection_asset_table(&self) -> &CollectionAssetTable {
        &self.collection_assets
    }

    pub fn user_group_table(&self) -> &UserGroupTable {
        &self.groups
    }

    pub fn user_group_member_table(&self) -> &UserGroupMemberTable {
        &self.group_members
    }

    pub fn tenant_member_table(&self) -> &TenantMemberTable {
        &self.tenant_members
    }

    pub fn file_permission_table(&self) -> &FilePermissionTable {
        &self.file_permissions
    }

    pub fn folder_permission_table(&self) -> &FolderPermissionTable {
        &self.folder_permissions
    }

    pub fn share_link_table(&self) -> &ShareLinkTable {
        &self.share_links
    }

    pub fn folder_share_link_table(&self) -> &FolderShareLinkTable {
        &self.folder_share_links
    }

    pub fn file_star_table(&self) -> &FileStarTable {
        &self.file_stars
    }

    pub fn folder_star_table(&self) -> &FolderStarTable {
        &self.folder_stars
    }

    pub fn usage_daily_table(&self) -> &UsageDailyTable {
        &self.usage
    }
}
