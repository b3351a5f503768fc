use std::sync::Arc;

use table_gateway::{
    Adapter, Column, Conditional, Entity, GatewayError, Order, Page, Row, Select, TableGateway,
    Update, WriteResult, time,
};

use super::without_key;
use crate::Role;
use crate::dto::{FileListItemDto, SharedFileDto};
use crate::entity::FileMetadata;

const DISPLAY_NAME: &str = "COALESCE(fm.title, fm.original_filename)";

/// Gateway for `file_metadata`. Soft-deleted files are hidden unless a
/// method says otherwise.
#[derive(Clone)]
pub struct FileMetadataTable {
    gateway: TableGateway<FileMetadata>,
}

impl FileMetadataTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<FileMetadata> {
        &self.gateway
    }

    fn live(&self) -> Select {
        self.gateway.select().is_null("deleted_at")
    }

    pub async fn fetch_by_id(&self, file_id: &str) -> Result<Option<FileMetadata>, GatewayError> {
        self.gateway
            .fetch_entity(self.live().eq("file_id", file_id))
            .await
    }

    pub async fn fetch_by_id_include_deleted(
        &self,
        file_id: &str,
    ) -> Result<Option<FileMetadata>, GatewayError> {
        self.gateway.fetch_by_id(file_id).await
    }

    /// Live files of the tenant among `file_ids`. Unknown ids are skipped.
    pub async fn fetch_by_ids(
        &self,
        tenant_id: &str,
        file_ids: &[String],
    ) -> Result<Vec<FileMetadata>, GatewayError> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = self
            .live()
            .eq("tenant_id", tenant_id)
            .where_in("file_id", file_ids.iter().map(String::as_str));
        self.gateway.fetch_entities(select).await
    }

    /// Newest first.
    pub async fn fetch_by_tenant_id(
        &self,
        tenant_id: &str,
        page: Page,
    ) -> Result<Vec<FileMetadata>, GatewayError> {
        let select = self
            .live()
            .eq("tenant_id", tenant_id)
            .order("created_dt", Order::Desc)
            .order("file_id", Order::Asc)
            .paginate(page);
        self.gateway.fetch_entities(select).await
    }

    fn list_items(&self) -> Select {
        Select::new()
            .from_as(
                "fm",
                FileMetadata::TABLE,
                [
                    "file_id",
                    "folder_id",
                    "content_type",
                    "size_bytes",
                    "record_sub_status",
                    "general_access",
                    "created_dt",
                    "updated_dt",
                    "deleted_at",
                ]
                .map(|column| Column::aliased(column, format!("fm.{column}"))),
            )
            .columns([("name", DISPLAY_NAME), ("owner_name", "u.display_name")])
            .join_left("u", "app_user", "u.user_id = fm.created_by")
    }

    /// Live files directly inside `folder_id`, or outside any folder when
    /// `None`, by name.
    pub async fn fetch_by_folder(
        &self,
        tenant_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileListItemDto>, GatewayError> {
        let select = self
            .list_items()
            .eq("fm.tenant_id", tenant_id)
            .eq("fm.folder_id", folder_id)
            .is_null("fm.deleted_at")
            .order("name", Order::Asc)
            .order("fm.file_id", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    /// The tenant's trash, most recently deleted first.
    pub async fn fetch_deleted_by_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<FileListItemDto>, GatewayError> {
        let select = self
            .list_items()
            .eq("fm.tenant_id", tenant_id)
            .is_not_null("fm.deleted_at")
            .order("fm.deleted_at", Order::Desc);
        self.gateway.fetch_projection(select).await
    }

    /// Live files on which `user_id` holds a non-owner permission, most
    /// recently shared first.
    pub async fn fetch_shared_with_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        page: Page,
    ) -> Result<Vec<SharedFileDto>, GatewayError> {
        let select = Select::new()
            .from_as(
                "fp",
                "file_permission",
                [
                    ("file_id", "fm.file_id"),
                    ("name", DISPLAY_NAME),
                    ("content_type", "fm.content_type"),
                    ("size_bytes", "fm.size_bytes"),
                    ("my_role", "fp.role"),
                    ("shared_dt", "fp.created_dt"),
                    ("shared_by_name", "actor.display_name"),
                    ("owner_name", "owner.display_name"),
                ],
            )
            .join(
                "fm",
                FileMetadata::TABLE,
                "fm.tenant_id = fp.tenant_id AND fm.file_id = fp.file_id",
            )
            .join_left("actor", "app_user", "actor.user_id = fp.created_by")
            .join_left("owner", "app_user", "owner.user_id = fm.created_by")
            .eq("fp.tenant_id", tenant_id)
            .eq("fp.user_id", user_id)
            .and_where("fp.role <> ?", Role::Owner)
            .is_null("fm.deleted_at")
            .order("fp.created_dt", Order::Desc)
            .order("fm.file_id", Order::Asc)
            .paginate(page);
        self.gateway.fetch_projection(select).await
    }

    pub async fn has_files_in_folder(&self, folder_id: &str) -> Result<bool, GatewayError> {
        let select = self.live().eq("folder_id", folder_id);
        Ok(self.gateway.fetch_entity(select).await?.is_some())
    }

    pub async fn insert(&self, file: &FileMetadata) -> Result<Option<FileMetadata>, GatewayError> {
        self.gateway.insert(file.object_copy()).await
    }

    pub async fn update(&self, file: &FileMetadata) -> Result<WriteResult, GatewayError> {
        self.gateway
            .update_by_id(file.file_id.as_str(), without_key(file))
            .await
    }

    /// Overwrite `changes` on a live file of the tenant, stamping the editor.
    pub async fn update_live(
        &self,
        tenant_id: &str,
        file_id: &str,
        updated_by: &str,
        changes: Row,
    ) -> Result<WriteResult, GatewayError> {
        Update::for_table(FileMetadata::TABLE)
            .set_row(changes)
            .set("updated_by", updated_by)
            .set("updated_dt", time::now())
            .eq("tenant_id", tenant_id)
            .eq("file_id", file_id)
            .is_null("deleted_at")
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn set_general_access(
        &self,
        tenant_id: &str,
        file_id: &str,
        access: &str,
        updated_by: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.update_live(
            tenant_id,
            file_id,
            updated_by,
            Row::new().with("general_access", access),
        )
        .await
    }

    /// Mark a live file deleted. Already deleted files are left as they are.
    pub async fn soft_delete(
        &self,
        file_id: &str,
        deleted_by: &str,
    ) -> Result<WriteResult, GatewayError> {
        Update::for_table(FileMetadata::TABLE)
            .set("deleted_at", time::now())
            .set("deleted_by", deleted_by)
            .eq("file_id", file_id)
            .is_null("deleted_at")
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn restore(&self, file_id: &str) -> Result<WriteResult, GatewayError> {
        Update::for_table(FileMetadata::TABLE)
            .set("deleted_at", None::<String>)
            .set("deleted_by", None::<String>)
            .eq("file_id", file_id)
            .is_not_null("deleted_at")
            .execute(self.gateway.adapter())
            .await
    }
}
