use serde::{Deserialize, Serialize};
use table_gateway::{Page, Row, ValidatedEntity, time};

use super::{scoped, stored, tenant_file};
use crate::dto::{FileListItemDto, SharedFileDto};
use crate::entity::{FileMetadata, Folder};
use crate::table::{FileMetadataTable, FilePermissionTable, FolderTable};
use crate::{Actor, Role, ServiceError, new_id};

/// What a client announces before sending a file's bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUpload {
    /// Target folder. The tenant's root when `None`.
    pub folder_id: Option<String>,
    pub original_filename: String,
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// File lifecycle: upload, rename, move, trash and restore.
#[derive(Clone)]
pub struct FileService {
    files: FileMetadataTable,
    folders: FolderTable,
    permissions: FilePermissionTable,
}

impl FileService {
    pub fn new(
        files: FileMetadataTable,
        folders: FolderTable,
        permissions: FilePermissionTable,
    ) -> Self {
        Self {
            files,
            folders,
            permissions,
        }
    }

    /// A live file of the actor's tenant.
    pub async fn file(&self, actor: &Actor, file_id: &str) -> Result<FileMetadata, ServiceError> {
        tenant_file(&self.files, actor, file_id).await
    }

    /// The named folder, or the tenant's root when `None`. A tenant without
    /// a root keeps files outside any folder.
    async fn target_folder(
        &self,
        actor: &Actor,
        folder_id: Option<&str>,
    ) -> Result<Option<Folder>, ServiceError> {
        match folder_id {
            Some(folder_id) => Ok(Some(scoped(
                actor,
                folder_id,
                self.folders.fetch_by_id(folder_id).await?,
            )?)),
            None => Ok(self.folders.fetch_root_by_tenant(&actor.tenant_id).await?),
        }
    }

    /// Owners and editors may change a file. The uploader always may.
    async fn editable_file(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<FileMetadata, ServiceError> {
        let file = self.file(actor, file_id).await?;
        if file.created_by.as_deref() == Some(actor.user_id.as_str()) {
            return Ok(file);
        }
        let role = self
            .permissions
            .fetch_by_user_and_file(&actor.tenant_id, file_id, &actor.user_id)
            .await?
            .map(|permission| permission.role);
        match role {
            Some(role) if role.can_edit() => Ok(file),
            _ => Err(ServiceError::Forbidden(format!("file {file_id} is read-only for you"))),
        }
    }

    pub async fn files_in_folder(
        &self,
        actor: &Actor,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileListItemDto>, ServiceError> {
        if let Some(folder_id) = folder_id {
            scoped(actor, folder_id, self.folders.fetch_by_id(folder_id).await?)?;
        }
        Ok(self.files.fetch_by_folder(&actor.tenant_id, folder_id).await?)
    }

    pub async fn files_page(
        &self,
        actor: &Actor,
        page: Page,
    ) -> Result<Vec<FileMetadata>, ServiceError> {
        Ok(self.files.fetch_by_tenant_id(&actor.tenant_id, page).await?)
    }

    pub async fn trash(&self, actor: &Actor) -> Result<Vec<FileListItemDto>, ServiceError> {
        Ok(self.files.fetch_deleted_by_tenant(&actor.tenant_id).await?)
    }

    pub async fn shared_with_me(
        &self,
        actor: &Actor,
        page: Page,
    ) -> Result<Vec<SharedFileDto>, ServiceError> {
        Ok(self
            .files
            .fetch_shared_with_user(&actor.tenant_id, &actor.user_id, page)
            .await?)
    }

    /// Record a pending upload and make the actor its owner.
    pub async fn prepare_upload(
        &self,
        actor: &Actor,
        upload: NewUpload,
    ) -> Result<FileMetadata, ServiceError> {
        let folder = self.target_folder(actor, upload.folder_id.as_deref()).await?;
        let file = FileMetadata {
            file_id: new_id(),
            folder_id: folder.map(|folder| folder.folder_id),
            tenant_id: actor.tenant_id.clone(),
            title: upload.title,
            original_filename: upload.original_filename,
            content_type: upload.content_type,
            size_bytes: upload.size_bytes,
            record_status: FileMetadata::STATUS_UPLOAD.to_string(),
            record_sub_status: FileMetadata::SUB_STATUS_PENDING.to_string(),
            visibility: FileMetadata::VISIBILITY_PRIVATE.to_string(),
            general_access: FileMetadata::ACCESS_RESTRICTED.to_string(),
            created_by: Some(actor.user_id.clone()),
            created_dt: Some(time::now()),
            ..FileMetadata::default()
        }
        .validated()?;

        let file = stored("file", self.files.insert(&file).await?)?;
        let owner = self
            .permissions
            .upsert_permission(
                &actor.tenant_id,
                &file.file_id,
                &actor.user_id,
                Role::Owner,
                &actor.user_id,
            )
            .await?;
        stored("file permission", owner)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            file_id = %file.file_id,
            folder_id = ?file.folder_id,
            "prepared upload"
        );
        Ok(file)
    }

    async fn pending_upload(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<FileMetadata, ServiceError> {
        let file = self.editable_file(actor, file_id).await?;
        if file.record_sub_status != FileMetadata::SUB_STATUS_PENDING {
            return Err(ServiceError::Conflict(format!(
                "upload of file {file_id} is already {}",
                file.record_sub_status
            )));
        }
        Ok(file)
    }

    /// Complete a pending upload with the stored size and checksum.
    pub async fn finalize_upload(
        &self,
        actor: &Actor,
        file_id: &str,
        size_bytes: i64,
        checksum_sha256: Option<&str>,
    ) -> Result<FileMetadata, ServiceError> {
        if size_bytes < 0 {
            return Err(ServiceError::InvalidArgument(format!(
                "size_bytes must not be negative, got {size_bytes}"
            )));
        }
        let mut file = self.pending_upload(actor, file_id).await?;
        file.record_sub_status = FileMetadata::SUB_STATUS_COMPLETED.to_string();
        file.size_bytes = Some(size_bytes);
        file.checksum_sha256 = checksum_sha256.map(str::to_string);

        let changes = Row::new()
            .with("record_sub_status", file.record_sub_status.as_str())
            .with("size_bytes", size_bytes)
            .with("checksum_sha256", checksum_sha256);
        self.files
            .update_live(&actor.tenant_id, file_id, &actor.user_id, changes)
            .await?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, size_bytes, "finalized upload");
        Ok(file)
    }

    pub async fn fail_upload(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<FileMetadata, ServiceError> {
        let mut file = self.pending_upload(actor, file_id).await?;
        file.record_sub_status = FileMetadata::SUB_STATUS_FAILED.to_string();
        let changes = Row::new().with("record_sub_status", file.record_sub_status.as_str());
        self.files
            .update_live(&actor.tenant_id, file_id, &actor.user_id, changes)
            .await?;
        tracing::warn!(tenant_id = %actor.tenant_id, file_id, "upload failed");
        Ok(file)
    }

    pub async fn rename_file(
        &self,
        actor: &Actor,
        file_id: &str,
        title: &str,
    ) -> Result<FileMetadata, ServiceError> {
        let mut file = self.editable_file(actor, file_id).await?;
        file.title = Some(title.to_string());
        let file = file.validated()?;
        self.files
            .update_live(
                &actor.tenant_id,
                file_id,
                &actor.user_id,
                Row::new().with("title", file.title.clone()),
            )
            .await?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, "renamed file");
        Ok(file)
    }

    /// Move a file into `folder_id`, or into the tenant's root when `None`.
    pub async fn move_file(
        &self,
        actor: &Actor,
        file_id: &str,
        folder_id: Option<&str>,
    ) -> Result<FileMetadata, ServiceError> {
        let mut file = self.editable_file(actor, file_id).await?;
        let target = self.target_folder(actor, folder_id).await?;
        file.folder_id = target.map(|folder| folder.folder_id);
        self.files
            .update_live(
                &actor.tenant_id,
                file_id,
                &actor.user_id,
                Row::new().with("folder_id", file.folder_id.clone()),
            )
            .await?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            file_id,
            folder_id = ?file.folder_id,
            "moved file",
        );
        Ok(file)
    }

    /// Move a file to the trash.
    pub async fn delete_file(&self, actor: &Actor, file_id: &str) -> Result<(), ServiceError> {
        self.editable_file(actor, file_id).await?;
        self.files.soft_delete(file_id, &actor.user_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, "deleted file");
        Ok(())
    }

    /// Take a file out of the trash. Its folder must still be live.
    pub async fn restore_file(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<FileMetadata, ServiceError> {
        let file = scoped(
            actor,
            file_id,
            self.files.fetch_by_id_include_deleted(file_id).await?,
        )?;
        if !file.is_deleted() {
            return Err(ServiceError::Conflict(format!("file {file_id} is not in the trash")));
        }
        if file.deleted_by.as_deref() != Some(actor.user_id.as_str())
            && file.created_by.as_deref() != Some(actor.user_id.as_str())
        {
            return Err(ServiceError::Forbidden(format!(
                "only the uploader or whoever deleted file {file_id} may restore it"
            )));
        }
        if let Some(folder_id) = &file.folder_id {
            if self.folders.fetch_by_id(folder_id).await?.is_none() {
                return Err(ServiceError::Conflict(format!(
                    "file {file_id} cannot be restored into a deleted folder"
                )));
            }
        }

        self.files.restore(file_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, "restored file");
        Ok(FileMetadata {
            deleted_at: None,
            deleted_by: None,
            ..file
        })
    }
}
