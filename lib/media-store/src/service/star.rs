use super::{scoped, tenant_file};
use crate::dto::{FileStarDto, FolderStarDto};
use crate::table::{FileMetadataTable, FileStarTable, FolderStarTable, FolderTable};
use crate::{Actor, ServiceError};

/// Per-user stars on live files and folders of the actor's tenant.
#[derive(Clone)]
pub struct StarService {
    files: FileMetadataTable,
    folders: FolderTable,
    file_stars: FileStarTable,
    folder_stars: FolderStarTable,
}

impl StarService {
    pub fn new(
        files: FileMetadataTable,
        folders: FolderTable,
        file_stars: FileStarTable,
        folder_stars: FolderStarTable,
    ) -> Self {
        Self {
            files,
            folders,
            file_stars,
            folder_stars,
        }
    }

    async fn check_folder(&self, actor: &Actor, folder_id: &str) -> Result<(), ServiceError> {
        scoped(actor, folder_id, self.folders.fetch_by_id(folder_id).await?)?;
        Ok(())
    }

    /// Returns whether a new star was added.
    pub async fn star_file(&self, actor: &Actor, file_id: &str) -> Result<bool, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        let added = self
            .file_stars
            .add(&actor.tenant_id, file_id, &actor.user_id)
            .await?
            .success();
        tracing::debug!(tenant_id = %actor.tenant_id, file_id, added, "starred file");
        Ok(added)
    }

    pub async fn unstar_file(&self, actor: &Actor, file_id: &str) -> Result<bool, ServiceError> {
        Ok(self
            .file_stars
            .remove(&actor.tenant_id, file_id, &actor.user_id)
            .await?
            .success())
    }

    /// Flip the star and return whether the file is now starred.
    pub async fn toggle_file_star(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<bool, ServiceError> {
        if self.is_file_starred(actor, file_id).await? {
            self.unstar_file(actor, file_id).await?;
            Ok(false)
        } else {
            self.star_file(actor, file_id).await?;
            Ok(true)
        }
    }

    pub async fn is_file_starred(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .file_stars
            .check(&actor.tenant_id, file_id, &actor.user_id)
            .await?)
    }

    pub async fn starred_files(&self, actor: &Actor) -> Result<Vec<FileStarDto>, ServiceError> {
        Ok(self
            .file_stars
            .fetch_with_file_details(&actor.tenant_id, &actor.user_id)
            .await?)
    }

    pub async fn star_folder(&self, actor: &Actor, folder_id: &str) -> Result<bool, ServiceError> {
        self.check_folder(actor, folder_id).await?;
        let added = self
            .folder_stars
            .add(&actor.tenant_id, folder_id, &actor.user_id)
            .await?
            .success();
        tracing::debug!(tenant_id = %actor.tenant_id, folder_id, added, "starred folder");
        Ok(added)
    }

    pub async fn unstar_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .folder_stars
            .remove(&actor.tenant_id, folder_id, &actor.user_id)
            .await?
            .success())
    }

    pub async fn toggle_folder_star(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<bool, ServiceError> {
        let starred = self
            .folder_stars
            .check(&actor.tenant_id, folder_id, &actor.user_id)
            .await?;
        if starred {
            self.unstar_folder(actor, folder_id).await?;
        } else {
            self.star_folder(actor, folder_id).await?;
        }
        Ok(!starred)
    }

    pub async fn starred_folders(&self, actor: &Actor) -> Result<Vec<FolderStarDto>, ServiceError> {
        Ok(self
            .folder_stars
            .fetch_with_folder_details(&actor.tenant_id, &actor.user_id)
            .await?)
    }

    pub async fn starred_folder_ids(&self, actor: &Actor) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .folder_stars
            .fetch_ids_by_user(&actor.tenant_id, &actor.user_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::file_row;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, StatementKind};

    fn service(mock: &Arc<MockAdapter>) -> StarService {
        StarService::new(
            FileMetadataTable::new(mock.clone()),
            FolderTable::new(mock.clone()),
            FileStarTable::new(mock.clone()),
            FolderStarTable::new(mock.clone()),
        )
    }

    #[tokio::test]
    async fn files_of_other_tenants_cannot_be_starred() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![file_row("file1", "y")]),
        );

        assert_matches!(
            service(&mock).star_file(&Actor::new("u1", "x"), "file1").await,
            Err(ServiceError::AccessDenied { entity: "file", .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn toggling_an_unstarred_file_stars_it() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(Vec::new())
                .append_rows(vec![file_row("file1", "x")])
                .append_exec(1, None),
        );

        let starred = service(&mock)
            .toggle_file_star(&Actor::new("u1", "x"), "file1")
            .await
            .unwrap();

        assert!(starred);
        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Insert);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn toggling_a_starred_folder_removes_the_star() {
        let star = Row::new()
            .with("tenant_id", "x")
            .with("folder_id", "f1")
            .with("user_id", "u1")
            .with("created_dt", "2024-03-01T10:00:00Z");
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![star])
                .append_exec(1, None),
        );

        let starred = service(&mock)
            .toggle_folder_star(&Actor::new("u1", "x"), "f1")
            .await
            .unwrap();

        assert!(!starred);
        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Delete);
    }
}
