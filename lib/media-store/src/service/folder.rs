use std::collections::{HashMap, HashSet};

use serde::Serialize;
use table_gateway::{ValidatedEntity, time};

use super::{scoped, stored};
use crate::dto::FolderWithOwnerDto;
use crate::entity::Folder;
use crate::table::{FileMetadataTable, FolderTable};
use crate::{Actor, ServiceError, new_id};

/// Name of the folder created as a tenant's root.
pub const ROOT_FOLDER_NAME: &str = "Media";

/// A live folder and its live sub-folders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderNode {
    pub folder: Folder,
    pub children: Vec<FolderNode>,
}

#[derive(Clone)]
pub struct FolderService {
    folders: FolderTable,
    files: FileMetadataTable,
}

impl FolderService {
    pub fn new(folders: FolderTable, files: FileMetadataTable) -> Self {
        Self { folders, files }
    }

    /// A live folder of the actor's tenant.
    pub async fn folder(&self, actor: &Actor, folder_id: &str) -> Result<Folder, ServiceError> {
        scoped(actor, folder_id, self.folders.fetch_by_id(folder_id).await?)
    }

    /// The tenant's root folder, created on first use.
    pub async fn root_folder(&self, actor: &Actor) -> Result<Folder, ServiceError> {
        if let Some(root) = self.folders.fetch_root_by_tenant(&actor.tenant_id).await? {
            return Ok(root);
        }

        let root = Folder {
            folder_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            parent_folder_id: None,
            name: ROOT_FOLDER_NAME.to_string(),
            created_by: Some(actor.user_id.clone()),
            created_dt: Some(time::now()),
            ..Folder::default()
        }
        .validated()?;
        let root = stored("folder", self.folders.insert(&root).await?)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            folder_id = %root.folder_id,
            "created root folder"
        );
        Ok(root)
    }

    /// Create a folder under `parent_id`, or under the root when `None`.
    pub async fn create_folder(
        &self,
        actor: &Actor,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, ServiceError> {
        let parent = match parent_id {
            Some(parent_id) => self.folder(actor, parent_id).await?,
            None => self.root_folder(actor).await?,
        };

        let folder = Folder {
            folder_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            parent_folder_id: Some(parent.folder_id),
            name: name.to_string(),
            created_by: Some(actor.user_id.clone()),
            created_dt: Some(time::now()),
            ..Folder::default()
        }
        .validated()?;
        let folder = stored("folder", self.folders.insert(&folder).await?)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            folder_id = %folder.folder_id,
            parent_folder_id = ?folder.parent_folder_id,
            "created folder"
        );
        Ok(folder)
    }

    pub async fn rename_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
        name: &str,
    ) -> Result<Folder, ServiceError> {
        let mut folder = self.folder(actor, folder_id).await?;
        folder.name = name.to_string();
        let folder = folder.validated()?;
        self.folders.update(&folder).await?;
        tracing::info!(tenant_id = %actor.tenant_id, folder_id, "renamed folder");
        Ok(folder)
    }

    /// Re-parent a folder within its tenant. The root cannot move and a
    /// folder cannot move below itself.
    pub async fn move_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
        target_id: &str,
    ) -> Result<Folder, ServiceError> {
        let mut folder = self.folder(actor, folder_id).await?;
        if folder.is_root() {
            return Err(ServiceError::Conflict("the root folder cannot be moved".to_string()));
        }
        let target = self.folder(actor, target_id).await?;

        let mut seen = HashSet::new();
        let mut cursor = Some(target.clone());
        while let Some(current) = cursor {
            if current.folder_id == folder.folder_id {
                return Err(ServiceError::Conflict(format!(
                    "folder {folder_id} cannot be moved into its own subtree"
                )));
            }
            if !seen.insert(current.folder_id.clone()) {
                break;
            }
            cursor = match current.parent_folder_id {
                Some(parent_id) => self.folders.fetch_by_id(&parent_id).await?,
                None => None,
            };
        }

        folder.parent_folder_id = Some(target.folder_id);
        self.folders.update(&folder).await?;
        tracing::info!(tenant_id = %actor.tenant_id, folder_id, target_id, "moved folder");
        Ok(folder)
    }

    /// Soft-delete a non-root folder without live sub-folders or files.
    pub async fn delete_folder(&self, actor: &Actor, folder_id: &str) -> Result<(), ServiceError> {
        let folder = self.folder(actor, folder_id).await?;
        if folder.is_root() {
            return Err(ServiceError::Conflict("the root folder cannot be deleted".to_string()));
        }
        if !self.folders.fetch_by_parent(folder_id).await?.is_empty()
            || self.files.has_files_in_folder(folder_id).await?
        {
            return Err(ServiceError::Conflict(format!("folder {folder_id} is not empty")));
        }

        self.folders.soft_delete(folder_id, &actor.user_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, folder_id, "deleted folder");
        Ok(())
    }

    /// Undo a soft delete. The parent must still be live.
    pub async fn restore_folder(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<Folder, ServiceError> {
        let folder = scoped(
            actor,
            folder_id,
            self.folders.fetch_by_id_include_deleted(folder_id).await?,
        )?;
        if !folder.is_deleted() {
            return Ok(folder);
        }
        if let Some(parent_id) = &folder.parent_folder_id {
            if self.folders.fetch_by_id(parent_id).await?.is_none() {
                return Err(ServiceError::Conflict(format!(
                    "folder {folder_id} cannot be restored into a deleted parent"
                )));
            }
        }

        self.folders.restore(folder_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, folder_id, "restored folder");
        Ok(Folder {
            deleted_at: None,
            deleted_by: None,
            ..folder
        })
    }

    pub async fn deleted_folders(&self, actor: &Actor) -> Result<Vec<Folder>, ServiceError> {
        Ok(self.folders.fetch_deleted_by_tenant(&actor.tenant_id).await?)
    }

    pub async fn children_with_owner(
        &self,
        actor: &Actor,
        folder_id: &str,
    ) -> Result<Vec<FolderWithOwnerDto>, ServiceError> {
        self.folder(actor, folder_id).await?;
        Ok(self.folders.fetch_by_parent_with_owner(folder_id).await?)
    }

    /// The tenant's live folders as a tree, siblings by name.
    pub async fn folder_tree(&self, actor: &Actor) -> Result<Vec<FolderNode>, ServiceError> {
        let folders = self.folders.fetch_by_tenant(&actor.tenant_id).await?;
        Ok(build_tree(folders))
    }
}

/// Nest `folders` under their parents, keeping input order among siblings.
/// Folders whose parent is absent become top-level nodes.
fn build_tree(folders: Vec<Folder>) -> Vec<FolderNode> {
    let ids: HashSet<String> = folders.iter().map(|f| f.folder_id.clone()).collect();
    let mut by_parent: HashMap<Option<String>, Vec<Folder>> = HashMap::new();
    for folder in folders {
        let parent = folder
            .parent_folder_id
            .clone()
            .filter(|parent_id| ids.contains(parent_id));
        by_parent.entry(parent).or_default().push(folder);
    }
    attach(None, &mut by_parent)
}

fn attach(
    parent: Option<String>,
    by_parent: &mut HashMap<Option<String>, Vec<Folder>>,
) -> Vec<FolderNode> {
    by_parent
        .remove(&parent)
        .unwrap_or_default()
        .into_iter()
        .map(|folder| {
            let children = attach(Some(folder.folder_id.clone()), by_parent);
            FolderNode { folder, children }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::file_row;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, StatementKind, Value};

    fn folder_row(id: &str, tenant_id: &str, parent: Option<&str>) -> Row {
        Row::new()
            .with("folder_id", id)
            .with("tenant_id", tenant_id)
            .with("parent_folder_id", parent)
            .with("name", id)
            .with("created_by", "u1")
            .with("created_dt", Value::Null)
            .with("deleted_at", Value::Null)
            .with("deleted_by", Value::Null)
    }

    fn folder(id: &str, parent: Option<&str>) -> Folder {
        Folder {
            folder_id: id.to_string(),
            tenant_id: "x".to_string(),
            parent_folder_id: parent.map(str::to_string),
            name: id.to_string(),
            ..Folder::default()
        }
    }

    fn service(mock: &Arc<MockAdapter>) -> FolderService {
        FolderService::new(
            FolderTable::new(mock.clone()),
            FileMetadataTable::new(mock.clone()),
        )
    }

    fn actor() -> Actor {
        Actor::new("u1", "x")
    }

    #[tokio::test]
    async fn root_folder_is_created_when_missing() {
        let stored = folder_row("root", "x", None).with("name", ROOT_FOLDER_NAME);
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(Vec::new())
                .append_rows(vec![stored]),
        );

        let root = service(&mock).root_folder(&actor()).await.unwrap();

        assert!(root.is_root());
        assert_eq!(root.name, ROOT_FOLDER_NAME);
        let insert = &mock.statements()[1];
        assert_eq!(insert.kind, StatementKind::Insert);
        assert!(insert.sql.contains("VALUES ($1, $2, NULL, $3, $4, $5, NULL, NULL)"));
        assert_eq!(insert.params[2], Value::from(ROOT_FOLDER_NAME));
    }

    #[tokio::test]
    async fn other_tenants_folders_are_refused() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("f1", "y", Some("r"))]),
        );

        assert_matches!(
            service(&mock).rename_folder(&actor(), "f1", "Renamed").await,
            Err(ServiceError::AccessDenied { entity: "folder", .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn blank_names_fail_validation() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("f1", "x", Some("r"))]),
        );

        assert_matches!(
            service(&mock).rename_folder(&actor(), "f1", "   ").await,
            Err(ServiceError::Invalid(errors)) if errors.field_errors().contains_key("name")
        );
    }

    #[tokio::test]
    async fn moving_into_a_descendant_is_refused() {
        // a -> b -> c; moving a under c walks c, b, a
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("a", "x", Some("root"))])
                .append_rows(vec![folder_row("c", "x", Some("b"))])
                .append_rows(vec![folder_row("b", "x", Some("a"))])
                .append_rows(vec![folder_row("a", "x", Some("root"))]),
        );

        assert_matches!(
            service(&mock).move_folder(&actor(), "a", "c").await,
            Err(ServiceError::Conflict(_))
        );
        assert!(
            mock.statements()
                .iter()
                .all(|statement| statement.kind == StatementKind::Select)
        );
    }

    #[tokio::test]
    async fn non_empty_folders_are_not_deleted() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("a", "x", Some("root"))])
                .append_rows(vec![folder_row("b", "x", Some("a"))]),
        );

        assert_matches!(
            service(&mock).delete_folder(&actor(), "a").await,
            Err(ServiceError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn folders_holding_files_are_not_deleted() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("a", "x", Some("root"))])
                .append_rows(Vec::new())
                .append_rows(vec![file_row("file1", "x").with("folder_id", "a")]),
        );

        assert_matches!(
            service(&mock).delete_folder(&actor(), "a").await,
            Err(ServiceError::Conflict(_))
        );
        assert_eq!(mock.statements().len(), 3);
        assert!(mock.last_statement().unwrap().sql.contains("FROM file_metadata"));
    }

    #[tokio::test]
    async fn empty_folders_are_soft_deleted() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![folder_row("a", "x", Some("root"))])
                .append_rows(Vec::new())
                .append_rows(Vec::new())
                .append_exec(1, None),
        );

        service(&mock).delete_folder(&actor(), "a").await.unwrap();

        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Update);
    }

    #[tokio::test]
    async fn missing_folder_is_not_found() {
        let mock = Arc::new(MockAdapter::new(Dialect::MySql));

        assert_matches!(
            service(&mock).delete_folder(&actor(), "nope").await,
            Err(ServiceError::NotFound { entity: "folder", id }) if id == "nope"
        );
    }

    #[test]
    fn tree_nests_children_and_keeps_sibling_order() {
        let tree = build_tree(vec![
            folder("root", None),
            folder("a", Some("root")),
            folder("b", Some("root")),
            folder("a1", Some("a")),
            folder("orphan", Some("deleted")),
        ]);

        let top: Vec<&str> = tree.iter().map(|n| n.folder.folder_id.as_str()).collect();
        assert_eq!(top, vec!["root", "orphan"]);
        let children: Vec<&str> = tree[0]
            .children
            .iter()
            .map(|n| n.folder.folder_id.as_str())
            .collect();
        assert_eq!(children, vec!["a", "b"]);
        assert_eq!(tree[0].children[0].children[0].folder.folder_id, "a1");
    }
}
