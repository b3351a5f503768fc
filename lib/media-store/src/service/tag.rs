use table_gateway::{ValidatedEntity, time};

use super::{scoped, stored, tenant_file};
use crate::dto::{AssetTagDto, TagDto};
use crate::entity::{AssetTag, Tag};
use crate::table::{AssetTagTable, FileMetadataTable, TagTable};
use crate::{Actor, ServiceError, new_id};

#[derive(Clone)]
pub struct TagService {
    tags: TagTable,
    asset_tags: AssetTagTable,
    files: FileMetadataTable,
}

impl TagService {
    pub fn new(tags: TagTable, asset_tags: AssetTagTable, files: FileMetadataTable) -> Self {
        Self {
            tags,
            asset_tags,
            files,
        }
    }

    pub async fn tag(&self, actor: &Actor, tag_id: &str) -> Result<Tag, ServiceError> {
        scoped(actor, tag_id, self.tags.fetch_by_id(tag_id).await?)
    }

    /// The tenant's tags with their file counts.
    pub async fn list_tags(&self, actor: &Actor) -> Result<Vec<TagDto>, ServiceError> {
        Ok(self.tags.fetch_by_tenant_with_details(&actor.tenant_id).await?)
    }

    async fn ensure_unique(&self, tag: &Tag) -> Result<(), ServiceError> {
        match self.tags.fetch_by_tenant_and_name(&tag.tenant_id, &tag.name).await? {
            Some(existing) if existing.tag_id != tag.tag_id => Err(ServiceError::Conflict(format!(
                "tag {:?} already exists",
                tag.name
            ))),
            _ => Ok(()),
        }
    }

    /// Create a tag. Names are trimmed and unique per tenant.
    pub async fn create_tag(&self, actor: &Actor, name: &str) -> Result<Tag, ServiceError> {
        let tag = Tag {
            tag_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            name: name.to_string(),
            created_dt: Some(time::now()),
        }
        .validated()?;
        self.ensure_unique(&tag).await?;

        let tag = stored("tag", self.tags.insert(&tag).await?)?;
        tracing::info!(tenant_id = %actor.tenant_id, tag_id = %tag.tag_id, "created tag");
        Ok(tag)
    }

    pub async fn rename_tag(
        &self,
        actor: &Actor,
        tag_id: &str,
        name: &str,
    ) -> Result<Tag, ServiceError> {
        let mut tag = self.tag(actor, tag_id).await?;
        tag.name = name.to_string();
        let tag = tag.validated()?;
        self.ensure_unique(&tag).await?;

        self.tags.update(&tag).await?;
        tracing::info!(tenant_id = %actor.tenant_id, tag_id, "renamed tag");
        Ok(tag)
    }

    /// Unlink the tag from every file, then delete it.
    pub async fn delete_tag(&self, actor: &Actor, tag_id: &str) -> Result<(), ServiceError> {
        self.tag(actor, tag_id).await?;
        let unlinked = self.asset_tags.remove_all_files_from_tag(tag_id).await?;
        self.tags.delete_by_id(tag_id).await?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            tag_id,
            unlinked = unlinked.affected_rows,
            "deleted tag"
        );
        Ok(())
    }

    /// Tag a live file of the tenant. Tagging twice returns the existing link.
    pub async fn tag_file(
        &self,
        actor: &Actor,
        file_id: &str,
        tag_id: &str,
    ) -> Result<AssetTag, ServiceError> {
        self.tag(actor, tag_id).await?;
        tenant_file(&self.files, actor, file_id).await?;
        if let Some(existing) = self.asset_tags.fetch(file_id, tag_id).await? {
            return Ok(existing);
        }
        let link = stored("asset tag", self.asset_tags.add_tag(file_id, tag_id).await?)?;
        tracing::info!(tenant_id = %actor.tenant_id, file_id, tag_id, "tagged file");
        Ok(link)
    }

    /// Returns whether a link was removed.
    pub async fn untag_file(
        &self,
        actor: &Actor,
        file_id: &str,
        tag_id: &str,
    ) -> Result<bool, ServiceError> {
        self.tag(actor, tag_id).await?;
        let removed = self.asset_tags.remove_tag(file_id, tag_id).await?.success();
        if removed {
            tracing::info!(tenant_id = %actor.tenant_id, file_id, tag_id, "untagged file");
        }
        Ok(removed)
    }

    /// Tags of a live file of the actor's tenant.
    pub async fn tags_for_file(
        &self,
        actor: &Actor,
        file_id: &str,
    ) -> Result<Vec<AssetTagDto>, ServiceError> {
        tenant_file(&self.files, actor, file_id).await?;
        Ok(self.asset_tags.fetch_by_file_with_tag_details(file_id).await?)
    }

    pub async fn files_for_tag(
        &self,
        actor: &Actor,
        tag_id: &str,
    ) -> Result<Vec<AssetTagDto>, ServiceError> {
        self.tag(actor, tag_id).await?;
        Ok(self.asset_tags.fetch_by_tag_with_file_details(tag_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::file_row;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Row, StatementKind, Value};

    fn tag_row(id: &str, tenant_id: &str, name: &str) -> Row {
        Row::new()
            .with("tag_id", id)
            .with("tenant_id", tenant_id)
            .with("name", name)
            .with("created_dt", Value::Null)
    }

    fn service(mock: &Arc<MockAdapter>) -> TagService {
        TagService::new(
            TagTable::new(mock.clone()),
            AssetTagTable::new(mock.clone()),
            FileMetadataTable::new(mock.clone()),
        )
    }

    fn actor() -> Actor {
        Actor::new("u1", "x")
    }

    #[tokio::test]
    async fn create_tag_trims_and_checks_uniqueness() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(Vec::new())
                .append_rows(vec![tag_row("t1", "x", "News")]),
        );

        let tag = service(&mock).create_tag(&actor(), "  News  ").await.unwrap();

        assert_eq!(tag.name, "News");
        let statements = mock.statements();
        assert_eq!(
            statements[0].sql,
            "SELECT tag_id, tenant_id, name, created_dt FROM tag \
             WHERE tenant_id = $1 AND name = $2 LIMIT 1"
        );
        assert_eq!(statements[0].params[1], Value::from("News"));
        assert_eq!(statements[1].kind, StatementKind::Insert);
    }

    #[tokio::test]
    async fn duplicate_tag_names_conflict() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![tag_row("t1", "x", "News")]),
        );

        assert_matches!(
            service(&mock).create_tag(&actor(), "News").await,
            Err(ServiceError::Conflict(_))
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn renaming_to_the_same_name_is_allowed() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![tag_row("t1", "x", "News")])
                .append_rows(vec![tag_row("t1", "x", "News")])
                .append_exec(1, None),
        );

        let tag = service(&mock).rename_tag(&actor(), "t1", "News ").await.unwrap();

        assert_eq!(tag.name, "News");
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "UPDATE tag SET tenant_id = $1, name = $2, created_dt = NULL WHERE tag_id = $3"
        );
    }

    #[tokio::test]
    async fn delete_tag_unlinks_files_first() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![tag_row("t1", "x", "News")])
                .append_exec(2, None)
                .append_exec(1, None),
        );

        service(&mock).delete_tag(&actor(), "t1").await.unwrap();

        let statements = mock.statements();
        assert_eq!(statements[1].sql, "DELETE FROM asset_tag WHERE tag_id = $1");
        assert_eq!(statements[2].sql, "DELETE FROM tag WHERE tag_id = $1");
    }

    #[tokio::test]
    async fn tagging_with_a_foreign_tag_is_refused() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![tag_row("t9", "y", "Other")]),
        );

        assert_matches!(
            service(&mock).tag_file(&actor(), "file1", "t9").await,
            Err(ServiceError::AccessDenied { .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn files_of_other_tenants_cannot_be_tagged() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![tag_row("t1", "x", "News")])
                .append_rows(vec![file_row("file-of-tenant-y", "y")])
                .append_rows(Vec::new()),
        );

        assert_matches!(
            service(&mock).tag_file(&actor(), "file-of-tenant-y", "t1").await,
            Err(ServiceError::AccessDenied { entity: "file", .. })
        );
        assert_eq!(mock.statements().len(), 2);
        assert_eq!(mock.pending(), 1);
    }

    #[tokio::test]
    async fn tagging_a_tenant_file_links_it() {
        let link = Row::new()
            .with("file_id", "file1")
            .with("tag_id", "t1")
            .with("created_dt", Value::Null);
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres)
                .append_rows(vec![tag_row("t1", "x", "News")])
                .append_rows(vec![file_row("file1", "x")])
                .append_rows(Vec::new())
                .append_rows(vec![link]),
        );

        let link = service(&mock).tag_file(&actor(), "file1", "t1").await.unwrap();

        assert_eq!(link.tag_id, "t1");
        assert_eq!(mock.last_statement().unwrap().kind, StatementKind::Insert);
    }

    #[tokio::test]
    async fn tags_of_foreign_files_are_hidden() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![file_row("file1", "y")]),
        );

        assert_matches!(
            service(&mock).tags_for_file(&actor(), "file1").await,
            Err(ServiceError::AccessDenied { entity: "file", .. })
        );
        assert_eq!(mock.statements().len(), 1);
    }
}
