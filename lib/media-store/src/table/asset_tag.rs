use std::sync::Arc;

use table_gateway::{
    Adapter, Conditional, Delete, Entity, GatewayError, Order, Row, Select, TableGateway,
    WriteResult, time,
};

use super::qualified;
use crate::dto::AssetTagDto;
use crate::entity::AssetTag;

/// Gateway for `asset_tag`, keyed by `(file_id, tag_id)`.
#[derive(Clone)]
pub struct AssetTagTable {
    gateway: TableGateway<AssetTag>,
}

impl AssetTagTable {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            gateway: TableGateway::new(adapter),
        }
    }

    pub fn gateway(&self) -> &TableGateway<AssetTag> {
        &self.gateway
    }

    pub async fn fetch(
        &self,
        file_id: &str,
        tag_id: &str,
    ) -> Result<Option<AssetTag>, GatewayError> {
        self.gateway.fetch_by_key(&[file_id.into(), tag_id.into()]).await
    }

    pub async fn fetch_by_file_id(&self, file_id: &str) -> Result<Vec<AssetTag>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("file_id", file_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    pub async fn fetch_by_tag_id(&self, tag_id: &str) -> Result<Vec<AssetTag>, GatewayError> {
        let select = self
            .gateway
            .select()
            .eq("tag_id", tag_id)
            .order("created_dt", Order::Asc);
        self.gateway.fetch_entities(select).await
    }

    fn details(&self) -> Select {
        Select::new()
            .from_as("at", AssetTag::TABLE, qualified("at", AssetTag::columns()))
            .columns([("tag_name", "t.name")])
            .join_left("t", "tag", "t.tag_id = at.tag_id")
    }

    /// Tags of a file with their names, by name.
    pub async fn fetch_by_file_with_tag_details(
        &self,
        file_id: &str,
    ) -> Result<Vec<AssetTagDto>, GatewayError> {
        let select = self
            .details()
            .eq("at.file_id", file_id)
            .order("t.name", Order::Asc);
        self.gateway.fetch_projection(select).await
    }

    /// Files carrying a tag, most recently tagged first.
    pub async fn fetch_by_tag_with_file_details(
        &self,
        tag_id: &str,
    ) -> Result<Vec<AssetTagDto>, GatewayError> {
        let select = self
            .details()
            .columns([("original_filename", "fm.original_filename")])
            .join_left("fm", "file_metadata", "fm.file_id = at.file_id")
            .eq("at.tag_id", tag_id)
            .order("at.created_dt", Order::Desc);
        self.gateway.fetch_projection(select).await
    }

    pub async fn add_tag(
        &self,
        file_id: &str,
        tag_id: &str,
    ) -> Result<Option<AssetTag>, GatewayError> {
        let row = Row::new()
            .with("file_id", file_id)
            .with("tag_id", tag_id)
            .with("created_dt", time::now());
        self.gateway.insert(row).await
    }

    pub async fn remove_tag(
        &self,
        file_id: &str,
        tag_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        self.gateway
            .delete_by_key(&[file_id.into(), tag_id.into()])
            .await
    }

    pub async fn remove_all_tags_from_file(
        &self,
        file_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(AssetTag::TABLE)
            .eq("file_id", file_id)
            .execute(self.gateway.adapter())
            .await
    }

    pub async fn remove_all_files_from_tag(
        &self,
        tag_id: &str,
    ) -> Result<WriteResult, GatewayError> {
        Delete::for_table(AssetTag::TABLE)
            .eq("tag_id", tag_id)
            .execute(self.gateway.adapter())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_gateway::testing::MockAdapter;
    use table_gateway::{Dialect, Value};

    fn link_row(file_id: &str) -> Row {
        Row::new()
            .with("file_id", file_id)
            .with("tag_id", "t1")
            .with("created_dt", Value::Null)
            .with("tag_name", "News")
    }

    #[tokio::test]
    async fn file_details_leave_unprojected_fields_empty() {
        let mock = Arc::new(
            MockAdapter::new(Dialect::Postgres).append_rows(vec![link_row("file1")]),
        );
        let links = AssetTagTable::new(mock.clone());

        let tags = links.fetch_by_file_with_tag_details("file1").await.unwrap();

        assert_eq!(tags[0].tag_name.as_deref(), Some("News"));
        assert_eq!(tags[0].original_filename, None);
        assert_eq!(
            mock.last_statement().unwrap().sql,
            "SELECT at.file_id AS file_id, at.tag_id AS tag_id, at.created_dt AS created_dt, \
             t.name AS tag_name FROM asset_tag AS at LEFT JOIN tag AS t ON t.tag_id = at.tag_id \
             WHERE at.file_id = $1 ORDER BY t.name ASC"
        );
    }

    #[tokio::test]
    async fn tag_details_join_file_metadata() {
        let row = link_row("file1").with("original_filename", "cat.png");
        let mock = Arc::new(MockAdapter::new(Dialect::Postgres).append_rows(vec![row]));
        let links = AssetTagTable::new(mock.clone());

        let files = links.fetch_by_tag_with_file_details("t1").await.unwrap();

        assert_eq!(files[0].original_filename.as_deref(), Some("cat.png"));
        let sql = mock.last_statement().unwrap().sql;
        assert!(sql.contains(
            "LEFT JOIN tag AS t ON t.tag_id = at.tag_id \
             LEFT JOIN file_metadata AS fm ON fm.file_id = at.file_id"
        ));
        assert!(sql.ends_with("ORDER BY at.created_dt DESC"));
    }

    #[tokio::test]
    async fn remove_tag_filters_both_key_columns() {
        let mock = Arc::new(MockAdapter::new(Dialect::MySql).append_exec(1, None));
        let links = AssetTagTable::new(mock.clone());

        assert!(links.remove_tag("file1", "t1").await.unwrap().success());

        let statement = mock.last_statement().unwrap();
        assert_eq!(statement.sql, "DELETE FROM asset_tag WHERE file_id = ? AND tag_id = ?");
        assert_eq!(statement.params, vec![Value::from("file1"), Value::from("t1")]);
    }
}
