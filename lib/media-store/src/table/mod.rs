//! One gateway per table.
//!
//! Each wraps a [`TableGateway`](table_gateway::TableGateway) over the shared
//! adapter. Entity fetches return `Option` or `Vec`; `*_with_details`
//! fetches return DTOs built from explicit joins.

mod asset_tag;
mod collection;
mod collection_asset;
mod file_metadata;
mod file_permission;
mod file_star;
mod folder;
mod folder_permission;
mod folder_share_link;
mod folder_star;
mod share_link;
mod tag;
mod tenant_member;
mod usage_daily;
mod user_group;
mod user_group_member;

pub use asset_tag::AssetTagTable;
pub use collection::CollectionTable;
pub use collection_asset::CollectionAssetTable;
pub use file_metadata::FileMetadataTable;
pub use file_permission::FilePermissionTable;
pub use file_star::FileStarTable;
pub use folder::FolderTable;
pub use folder_permission::FolderPermissionTable;
pub use folder_share_link::FolderShareLinkTable;
pub use folder_star::FolderStarTable;
pub use share_link::ShareLinkTable;
pub use tag::TagTable;
pub use tenant_member::TenantMemberTable;
pub use usage_daily::{UsageDailyTable, UsageIncrement};
pub use user_group::UserGroupTable;
pub use user_group_member::UserGroupMemberTable;

use table_gateway::{
    Column, Conditional, Entity, GatewayError, Insert, OnConflict, Row, TableGateway, Value,
};

/// `alias.column AS column` for each column.
fn qualified(alias: &str, columns: &[&str]) -> Vec<Column> {
    columns
        .iter()
        .map(|column| Column::aliased(*column, format!("{alias}.{column}")))
        .collect()
}

/// The entity's columns without its key, for `UPDATE ... SET`.
fn without_key<E: Entity>(entity: &E) -> Row {
    entity
        .object_copy()
        .into_iter()
        .filter(|(column, _)| !E::PRIMARY_KEY.contains(&column.as_str()))
        .collect()
}

/// Insert `row`, or overwrite `set` on the row colliding on `target`, and
/// read the stored entity back.
async fn upsert<E: Entity>(
    gateway: &TableGateway<E>,
    row: Row,
    target: &[&str],
    set: Row,
) -> Result<Option<E>, GatewayError> {
    let result = Insert::into_table(E::TABLE)
        .set(row.clone())
        .on_conflict(OnConflict::Update {
            target: target.iter().map(|column| column.to_string()).collect(),
            set,
        })
        .returning(E::columns().iter().copied())
        .execute(gateway.adapter())
        .await?;
    if let Some(record) = result.inserted_record() {
        return E::hydrate(record).map(Some);
    }

    // no RETURNING: the stored row is found through the conflict target
    let select = target.iter().fold(gateway.select(), |select, column| {
        select.eq(column, row.get(column).cloned().unwrap_or(Value::Null))
    });
    gateway.fetch_entity(select).await
}
