use table_gateway::{Page, ValidatedEntity, time};

use super::{scoped, stored, tenant_file};
use crate::dto::{CollectionAssetDto, CollectionDto};
use crate::entity::{Collection, CollectionAsset};
use crate::table::{CollectionAssetTable, CollectionTable, FileMetadataTable};
use crate::{Actor, ServiceError, new_id};

#[derive(Clone)]
pub struct CollectionService {
    collections: CollectionTable,
    assets: CollectionAssetTable,
    files: FileMetadataTable,
}

impl CollectionService {
    pub fn new(
        collections: CollectionTable,
        assets: CollectionAssetTable,
        files: FileMetadataTable,
    ) -> Self {
        Self {
            collections,
            assets,
            files,
        }
    }

    pub async fn collection(
        &self,
        actor: &Actor,
        collection_id: &str,
    ) -> Result<Collection, ServiceError> {
        scoped(
            actor,
            collection_id,
            self.collections.fetch_by_id(collection_id).await?,
        )
    }

    /// The tenant's collections with creator names and asset counts.
    pub async fn list_collections(
        &self,
        actor: &Actor,
    ) -> Result<Vec<CollectionDto>, ServiceError> {
        Ok(self
            .collections
            .fetch_by_tenant_with_details(&actor.tenant_id)
            .await?)
    }

    pub async fn collections_page(
        &self,
        actor: &Actor,
        page: Page,
    ) -> Result<Vec<Collection>, ServiceError> {
        Ok(self
            .collections
            .fetch_by_tenant_id(&actor.tenant_id, page)
            .await?)
    }

    pub async fn create_collection(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<&str>,
    ) -> Result<Collection, ServiceError> {
        let collection = Collection {
            collection_id: new_id(),
            tenant_id: actor.tenant_id.clone(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_by: actor.user_id.clone(),
            created_dt: Some(time::now()),
            updated_dt: None,
        }
        .validated()?;

        let collection = stored("collection", self.collections.insert(&collection).await?)?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            collection_id = %collection.collection_id,
            "created collection"
        );
        Ok(collection)
    }

    pub async fn update_collection(
        &self,
        actor: &Actor,
        collection_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Collection, ServiceError> {
        let mut collection = self.collection(actor, collection_id).await?;
        collection.name = name.to_string();
        collection.description = description.map(str::to_string);
        collection.updated_dt = Some(time::now());
        let collection = collection.validated()?;

        self.collections.update(&collection).await?;
        tracing::info!(tenant_id = %actor.tenant_id, collection_id, "updated collection");
        Ok(collection)
    }

    /// Remove every asset link, then the collection. Files are untouched.
    pub async fn delete_collection(
        &self,
        actor: &Actor,
        collection_id: &str,
    ) -> Result<(), ServiceError> {
        self.collection(actor, collection_id).await?;
        self.assets.remove_all_assets(collection_id).await?;
        self.collections.delete_by_id(collection_id).await?;
        tracing::info!(tenant_id = %actor.tenant_id, collection_id, "deleted collection");
        Ok(())
    }

    /// Add a live file of the tenant. Adding it twice returns the existing
    /// link.
    pub async fn add_asset(
        &self,
        actor: &Actor,
        collection_id: &str,
        file_id: &str,
    ) -> Result<CollectionAsset, ServiceError> {
        self.collection(actor, collection_id).await?;
        tenant_file(&self.files, actor, file_id).await?;
        if let Some(existing) = self.assets.fetch(collection_id, file_id).await? {
            return Ok(existing);
        }
        let link = stored(
            "collection asset",
            self.assets.add_asset(collection_id, file_id).await?,
        )?;
        tracing::info!(
            tenant_id = %actor.tenant_id,
            collection_id,
            file_id,
            "added asset to collection"
        );
        Ok(link)
    }

    /// Returns whether a link was removed.
    pub async fn remove_asset(
        &self,
        actor: &Actor,
        collection_id: &str,
        file_id: &str,
    ) -> Result<bool, ServiceError> {
        self.collection(actor, collection_id).await?;
        Ok(self
            .assets
            .remove_asset(collection_id, file_id)
            .await?
            .success())
    }

    pub async fn assets(
        &self,
        actor: &Actor,
        collection_id: &str,
    ) -> Result<Vec<CollectionAssetDto>, ServiceError> {
        self.collection(actor, collection_id).await?;
        Ok(self
            .assets
            .fetch_by_collection_with_file_details(collection_id)
            .await?)
    }
}
