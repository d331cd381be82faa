use async_trait::async_trait;
use mongodb::{
    bson::{Bson, Document},
    options::ReturnDocument,
    Collection, Database,
};

use crate::error::{RepoError, RepoResult};
use crate::store::{FindSpec, PersonStore};

/// `PersonStore` backed by a MongoDB collection. Each method is one driver call.
#[derive(Debug, Clone)]
pub struct MongoPersonStore {
    collection: Collection<Document>,
}

impl MongoPersonStore {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Document>(collection_name),
        }
    }
}

#[async_trait]
impl PersonStore for MongoPersonStore {
    async fn insert_one(&self, document: Document) -> RepoResult<Bson> {
        let result = self.collection.insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> RepoResult<Vec<Bson>> {
        let count = documents.len();
        let mut result = self.collection.insert_many(documents).await?;

        (0..count)
            .map(|index| {
                result.inserted_ids.remove(&index).ok_or_else(|| {
                    RepoError::Backend(format!("no inserted id reported for document {}", index))
                })
            })
            .collect()
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> RepoResult<Vec<Document>> {
        let mut find = self.collection.find(filter);
        if let Some(sort) = spec.sort {
            find = find.sort(sort);
        }
        if let Some(limit) = spec.limit {
            find = find.limit(limit);
        }
        if let Some(projection) = spec.projection {
            find = find.projection(projection);
        }

        let mut cursor = find.await?;

        let mut documents = Vec::new();
        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }

        Ok(documents)
    }

    async fn find_one(&self, filter: Document) -> RepoResult<Option<Document>> {
        let document = self.collection.find_one(filter).await?;
        Ok(document)
    }

    async fn replace_one(&self, filter: Document, replacement: Document) -> RepoResult<u64> {
        let result = self.collection.replace_one(filter, replacement).await?;
        Ok(result.matched_count)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> RepoResult<Option<Document>> {
        let document = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(document)
    }

    async fn find_one_and_delete(&self, filter: Document) -> RepoResult<Option<Document>> {
        let document = self.collection.find_one_and_delete(filter).await?;
        Ok(document)
    }

    async fn delete_many(&self, filter: Document) -> RepoResult<u64> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}
