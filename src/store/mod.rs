pub mod memory;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::RepoResult;

pub use memory::MemoryPersonStore;

/// Options for a multi-document query, applied as filter -> sort -> limit -> projection.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    pub sort: Option<Document>,
    /// `0` means no limit
    pub limit: Option<i64>,
    pub projection: Option<Document>,
}

/// Collection operations the person repository needs from a document store.
///
/// Implementations work on raw BSON documents so the repository owns the
/// mapping to `Person`. Point lookups and deletes by id are `_id` filters.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Inserts one document and returns its `_id`, generating one when absent.
    async fn insert_one(&self, document: Document) -> RepoResult<Bson>;

    /// Inserts documents in order and returns their ids in input order.
    async fn insert_many(&self, documents: Vec<Document>) -> RepoResult<Vec<Bson>>;

    async fn find(&self, filter: Document, spec: FindSpec) -> RepoResult<Vec<Document>>;

    async fn find_one(&self, filter: Document) -> RepoResult<Option<Document>>;

    /// Replaces the first match and returns the matched count.
    async fn replace_one(&self, filter: Document, replacement: Document) -> RepoResult<u64>;

    /// Applies `update` to the first match and returns the document after the update.
    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> RepoResult<Option<Document>>;

    async fn find_one_and_delete(&self, filter: Document) -> RepoResult<Option<Document>>;

    /// Deletes every match and returns the deleted count.
    async fn delete_many(&self, filter: Document) -> RepoResult<u64>;
}
