use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use super::{FindSpec, PersonStore};
use crate::error::{RepoError, RepoResult};

/// In-process document store with the query subset the person repository uses.
///
/// Filters match by equality, or by membership when the stored field is an
/// array. Updates support `$set` and `$push`.
#[derive(Debug, Default)]
pub struct MemoryPersonStore {
    documents: RwLock<Vec<Document>>,
    unavailable: AtomicBool,
}

impl MemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_available(&self) -> RepoResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::Backend("memory store is unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersonStore for MemoryPersonStore {
    async fn insert_one(&self, mut document: Document) -> RepoResult<Bson> {
        self.check_available()?;
        let mut documents = self.documents.write().await;
        insert_document(&mut documents, &mut document)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> RepoResult<Vec<Bson>> {
        self.check_available()?;
        let mut stored = self.documents.write().await;

        // Ordered insert: documents before the first failure stay written.
        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            ids.push(insert_document(&mut stored, &mut document)?);
        }
        Ok(ids)
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> RepoResult<Vec<Document>> {
        self.check_available()?;
        let documents = self.documents.read().await;

        let mut matched: Vec<Document> = documents
            .iter()
            .filter(|document| matches_filter(document, &filter))
            .cloned()
            .collect();

        if let Some(sort) = &spec.sort {
            matched.sort_by(|a, b| compare_by_sort(a, b, sort));
        }

        if let Some(limit) = spec.limit.filter(|limit| *limit != 0) {
            matched.truncate(limit.unsigned_abs() as usize);
        }

        if let Some(projection) = &spec.projection {
            matched = matched
                .iter()
                .map(|document| apply_projection(document, projection))
                .collect();
        }

        Ok(matched)
    }

    async fn find_one(&self, filter: Document) -> RepoResult<Option<Document>> {
        self.check_available()?;
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .find(|document| matches_filter(document, &filter))
            .cloned())
    }

    async fn replace_one(&self, filter: Document, mut replacement: Document) -> RepoResult<u64> {
        self.check_available()?;
        let mut documents = self.documents.write().await;

        let Some(existing) = documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        else {
            return Ok(0);
        };

        // The stored _id is immutable
        if let Some(id) = existing.get("_id") {
            replacement.insert("_id", id.clone());
        }
        *existing = replacement;
        Ok(1)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> RepoResult<Option<Document>> {
        self.check_available()?;
        let mut documents = self.documents.write().await;

        let Some(existing) = documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        else {
            return Ok(None);
        };

        let mut updated = existing.clone();
        apply_update(&mut updated, &update)?;
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn find_one_and_delete(&self, filter: Document) -> RepoResult<Option<Document>> {
        self.check_available()?;
        let mut documents = self.documents.write().await;

        let position = documents
            .iter()
            .position(|document| matches_filter(document, &filter));
        Ok(position.map(|index| documents.remove(index)))
    }

    async fn delete_many(&self, filter: Document) -> RepoResult<u64> {
        self.check_available()?;
        let mut documents = self.documents.write().await;

        let before = documents.len();
        documents.retain(|document| !matches_filter(document, &filter));
        Ok((before - documents.len()) as u64)
    }
}

fn insert_document(stored: &mut Vec<Document>, document: &mut Document) -> RepoResult<Bson> {
    let id = match document.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        }
    };

    if stored.iter().any(|existing| existing.get("_id") == Some(&id)) {
        return Err(RepoError::Backend(format!(
            "duplicate key error: _id {} already exists",
            id
        )));
    }

    stored.push(document.clone());
    Ok(id)
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| field_matches(document.get(key), expected))
}

fn field_matches(actual: Option<&Bson>, expected: &Bson) -> bool {
    match actual {
        Some(Bson::Array(items)) => {
            items.iter().any(|item| values_equal(item, expected))
                || (matches!(expected, Bson::Array(_)) && actual == Some(expected))
        }
        Some(value) => values_equal(value, expected),
        None => matches!(expected, Bson::Null),
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Missing values sort first, as in MongoDB.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (key, direction) in sort {
        let ordering = compare_values(a.get(key), b.get(key));
        let descending = as_number(direction).is_some_and(|n| n < 0.0);
        let ordering = if descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn is_truthy(flag: &Bson) -> bool {
    match flag {
        Bson::Boolean(b) => *b,
        other => as_number(other).is_none_or(|n| n != 0.0),
    }
}

/// Inclusion projection; `_id` is kept unless explicitly excluded.
fn apply_projection(document: &Document, projection: &Document) -> Document {
    let keep_id = projection.get("_id").is_none_or(is_truthy);

    let mut projected = Document::new();
    if keep_id {
        if let Some(id) = document.get("_id") {
            projected.insert("_id", id.clone());
        }
    }

    for (key, flag) in projection {
        if key == "_id" || !is_truthy(flag) {
            continue;
        }
        if let Some(value) = document.get(key) {
            projected.insert(key.clone(), value.clone());
        }
    }
    projected
}

fn apply_update(document: &mut Document, update: &Document) -> RepoResult<()> {
    for (operator, fields) in update {
        let fields = fields.as_document().ok_or_else(|| {
            RepoError::Backend(format!("update operator {} expects a document", operator))
        })?;

        match operator.as_str() {
            "$set" => {
                for (key, value) in fields {
                    if key == "_id" {
                        continue;
                    }
                    document.insert(key.clone(), value.clone());
                }
            }
            "$push" => {
                for (key, value) in fields {
                    match document.get_mut(key) {
                        Some(Bson::Array(items)) => items.push(value.clone()),
                        Some(_) => {
                            return Err(RepoError::Backend(format!(
                                "cannot $push to non-array field {}",
                                key
                            )));
                        }
                        None => {
                            document.insert(key.clone(), Bson::Array(vec![value.clone()]));
                        }
                    }
                }
            }
            other => {
                return Err(RepoError::Backend(format!(
                    "unsupported update operator {}",
                    other
                )));
            }
        }
    }
    Ok(())
}
