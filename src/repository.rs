use std::sync::Arc;

use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, Document},
    Database,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::db_mongo::models::{Person, PersonDraft, PersonSummary};
use crate::db_mongo::MongoPersonStore;
use crate::error::{RepoError, RepoResult};
use crate::store::{FindSpec, PersonStore};

/// Result size of the chained food query unless the caller asks otherwise.
pub const DEFAULT_CHAIN_LIMIT: i64 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Age,
}

impl SortField {
    fn key(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Age => "age",
        }
    }
}

/// Record-level operations on the person collection.
///
/// Every store failure is logged and returned unchanged; lookups that find
/// nothing return `Ok(None)` or an empty `Vec`.
#[derive(Clone)]
pub struct PersonRepository {
    store: Arc<dyn PersonStore>,
}

impl PersonRepository {
    pub fn new(store: Arc<dyn PersonStore>) -> Self {
        Self { store }
    }

    pub fn mongo(db: &Database, collection_name: &str) -> Self {
        Self::new(Arc::new(MongoPersonStore::new(db, collection_name)))
    }

    pub async fn create(&self, draft: PersonDraft) -> RepoResult<Person> {
        draft.validate()?;
        tracing::debug!("create person name={}", draft.name);

        let mut person = draft.into_person();
        let document = bson::to_document(&person)?;

        let inserted_id = self
            .store
            .insert_one(document)
            .await
            .map_err(|e| store_failure("create", e))?;
        person.id = Some(object_id(inserted_id)?);

        Ok(person)
    }

    /// Validates every draft before writing; the insert itself is as atomic as the store makes it.
    pub async fn create_many(&self, drafts: Vec<PersonDraft>) -> RepoResult<Vec<Person>> {
        for draft in &drafts {
            draft.validate()?;
        }
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!("create_many count={}", drafts.len());

        let mut people: Vec<Person> = drafts.into_iter().map(PersonDraft::into_person).collect();
        let documents = people
            .iter()
            .map(|person| bson::to_document(person))
            .collect::<Result<Vec<_>, _>>()?;

        let ids = self
            .store
            .insert_many(documents)
            .await
            .map_err(|e| store_failure("create_many", e))?;

        for (person, id) in people.iter_mut().zip(ids) {
            person.id = Some(object_id(id)?);
        }

        Ok(people)
    }

    pub async fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        tracing::debug!("find_by_name name={}", name);

        let documents = self
            .store
            .find(doc! { "name": name }, FindSpec::default())
            .await
            .map_err(|e| store_failure("find_by_name", e))?;

        documents.into_iter().map(decode).collect()
    }

    pub async fn find_one_by_food(&self, food: &str) -> RepoResult<Option<Person>> {
        tracing::debug!("find_one_by_food food={}", food);

        self.store
            .find_one(doc! { "favoriteFoods": food })
            .await
            .map_err(|e| store_failure("find_one_by_food", e))?
            .map(decode)
            .transpose()
    }

    pub async fn find_by_id(&self, id: ObjectId) -> RepoResult<Option<Person>> {
        tracing::debug!("find_by_id id={}", id);

        self.store
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| store_failure("find_by_id", e))?
            .map(decode)
            .transpose()
    }

    /// Reads the person, appends `food` and writes the whole document back.
    ///
    /// Returns `None` when no person has this id, or when it disappeared
    /// between the read and the write.
    pub async fn append_food_and_save(
        &self,
        id: ObjectId,
        food: &str,
    ) -> RepoResult<Option<Person>> {
        let Some(mut person) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        tracing::debug!("append_food_and_save id={} food={}", id, food);

        person.favorite_foods.push(food.to_string());
        person.validate()?;
        let document = bson::to_document(&person)?;

        let matched = self
            .store
            .replace_one(doc! { "_id": id }, document)
            .await
            .map_err(|e| store_failure("append_food_and_save", e))?;

        if matched == 0 {
            tracing::warn!("person {} was removed before it could be saved", id);
            return Ok(None);
        }

        Ok(Some(person))
    }

    /// Sets `age` on the first person named `name` and returns the updated record.
    pub async fn update_age_by_name(&self, name: &str, age: i32) -> RepoResult<Option<Person>> {
        tracing::debug!("update_age_by_name name={} age={}", name, age);

        self.store
            .find_one_and_update(doc! { "name": name }, doc! { "$set": { "age": age } })
            .await
            .map_err(|e| store_failure("update_age_by_name", e))?
            .map(decode)
            .transpose()
    }

    pub async fn delete_by_id(&self, id: ObjectId) -> RepoResult<Option<Person>> {
        tracing::debug!("delete_by_id id={}", id);

        self.store
            .find_one_and_delete(doc! { "_id": id })
            .await
            .map_err(|e| store_failure("delete_by_id", e))?
            .map(decode)
            .transpose()
    }

    /// Removes every person named `name` and returns how many were removed.
    pub async fn delete_by_name(&self, name: &str) -> RepoResult<u64> {
        tracing::debug!("delete_by_name name={}", name);

        self.store
            .delete_many(doc! { "name": name })
            .await
            .map_err(|e| store_failure("delete_by_name", e))
    }

    /// People who like `food`, sorted ascending by `sort`, at most `limit` of
    /// them (`0` for all), carrying only their name and favorite foods.
    pub async fn query_chain(
        &self,
        food: &str,
        sort: SortField,
        limit: i64,
    ) -> RepoResult<Vec<PersonSummary>> {
        tracing::debug!(
            "query_chain food={} sort={} limit={}",
            food,
            sort.key(),
            limit
        );

        let mut sort_document = Document::new();
        sort_document.insert(sort.key(), 1);

        let spec = FindSpec {
            sort: Some(sort_document),
            limit: Some(limit),
            projection: Some(doc! { "name": 1, "favoriteFoods": 1 }),
        };

        let documents = self
            .store
            .find(doc! { "favoriteFoods": food }, spec)
            .await
            .map_err(|e| store_failure("query_chain", e))?;

        documents.into_iter().map(decode).collect()
    }
}

/// Parses the hex form of a person id.
pub fn parse_person_id(text: &str) -> RepoResult<ObjectId> {
    ObjectId::parse_str(text).map_err(|_| RepoError::InvalidId(text.to_string()))
}

fn decode<T: DeserializeOwned>(document: Document) -> RepoResult<T> {
    Ok(bson::from_document(document)?)
}

fn object_id(id: Bson) -> RepoResult<ObjectId> {
    match id {
        Bson::ObjectId(oid) => Ok(oid),
        other => Err(RepoError::Backend(format!(
            "store returned a non-ObjectId _id: {}",
            other
        ))),
    }
}

fn store_failure(operation: &str, error: RepoError) -> RepoError {
    tracing::error!("{} failed: {}", operation, error);
    error
}
