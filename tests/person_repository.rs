use std::collections::HashSet;
use std::sync::Arc;

use mongodb::bson::{doc, oid::ObjectId};
use people_server::{
    MemoryPersonStore, PersonDraft, PersonRepository, PersonStore, RepoError, SortField,
    DEFAULT_CHAIN_LIMIT,
};

fn repo() -> (PersonRepository, Arc<MemoryPersonStore>) {
    let store = Arc::new(MemoryPersonStore::new());
    (PersonRepository::new(store.clone()), store)
}

fn draft(name: &str, age: Option<i32>, foods: &[&str]) -> PersonDraft {
    PersonDraft::new(name, age, foods.iter().map(|f| f.to_string()).collect())
}

fn sample_people() -> Vec<PersonDraft> {
    vec![
        draft("Ayoub", Some(27), &["tajin goat"]),
        draft("Monia", Some(36), &["tanjia bgri"]),
        draft("Kamal", Some(48), &["cousscouss tfaya"]),
    ]
}

#[tokio::test]
async fn create_assigns_unique_ids() {
    let (repo, _) = repo();

    let first = repo
        .create(draft("Ayoub", Some(26), &["Tajin", "Cosscouss", "Harira"]))
        .await
        .unwrap();
    let second = repo.create(draft("Ayoub", Some(26), &[])).await.unwrap();

    let first_id = first.id.unwrap();
    assert!(!first_id.to_hex().is_empty());
    assert_ne!(Some(first_id), second.id);
    assert_eq!(first.favorite_foods, vec!["Tajin", "Cosscouss", "Harira"]);
}

#[tokio::test]
async fn create_without_name_is_a_validation_error() {
    let (repo, store) = repo();

    let err = repo.create(draft("", Some(26), &["Tajin"])).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn create_many_returns_distinct_ids() {
    let (repo, store) = repo();

    let people = repo.create_many(sample_people()).await.unwrap();
    assert_eq!(people.len(), 3);

    let ids: HashSet<ObjectId> = people.iter().map(|p| p.id.unwrap()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.len().await, 3);

    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Ayoub", "Monia", "Kamal"]);
}

#[tokio::test]
async fn create_many_with_invalid_draft_writes_nothing() {
    let (repo, store) = repo();

    let mut drafts = sample_people();
    drafts.push(draft("", None, &[]));

    let err = repo.create_many(drafts).await.unwrap_err();
    assert!(err.is_validation());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn create_many_of_nothing_is_empty() {
    let (repo, _) = repo();
    assert!(repo.create_many(Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_by_name_returns_exact_matches() {
    let (repo, _) = repo();
    let created = repo.create(draft("Ayoub", Some(26), &["Tajin"])).await.unwrap();
    repo.create(draft("Ayoubb", None, &[])).await.unwrap();

    let found = repo.find_by_name("Ayoub").await.unwrap();
    assert_eq!(found, vec![created]);

    assert!(repo.find_by_name("Nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn find_one_by_food_matches_inside_list() {
    let (repo, _) = repo();
    repo.create_many(sample_people()).await.unwrap();

    let person = repo.find_one_by_food("tanjia bgri").await.unwrap().unwrap();
    assert_eq!(person.name, "Monia");

    assert!(repo.find_one_by_food("pizza").await.unwrap().is_none());
}

#[tokio::test]
async fn find_by_id_round_trips() {
    let (repo, _) = repo();
    let created = repo.create(draft("Kamal", Some(48), &[])).await.unwrap();

    let found = repo.find_by_id(created.id.unwrap()).await.unwrap();
    assert_eq!(found, Some(created));

    assert!(repo.find_by_id(ObjectId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn append_food_and_save_keeps_order() {
    let (repo, _) = repo();
    let created = repo.create(draft("Ayoub", Some(26), &["Tajin"])).await.unwrap();
    let id = created.id.unwrap();

    let updated = repo.append_food_and_save(id, "hamburger").await.unwrap().unwrap();
    assert_eq!(updated.favorite_foods, vec!["Tajin", "hamburger"]);

    let reloaded = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(reloaded.favorite_foods, vec!["Tajin", "hamburger"]);
    assert_eq!(reloaded.age, Some(26));
}

#[tokio::test]
async fn append_food_to_missing_person_is_none() {
    let (repo, _) = repo();
    let result = repo.append_food_and_save(ObjectId::new(), "hamburger").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn update_age_by_name_returns_new_document() {
    let (repo, _) = repo();
    let created = repo
        .create(draft("Ayoub", Some(26), &["Tajin", "Harira"]))
        .await
        .unwrap();

    let updated = repo.update_age_by_name("Ayoub", 20).await.unwrap().unwrap();
    assert_eq!(updated.age, Some(20));
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.favorite_foods, created.favorite_foods);

    assert!(repo.update_age_by_name("Nobody", 20).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_by_id_removes_record() {
    let (repo, _) = repo();
    let created = repo.create(draft("Monia", Some(36), &[])).await.unwrap();
    let id = created.id.unwrap();

    let deleted = repo.delete_by_id(id).await.unwrap();
    assert_eq!(deleted, Some(created));
    assert!(repo.find_by_id(id).await.unwrap().is_none());
    assert!(repo.delete_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_by_name_removes_all_matches() {
    let (repo, store) = repo();
    repo.create_many(vec![
        draft("Karim", Some(30), &[]),
        draft("Karim", Some(31), &[]),
        draft("Mary", Some(22), &[]),
    ])
    .await
    .unwrap();

    assert_eq!(repo.delete_by_name("Karim").await.unwrap(), 2);
    assert_eq!(store.len().await, 1);
    assert_eq!(repo.delete_by_name("Karim").await.unwrap(), 0);
}

#[tokio::test]
async fn query_chain_sorts_limits_and_projects() {
    let (repo, _) = repo();
    repo.create_many(vec![
        draft("Pablo", Some(30), &["rfissa"]),
        draft("Bob", Some(23), &["rfissa", "tajin"]),
        draft("Ashley", Some(32), &["rfissa"]),
        draft("Mario", Some(51), &["rfissa"]),
        draft("Zoe", Some(19), &["rfissa"]),
        draft("Aaron", Some(40), &["pizza"]),
    ])
    .await
    .unwrap();

    let people = repo
        .query_chain("rfissa", SortField::Name, DEFAULT_CHAIN_LIMIT)
        .await
        .unwrap();

    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Ashley", "Bob"]);
    assert!(people.iter().all(|p| p.id.is_some()));
    assert_eq!(people[1].favorite_foods, vec!["rfissa", "tajin"]);
}

#[tokio::test]
async fn query_chain_by_age_without_limit() {
    let (repo, _) = repo();
    repo.create_many(vec![
        draft("Pablo", Some(30), &["rfissa"]),
        draft("Zoe", Some(19), &["rfissa"]),
        draft("Mario", Some(51), &["rfissa"]),
    ])
    .await
    .unwrap();

    let people = repo.query_chain("rfissa", SortField::Age, 0).await.unwrap();
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Zoe", "Pablo", "Mario"]);
}

#[tokio::test]
async fn store_failures_are_forwarded() {
    let (repo, store) = repo();
    let created = repo.create(draft("Ayoub", Some(26), &["Tajin"])).await.unwrap();
    let id = created.id.unwrap();

    store.set_unavailable(true);

    assert!(repo.create(draft("Kamal", None, &[])).await.unwrap_err().is_database());
    assert!(repo.create_many(sample_people()).await.unwrap_err().is_database());
    assert!(repo.find_by_name("Ayoub").await.unwrap_err().is_database());
    assert!(repo.find_one_by_food("Tajin").await.unwrap_err().is_database());
    assert!(repo.find_by_id(id).await.unwrap_err().is_database());
    assert!(repo.append_food_and_save(id, "x").await.unwrap_err().is_database());
    assert!(repo.update_age_by_name("Ayoub", 20).await.unwrap_err().is_database());
    assert!(repo.delete_by_id(id).await.unwrap_err().is_database());
    assert!(repo.delete_by_name("Ayoub").await.unwrap_err().is_database());
    assert!(repo
        .query_chain("Tajin", SortField::Name, 2)
        .await
        .unwrap_err()
        .is_database());

    store.set_unavailable(false);
    assert_eq!(repo.find_by_id(id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn undecodable_documents_surface_as_decode_errors() {
    let (repo, store) = repo();
    store
        .insert_one(doc! { "name": 42, "favoriteFoods": ["Tajin"] })
        .await
        .unwrap();

    let err = repo.find_one_by_food("Tajin").await.unwrap_err();
    assert!(matches!(err, RepoError::Decode(_)));
}

#[tokio::test]
async fn concurrent_creates_are_independent() {
    let (repo, store) = repo();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create(draft(&format!("p{}", i), Some(i), &[])).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(store.len().await, 10);
}
