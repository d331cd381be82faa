use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

/// Person fields supplied by a caller before the database assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

/// Projection returned by the chained food query: no `age`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Person {
    /// Checks the fields the schema requires before any write.
    pub fn validate(&self) -> RepoResult<()> {
        validate_name(&self.name)
    }
}

impl PersonDraft {
    pub fn new(name: impl Into<String>, age: Option<i32>, favorite_foods: Vec<String>) -> Self {
        Self {
            name: name.into(),
            age,
            favorite_foods,
        }
    }

    pub fn validate(&self) -> RepoResult<()> {
        validate_name(&self.name)
    }

    /// Builds the unsaved document; the store assigns the id on insert.
    pub fn into_person(self) -> Person {
        Person {
            id: None,
            name: self.name,
            age: self.age,
            favorite_foods: self.favorite_foods,
        }
    }
}

fn validate_name(name: &str) -> RepoResult<()> {
    if name.is_empty() {
        return Err(RepoError::Validation("Path `name` is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn test_draft_requires_name() {
        let draft = PersonDraft::new("", Some(26), vec![]);
        assert!(matches!(draft.validate(), Err(RepoError::Validation(_))));

        let draft = PersonDraft::new("Ayoub", None, vec![]);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_missing_name_deserializes_to_invalid_draft() {
        let draft: PersonDraft = serde_json::from_str(r#"{"age": 30}"#).unwrap();
        assert_eq!(draft.name, "");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_person_document_layout() {
        let person = PersonDraft::new("Ayoub", Some(26), vec!["Tajin".to_string()]).into_person();
        let document = bson::to_document(&person).unwrap();

        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_str("name").unwrap(), "Ayoub");
        assert_eq!(document.get_i32("age").unwrap(), 26);
        assert_eq!(document.get_array("favoriteFoods").unwrap().len(), 1);
    }

    #[test]
    fn test_person_tolerates_missing_optional_fields() {
        let id = ObjectId::new();
        let person: Person = bson::from_document(doc! { "_id": id, "name": "Monia" }).unwrap();

        assert_eq!(person.id, Some(id));
        assert_eq!(person.age, None);
        assert!(person.favorite_foods.is_empty());
    }
}
