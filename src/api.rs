use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db_mongo::models::{Person, PersonDraft, PersonSummary};
use crate::error::RepoError;
use crate::health::health_check;
use crate::repository::{parse_person_id, PersonRepository, SortField, DEFAULT_CHAIN_LIMIT};

#[derive(Clone)]
pub struct AppState {
    pub repo: PersonRepository,
}

impl AppState {
    pub fn new(repo: PersonRepository) -> Self {
        Self { repo }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/people",
            post(create_person)
                .get(find_people_by_name)
                .delete(remove_people_by_name),
        )
        .route("/people/batch", post(create_many_people))
        .route("/people/first", get(find_one_by_food))
        .route("/people/search", get(query_chain))
        .route("/people/age", put(update_age_by_name))
        .route(
            "/people/{id}",
            get(find_person_by_id).delete(remove_person_by_id),
        )
        .route("/people/{id}/foods", post(append_food))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub favorite_foods: Vec<String>,
}

impl From<Person> for PersonResponse {
    fn from(person: Person) -> Self {
        Self {
            id: person.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: person.name,
            age: person.age,
            favorite_foods: person.favorite_foods,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub id: String,
    pub name: String,
    pub favorite_foods: Vec<String>,
}

impl From<PersonSummary> for SummaryResponse {
    fn from(summary: PersonSummary) -> Self {
        Self {
            id: summary.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: summary.name,
            favorite_foods: summary.favorite_foods,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FoodQuery {
    pub food: String,
}

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    pub food: String,
    #[serde(default)]
    pub sort: SortField,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AgeUpdate {
    pub name: String,
    pub age: i32,
}

#[derive(Debug, Deserialize)]
pub struct FoodToAdd {
    pub food: String,
}

// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Repo(RepoError),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError::Repo(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            ApiError::Repo(err) if err.is_validation() => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Repo(err) => {
                tracing::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}

fn found<T>(value: Option<T>, what: impl Into<String>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::NotFound(what.into()))
}

async fn create_person(
    State(state): State<AppState>,
    Json(draft): Json<PersonDraft>,
) -> Result<(StatusCode, Json<PersonResponse>), ApiError> {
    let person = state.repo.create(draft).await?;
    Ok((StatusCode::CREATED, Json(person.into())))
}

async fn create_many_people(
    State(state): State<AppState>,
    Json(drafts): Json<Vec<PersonDraft>>,
) -> Result<(StatusCode, Json<Vec<PersonResponse>>), ApiError> {
    let people = state.repo.create_many(drafts).await?;
    Ok((
        StatusCode::CREATED,
        Json(people.into_iter().map(PersonResponse::from).collect()),
    ))
}

async fn find_people_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<PersonResponse>>, ApiError> {
    let people = state.repo.find_by_name(&query.name).await?;
    Ok(Json(people.into_iter().map(PersonResponse::from).collect()))
}

async fn find_one_by_food(
    State(state): State<AppState>,
    Query(query): Query<FoodQuery>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person = state.repo.find_one_by_food(&query.food).await?;
    let person = found(person, format!("No person likes {}", query.food))?;
    Ok(Json(person.into()))
}

async fn find_person_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person_id = parse_person_id(&id)?;
    let person = found(
        state.repo.find_by_id(person_id).await?,
        format!("Person {} not found", id),
    )?;
    Ok(Json(person.into()))
}

async fn append_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FoodToAdd>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person_id = parse_person_id(&id)?;
    let person = found(
        state.repo.append_food_and_save(person_id, &body.food).await?,
        format!("Person {} not found", id),
    )?;
    Ok(Json(person.into()))
}

async fn update_age_by_name(
    State(state): State<AppState>,
    Json(body): Json<AgeUpdate>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person = found(
        state.repo.update_age_by_name(&body.name, body.age).await?,
        format!("No person named {}", body.name),
    )?;
    Ok(Json(person.into()))
}

async fn remove_person_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person_id = parse_person_id(&id)?;
    let person = found(
        state.repo.delete_by_id(person_id).await?,
        format!("Person {} not found", id),
    )?;
    Ok(Json(person.into()))
}

async fn remove_people_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = state.repo.delete_by_name(&query.name).await?;
    Ok(Json(DeleteResponse { deleted_count }))
}

async fn query_chain(
    State(state): State<AppState>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<Vec<SummaryResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_CHAIN_LIMIT);
    let people = state.repo.query_chain(&query.food, query.sort, limit).await?;
    Ok(Json(people.into_iter().map(SummaryResponse::from).collect()))
}
