pub mod api;
pub mod config;
pub mod db_mongo;
pub mod error;
pub mod health;
pub mod repository;
pub mod store;
pub mod telemetry;

pub use api::{router, AppState};
pub use db_mongo::models::{Person, PersonDraft, PersonSummary};
pub use error::{RepoError, RepoResult};
pub use repository::{parse_person_id, PersonRepository, SortField, DEFAULT_CHAIN_LIMIT};
pub use store::{FindSpec, MemoryPersonStore, PersonStore};
