#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CatalogRepository, NewAnswerSet, NewQuestion, ProgressRepository, ResponseRepository,
    Storage, StorageError, SurveyRepository, UserRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
