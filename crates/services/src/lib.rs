#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod draft_service;
pub mod error;
pub mod progress_service;
pub mod scoring_service;
pub mod survey_service;

pub use sat_core::Clock;

pub use app_services::AppServices;
pub use auth_service::{AuthService, SessionToken};
pub use draft_service::{DraftCollector, SurveyDraft};
pub use error::{
    AppServicesError, AuthError, CredentialError, DraftError, ProgressError, ScoringError,
    SurveyError,
};
pub use progress_service::ProgressService;
pub use scoring_service::ScoringService;
pub use survey_service::SurveyService;
