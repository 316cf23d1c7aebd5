use std::path::Path;
use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::draft_service::DraftCollector;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::scoring_service::ScoringService;
use crate::survey_service::SurveyService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    surveys: Arc<SurveyService>,
    progress: Arc<ProgressService>,
    drafts: Arc<DraftCollector>,
    scoring: Arc<ScoringService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, staging drafts under
    /// `draft_dir`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// draft directory cannot be created.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        draft_dir: &Path,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(&storage, clock, draft_dir)
    }

    /// Build services over an already constructed storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Draft` if the draft directory cannot be
    /// created.
    pub fn with_storage(
        storage: &Storage,
        clock: Clock,
        draft_dir: &Path,
    ) -> Result<Self, AppServicesError> {
        let auth = Arc::new(AuthService::new(Arc::clone(&storage.users)));
        let surveys = Arc::new(SurveyService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.users),
            Arc::clone(&storage.surveys),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.responses),
        ));
        let progress = Arc::new(ProgressService::new(Arc::clone(&storage.progress)));
        let drafts = Arc::new(DraftCollector::new(
            draft_dir,
            Arc::clone(&storage.responses),
            Arc::clone(&storage.progress),
        )?);
        let scoring = Arc::new(ScoringService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.users),
            Arc::clone(&storage.responses),
        ));

        Ok(Self {
            auth,
            surveys,
            progress,
            drafts,
            scoring,
        })
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn surveys(&self) -> Arc<SurveyService> {
        Arc::clone(&self.surveys)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn drafts(&self) -> Arc<DraftCollector> {
        Arc::clone(&self.drafts)
    }

    #[must_use]
    pub fn scoring(&self) -> Arc<ScoringService> {
        Arc::clone(&self.scoring)
    }
}
