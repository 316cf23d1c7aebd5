use std::sync::Arc;

use sat_core::Clock;
use sat_core::model::{
    AnswerSet, AnswerSetId, Category, Question, Response, Survey, SurveyId, UserId,
};
use storage::repository::{
    CatalogRepository, ProgressRepository, ResponseRepository, StorageError, SurveyRepository,
    UserRepository,
};

use crate::error::SurveyError;

/// Orchestrates survey rounds and the per-role question catalog.
#[derive(Clone)]
pub struct SurveyService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    surveys: Arc<dyn SurveyRepository>,
    progress: Arc<dyn ProgressRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl SurveyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        surveys: Arc<dyn SurveyRepository>,
        progress: Arc<dyn ProgressRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            users,
            surveys,
            progress,
            responses,
        }
    }

    /// Open a new survey round dated today and invite every non-administrator
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if persistence fails.
    pub async fn create_survey(&self) -> Result<SurveyId, SurveyError> {
        let survey = self.surveys.create_survey(self.clock.today()).await?;

        for user in self.users.list_users().await? {
            if user.is_administrator() {
                continue;
            }
            match self.progress.invite(user.id(), survey).await {
                // a fresh survey cannot have existing invites, but re-running
                // against a replayed id must not abort the round
                Err(StorageError::Conflict) => {
                    tracing::warn!(user = %user.id(), survey = %survey, "invite already present");
                }
                other => other?,
            }
        }

        Ok(survey)
    }

    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if repository access fails.
    pub async fn get_survey(&self, id: SurveyId) -> Result<Option<Survey>, SurveyError> {
        Ok(self.surveys.get_survey(id).await?)
    }

    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if repository access fails.
    pub async fn list_surveys(&self) -> Result<Vec<Survey>, SurveyError> {
        Ok(self.surveys.list_surveys().await?)
    }

    /// The questions a user answers, in catalog display order.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::UnknownUser` for a missing account and
    /// `SurveyError::AdministratorExcluded` for administrators, who never
    /// answer surveys.
    pub async fn questions_for_user(&self, user: &UserId) -> Result<Vec<Question>, SurveyError> {
        let user = self
            .users
            .get_user(user)
            .await?
            .ok_or(SurveyError::UnknownUser)?;
        if user.is_administrator() {
            return Err(SurveyError::AdministratorExcluded);
        }
        Ok(self.catalog.questions_for_role(user.role()).await?)
    }

    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if repository access fails.
    pub async fn answer_set(&self, id: AnswerSetId) -> Result<Option<AnswerSet>, SurveyError> {
        Ok(self.catalog.get_answer_set(id).await?)
    }

    /// Categories in catalog display order.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if repository access fails.
    pub async fn categories(&self) -> Result<Vec<Category>, SurveyError> {
        Ok(self.catalog.list_categories().await?)
    }

    /// Record a single response directly, bypassing the draft collector.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::UnknownSurvey` for a survey that was never
    /// created, `SurveyError::UnknownQuestion` for a question not in the
    /// catalog, and `SurveyError::InvalidChoice` when the chosen text is
    /// not one of the question's answers.
    pub async fn add_response(&self, response: Response) -> Result<(), SurveyError> {
        if self.surveys.get_survey(response.survey()).await?.is_none() {
            return Err(SurveyError::UnknownSurvey);
        }
        let question = self
            .catalog
            .get_question(response.question())
            .await?
            .ok_or(SurveyError::UnknownQuestion)?;
        let answers = self
            .catalog
            .get_answer_set(question.answer_set_id())
            .await?
            .ok_or(SurveyError::UnknownQuestion)?;
        if !answers.contains(response.choice()) {
            return Err(SurveyError::InvalidChoice);
        }
        Ok(self
            .responses
            .append_responses(std::slice::from_ref(&response))
            .await?)
    }

    /// All responses submitted for a survey.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Storage` if repository access fails.
    pub async fn responses_for_survey(
        &self,
        survey: SurveyId,
    ) -> Result<Vec<Response>, SurveyError> {
        Ok(self.responses.responses_for_survey(survey).await?)
    }
}
