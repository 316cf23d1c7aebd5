use std::sync::Arc;

use sat_core::model::{Survey, SurveyId, UserId, UserProgress};
use storage::repository::{ProgressRepository, StorageError};

use crate::error::ProgressError;

/// Tracks which surveys a user still owes a submission for.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Invite a user to a survey. Re-inviting an already invited pair is
    /// logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn invite(&self, user: &UserId, survey: SurveyId) -> Result<(), ProgressError> {
        match self.progress.invite(user, survey).await {
            Err(StorageError::Conflict) => {
                tracing::warn!(user = %user, survey = %survey, "user already invited to survey");
                Ok(())
            }
            other => Ok(other?),
        }
    }

    /// Surveys the user has been invited to but not finished, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn outstanding_surveys(&self, user: &UserId) -> Result<Vec<Survey>, ProgressError> {
        Ok(self.progress.outstanding_surveys(user).await?)
    }

    /// The oldest unfinished survey for the user, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn next_outstanding(&self, user: &UserId) -> Result<Option<Survey>, ProgressError> {
        Ok(self
            .progress
            .outstanding_surveys(user)
            .await?
            .into_iter()
            .next())
    }

    /// Progress row for one (user, survey) pair, if the user was invited.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn progress(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<Option<UserProgress>, ProgressError> {
        Ok(self.progress.get_progress(user, survey).await?)
    }

    /// Flag the pair as finished. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn mark_complete(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<(), ProgressError> {
        Ok(self.progress.mark_complete(user, survey).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_core::time::fixed_today;
    use storage::repository::{InMemoryRepository, SurveyRepository};

    async fn setup() -> (ProgressService, InMemoryRepository, SurveyId, SurveyId) {
        let repo = InMemoryRepository::new();
        let first = repo.create_survey(fixed_today()).await.unwrap();
        let second = repo.create_survey(fixed_today()).await.unwrap();
        let service = ProgressService::new(Arc::new(repo.clone()));
        (service, repo, first, second)
    }

    #[tokio::test]
    async fn duplicate_invite_is_ignored() {
        let (service, _, survey, _) = setup().await;
        let user = UserId::new("test.ceo");

        service.invite(&user, survey).await.unwrap();
        service.invite(&user, survey).await.unwrap();

        assert_eq!(service.outstanding_surveys(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn next_outstanding_follows_completion_order() {
        let (service, _, first, second) = setup().await;
        let user = UserId::new("test.cfo");
        service.invite(&user, first).await.unwrap();
        service.invite(&user, second).await.unwrap();

        let next = service.next_outstanding(&user).await.unwrap().unwrap();
        assert_eq!(next.id(), first);

        service.mark_complete(&user, first).await.unwrap();
        let next = service.next_outstanding(&user).await.unwrap().unwrap();
        assert_eq!(next.id(), second);

        service.mark_complete(&user, second).await.unwrap();
        assert!(service.next_outstanding(&user).await.unwrap().is_none());
        assert!(service
            .progress(&user, second)
            .await
            .unwrap()
            .unwrap()
            .is_finished());
    }
}
