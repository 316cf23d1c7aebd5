use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use sat_core::model::{Response, SurveyId, UserId};
use sat_core::scoring::{ScoringSnapshot, SurveyScores, score_survey, score_survey_parallel};
use storage::repository::{CatalogRepository, ResponseRepository, UserRepository};

use crate::error::ScoringError;

/// Computes score reports over submitted survey responses.
///
/// Every report is computed against a snapshot of the catalog loaded at the
/// start of the pass, so concurrent catalog edits cannot skew a report
/// half-way through.
#[derive(Clone)]
pub struct ScoringService {
    catalog: Arc<dyn CatalogRepository>,
    users: Arc<dyn UserRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl ScoringService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Self {
        Self {
            catalog,
            users,
            responses,
        }
    }

    /// Load the catalog tables into an immutable scoring snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::Storage` if repository access fails.
    pub async fn load_snapshot(&self) -> Result<ScoringSnapshot, ScoringError> {
        Ok(ScoringSnapshot::new(
            self.catalog.list_categories().await?,
            self.catalog.list_questions().await?,
            self.catalog.list_answer_sets().await?,
        ))
    }

    /// Score every response submitted for a survey.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::Storage` if repository access fails.
    pub async fn score_survey(&self, survey: SurveyId) -> Result<SurveyScores, ScoringError> {
        let snapshot = self.load_snapshot().await?;
        let responses = self.responses.responses_for_survey(survey).await?;
        Ok(score_survey(&snapshot, &responses))
    }

    /// Score every response for a survey, tallying across a bounded pool of
    /// worker threads. Results are identical to [`Self::score_survey`].
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::Storage` if repository access fails.
    pub async fn score_survey_with_workers(
        &self,
        survey: SurveyId,
        workers: NonZeroUsize,
    ) -> Result<SurveyScores, ScoringError> {
        let snapshot = self.load_snapshot().await?;
        let responses = self.responses.responses_for_survey(survey).await?;
        Ok(score_survey_parallel(&snapshot, &responses, workers))
    }

    /// Score one user's responses within a survey.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::UnknownUser` for a missing account.
    pub async fn score_survey_for_user(
        &self,
        survey: SurveyId,
        user: &UserId,
    ) -> Result<SurveyScores, ScoringError> {
        if self.users.get_user(user).await?.is_none() {
            return Err(ScoringError::UnknownUser);
        }
        let snapshot = self.load_snapshot().await?;
        let responses: Vec<Response> = self
            .responses
            .responses_for_survey(survey)
            .await?
            .into_iter()
            .filter(|r| r.user() == user)
            .collect();
        Ok(score_survey(&snapshot, &responses))
    }

    /// Score a survey restricted to technical or business stakeholders,
    /// for side-by-side comparison of the two populations.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::Storage` if repository access fails.
    pub async fn score_survey_by_technicality(
        &self,
        survey: SurveyId,
        technical: bool,
    ) -> Result<SurveyScores, ScoringError> {
        let population: HashSet<UserId> = self
            .users
            .list_users()
            .await?
            .into_iter()
            .filter(|u| !u.is_administrator() && u.is_technical() == technical)
            .map(|u| u.id().clone())
            .collect();

        let snapshot = self.load_snapshot().await?;
        let responses: Vec<Response> = self
            .responses
            .responses_for_survey(survey)
            .await?
            .into_iter()
            .filter(|r| population.contains(r.user()))
            .collect();
        Ok(score_survey(&snapshot, &responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_core::model::{
        AnswerKind, Category, CategoryId, QuestionId, RatingGroup, Response, Role, RoleId, User,
        WeightSpec,
    };
    use sat_core::time::fixed_today;
    use std::collections::HashMap;
    use storage::repository::{
        InMemoryRepository, NewAnswerSet, NewQuestion, SurveyRepository,
    };

    async fn seed(repo: &InMemoryRepository) -> (QuestionId, SurveyId) {
        repo.upsert_role(&Role::new(RoleId::new("CEO"), "ceo").unwrap())
            .await
            .unwrap();
        repo.upsert_role(&Role::new(RoleId::new("CTO"), "cto").unwrap())
            .await
            .unwrap();
        repo.upsert_category(
            &Category::new(
                CategoryId::new("STA"),
                "Security Trust and Assurance",
                "",
                RatingGroup::Attitude,
                0,
            )
            .unwrap(),
        )
        .await
        .unwrap();
        let answers = repo
            .insert_answer_set(NewAnswerSet {
                choices_text: "Strongly Agree;Agree;Neutral;Disagree;Strongly Disagree".into(),
                kind: AnswerKind::Single,
            })
            .await
            .unwrap();
        let question = repo
            .insert_question(NewQuestion {
                category_id: CategoryId::new("STA"),
                answer_set_id: answers,
                text: "Security is a high priority".into(),
                rationale: None,
                roles: vec![RoleId::new("CEO"), RoleId::new("CTO")],
                weights: WeightSpec::parse("5,4,3,2,1").unwrap(),
                wording_overrides: HashMap::new(),
            })
            .await
            .unwrap();

        repo.insert_user(&User::new(UserId::new("test.ceo"), RoleId::new("CEO"), "h", false).unwrap())
            .await
            .unwrap();
        repo.insert_user(&User::new(UserId::new("test.cto"), RoleId::new("CTO"), "h", true).unwrap())
            .await
            .unwrap();

        let survey = repo.create_survey(fixed_today()).await.unwrap();
        (question, survey)
    }

    fn service(repo: &InMemoryRepository) -> ScoringService {
        ScoringService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn scores_split_by_user_and_technicality() {
        let repo = InMemoryRepository::new();
        let (question, survey) = seed(&repo).await;

        repo.append_responses(&[
            Response::new(question, UserId::new("test.ceo"), survey, "Strongly Agree"),
            Response::new(question, UserId::new("test.cto"), survey, "Strongly Disagree"),
        ])
        .await
        .unwrap();

        let service = service(&repo);
        let sta = CategoryId::new("STA");

        let all = service.score_survey(survey).await.unwrap();
        assert_eq!(all.category_score(&sta), Some(3.0));

        let ceo_only = service
            .score_survey_for_user(survey, &UserId::new("test.ceo"))
            .await
            .unwrap();
        assert_eq!(ceo_only.category_score(&sta), Some(5.0));

        let technical = service
            .score_survey_by_technicality(survey, true)
            .await
            .unwrap();
        assert_eq!(technical.category_score(&sta), Some(1.0));

        let business = service
            .score_survey_by_technicality(survey, false)
            .await
            .unwrap();
        assert_eq!(business.category_score(&sta), Some(5.0));

        let err = service
            .score_survey_for_user(survey, &UserId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::UnknownUser));
    }

    #[tokio::test]
    async fn worker_pool_matches_sequential_scoring() {
        let repo = InMemoryRepository::new();
        let (question, survey) = seed(&repo).await;

        let choices = ["Strongly Agree", "Agree", "Neutral", "Disagree"];
        let batch: Vec<Response> = (0..50)
            .map(|i| {
                Response::new(
                    question,
                    UserId::new("test.ceo"),
                    survey,
                    choices[i % choices.len()],
                )
            })
            .collect();
        repo.append_responses(&batch).await.unwrap();

        let service = service(&repo);
        let sequential = service.score_survey(survey).await.unwrap();
        let parallel = service
            .score_survey_with_workers(survey, NonZeroUsize::new(4).unwrap())
            .await
            .unwrap();
        assert_eq!(parallel, sequential);
    }
}
