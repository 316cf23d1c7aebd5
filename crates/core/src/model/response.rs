use crate::model::ids::{QuestionId, SurveyId, UserId};

/// One chosen answer to a question within a survey.
///
/// Multi-select questions produce one response per selected choice, so a
/// single (question, user, survey) triple can have several rows. Responses
/// are append-only; re-submission is not modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    question: QuestionId,
    user: UserId,
    survey: SurveyId,
    choice: String,
}

impl Response {
    #[must_use]
    pub fn new(
        question: QuestionId,
        user: UserId,
        survey: SurveyId,
        choice: impl Into<String>,
    ) -> Self {
        Self {
            question,
            user,
            survey,
            choice: choice.into(),
        }
    }

    #[must_use]
    pub fn question(&self) -> QuestionId {
        self.question
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn survey(&self) -> SurveyId {
        self.survey
    }

    /// The chosen answer text, exactly as it appears in the answer set.
    #[must_use]
    pub fn choice(&self) -> &str {
        &self.choice
    }
}
