use chrono::NaiveDate;

use crate::model::ids::{SurveyId, UserId};

/// One survey round, created by an administrator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Survey {
    id: SurveyId,
    created_on: NaiveDate,
}

impl Survey {
    #[must_use]
    pub fn new(id: SurveyId, created_on: NaiveDate) -> Self {
        Self { id, created_on }
    }

    #[must_use]
    pub fn id(&self) -> SurveyId {
        self.id
    }

    #[must_use]
    pub fn created_on(&self) -> NaiveDate {
        self.created_on
    }
}

/// Per-(user, survey) completion flag.
///
/// A row is created when the user is invited and flipped to finished when
/// they submit their responses. The pair is the composite key: a user is
/// invited to a survey at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    user: UserId,
    survey: SurveyId,
    finished: bool,
}

impl UserProgress {
    /// A fresh invite, not yet finished.
    #[must_use]
    pub fn invited(user: UserId, survey: SurveyId) -> Self {
        Self {
            user,
            survey,
            finished: false,
        }
    }

    #[must_use]
    pub fn from_persisted(user: UserId, survey: SurveyId, finished: bool) -> Self {
        Self {
            user,
            survey,
            finished,
        }
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    #[must_use]
    pub fn survey(&self) -> SurveyId {
        self.survey
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
