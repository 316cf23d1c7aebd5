use std::collections::HashMap;
use thiserror::Error;

use crate::model::answer::AnswerSet;
use crate::model::ids::{AnswerSetId, CategoryId, QuestionId, RoleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WeightError {
    #[error("weight entry is not an integer: {0}")]
    NotAnInteger(String),

    #[error("weight string is empty")]
    Empty,

    #[error("weight list has {weights} entries but the answer set has {choices} choices")]
    LengthMismatch { weights: usize, choices: usize },
}

/// How a question's choices contribute to the numeric score.
///
/// Unscored questions are informational: their responses never feed into a
/// category score. Scored questions carry one weight per answer choice,
/// positionally aligned, which models reversed or non-uniform scales
/// ("Strongly Agree" may score 5 on one question and 1 on another).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightSpec {
    Unscored,
    Scored(Vec<i32>),
}

impl WeightSpec {
    /// Parses the persisted weight encoding.
    ///
    /// The sentinels `+1`, `-1` and `0` mean "not scored"; anything else must
    /// be a comma-separated integer list. Only these exact sentinel strings
    /// are recognised.
    ///
    /// # Errors
    ///
    /// Returns `WeightError` for an empty string or a non-integer entry.
    pub fn parse(raw: &str) -> Result<Self, WeightError> {
        match raw.trim() {
            "" => Err(WeightError::Empty),
            "+1" | "-1" | "0" => Ok(WeightSpec::Unscored),
            list => {
                let weights = list
                    .split(',')
                    .map(|part| {
                        part.trim()
                            .parse::<i32>()
                            .map_err(|_| WeightError::NotAnInteger(part.trim().to_owned()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(WeightSpec::Scored(weights))
            }
        }
    }

    /// Canonical persisted form (`Unscored` is written back as `+1`).
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            WeightSpec::Unscored => "+1".to_owned(),
            WeightSpec::Scored(weights) => weights
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    #[must_use]
    pub fn is_scored(&self) -> bool {
        matches!(self, WeightSpec::Scored(_))
    }

    /// Weight of the choice at `position`, or `None` for unscored questions
    /// and out-of-range positions.
    #[must_use]
    pub fn weight_at(&self, position: usize) -> Option<i32> {
        match self {
            WeightSpec::Unscored => None,
            WeightSpec::Scored(weights) => weights.get(position).copied(),
        }
    }

    /// Checks the 1:1 alignment between weights and answer choices.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::LengthMismatch` if a `Scored` list does not
    /// match the choice count. `Unscored` always validates.
    pub fn validate_against(&self, answer: &AnswerSet) -> Result<(), WeightError> {
        if let WeightSpec::Scored(weights) = self {
            let choices = answer.choices().len();
            if weights.len() != choices {
                return Err(WeightError::LengthMismatch {
                    weights: weights.len(),
                    choices,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must target at least one role")]
    NoRoles,

    #[error(transparent)]
    Weight(#[from] WeightError),
}

/// A survey question.
///
/// Relationships are carried as id references: the owning category, the
/// shared answer set, and the roles the question applies to. A role-specific
/// wording override replaces the default text for that role only.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    category_id: CategoryId,
    answer_set_id: AnswerSetId,
    text: String,
    rationale: Option<String>,
    roles: Vec<RoleId>,
    weights: WeightSpec,
    wording_overrides: HashMap<RoleId, String>,
}

impl Question {
    /// Creates a new question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for blank text or
    /// `QuestionError::NoRoles` when no role applies.
    pub fn new(
        id: QuestionId,
        category_id: CategoryId,
        answer_set_id: AnswerSetId,
        text: impl Into<String>,
        rationale: Option<String>,
        roles: Vec<RoleId>,
        weights: WeightSpec,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if roles.is_empty() {
            return Err(QuestionError::NoRoles);
        }
        Ok(Self {
            id,
            category_id,
            answer_set_id,
            text: text.trim().to_owned(),
            rationale: rationale.map(|r| r.trim().to_owned()).filter(|r| !r.is_empty()),
            roles,
            weights,
            wording_overrides: HashMap::new(),
        })
    }

    /// Replaces the wording override table.
    #[must_use]
    pub fn with_wording_overrides(mut self, overrides: HashMap<RoleId, String>) -> Self {
        self.wording_overrides = overrides;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn category_id(&self) -> &CategoryId {
        &self.category_id
    }

    #[must_use]
    pub fn answer_set_id(&self) -> AnswerSetId {
        self.answer_set_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    #[must_use]
    pub fn weights(&self) -> &WeightSpec {
        &self.weights
    }

    #[must_use]
    pub fn applies_to(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }

    #[must_use]
    pub fn wording_overrides(&self) -> &HashMap<RoleId, String> {
        &self.wording_overrides
    }

    /// Text shown to `role`, honouring any per-role wording override.
    #[must_use]
    pub fn text_for_role(&self, role: &RoleId) -> &str {
        self.wording_overrides
            .get(role)
            .map_or(self.text.as_str(), String::as_str)
    }
}
