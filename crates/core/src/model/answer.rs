use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::AnswerSetId;

/// Separator between choices in the persisted answer text.
pub const CHOICE_SEPARATOR: char = ';';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer set must have at least one choice")]
    NoChoices,

    #[error("answer choice cannot be empty")]
    EmptyChoice,

    #[error("unknown answer kind: {0}")]
    UnknownKind(String),
}

/// Whether respondents pick one choice or any number of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Single,
    Multiple,
}

impl AnswerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerKind::Single => "single",
            AnswerKind::Multiple => "multiple",
        }
    }
}

impl FromStr for AnswerKind {
    type Err = AnswerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(AnswerKind::Single),
            "multiple" => Ok(AnswerKind::Multiple),
            other => Err(AnswerError::UnknownKind(other.to_owned())),
        }
    }
}

/// An ordered set of answer choices shared by one or more questions.
///
/// Choices are persisted as a single `;`-separated string; the order is
/// significant because scored questions align weights positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet {
    id: AnswerSetId,
    choices: Vec<String>,
    kind: AnswerKind,
}

impl AnswerSet {
    /// Creates an answer set from a `;`-delimited choice string.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::NoChoices` for an empty string and
    /// `AnswerError::EmptyChoice` if any `;`-separated segment is blank.
    pub fn from_delimited(
        id: AnswerSetId,
        text: &str,
        kind: AnswerKind,
    ) -> Result<Self, AnswerError> {
        if text.trim().is_empty() {
            return Err(AnswerError::NoChoices);
        }
        let choices: Vec<String> = text
            .split(CHOICE_SEPARATOR)
            .map(str::to_owned)
            .collect();
        if choices.iter().any(|c| c.trim().is_empty()) {
            return Err(AnswerError::EmptyChoice);
        }
        Ok(Self { id, choices, kind })
    }

    #[must_use]
    pub fn id(&self) -> AnswerSetId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> AnswerKind {
        self.kind
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Rebuilds the persisted `;`-joined form.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.choices.join(";")
    }

    /// 0-based position of `choice` in the choice list, if present.
    #[must_use]
    pub fn position_of(&self, choice: &str) -> Option<usize> {
        self.choices.iter().position(|c| c == choice)
    }

    #[must_use]
    pub fn contains(&self, choice: &str) -> bool {
        self.position_of(choice).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIKERT: &str = "Strongly Agree;Agree;Neutral;Disagree;Strongly Disagree";

    #[test]
    fn from_delimited_splits_choices_in_order() {
        let set = AnswerSet::from_delimited(AnswerSetId::new(1), LIKERT, AnswerKind::Single)
            .unwrap();
        assert_eq!(set.choices().len(), 5);
        assert_eq!(set.choices()[0], "Strongly Agree");
        assert_eq!(set.choices()[4], "Strongly Disagree");
        assert_eq!(set.joined_text(), LIKERT);
    }

    #[test]
    fn position_of_finds_exact_choice() {
        let set = AnswerSet::from_delimited(AnswerSetId::new(1), LIKERT, AnswerKind::Single)
            .unwrap();
        assert_eq!(set.position_of("Agree"), Some(1));
        assert_eq!(set.position_of("agree"), None);
        assert!(set.contains("Neutral"));
    }

    #[test]
    fn from_delimited_rejects_empty_input() {
        let err = AnswerSet::from_delimited(AnswerSetId::new(1), "  ", AnswerKind::Single)
            .unwrap_err();
        assert_eq!(err, AnswerError::NoChoices);

        let err = AnswerSet::from_delimited(AnswerSetId::new(1), "Yes;;No", AnswerKind::Single)
            .unwrap_err();
        assert_eq!(err, AnswerError::EmptyChoice);
    }

    #[test]
    fn answer_kind_parses_known_tags() {
        assert_eq!("single".parse::<AnswerKind>().unwrap(), AnswerKind::Single);
        assert_eq!(
            "multiple".parse::<AnswerKind>().unwrap(),
            AnswerKind::Multiple
        );
        assert!("both".parse::<AnswerKind>().is_err());
    }
}
