use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::CategoryId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryError {
    #[error("category code must be exactly 3 uppercase ASCII letters")]
    InvalidCode,

    #[error("category name cannot be empty")]
    EmptyName,

    #[error("unknown rating group: {0}")]
    UnknownRatingGroup(String),
}

/// Which aggregate rating a category feeds into.
///
/// Need and attitude categories each cover two of the five default
/// categories; awareness covers the DSbD-specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingGroup {
    Need,
    Attitude,
    Awareness,
}

impl RatingGroup {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingGroup::Need => "need",
            RatingGroup::Attitude => "attitude",
            RatingGroup::Awareness => "awareness",
        }
    }

    /// All groups, in the order they are reported.
    #[must_use]
    pub fn all() -> [RatingGroup; 3] {
        [
            RatingGroup::Need,
            RatingGroup::Attitude,
            RatingGroup::Awareness,
        ]
    }
}

impl FromStr for RatingGroup {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "need" => Ok(RatingGroup::Need),
            "attitude" => Ok(RatingGroup::Attitude),
            "awareness" => Ok(RatingGroup::Awareness),
            other => Err(CategoryError::UnknownRatingGroup(other.to_owned())),
        }
    }
}

/// A question category, e.g. "Technology and Data Usage" (TDU).
///
/// `position` fixes the catalog display order (TDU, IAB, SPI, STA, DSA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    name: String,
    rationale: String,
    rating: RatingGroup,
    position: u32,
}

impl Category {
    /// Creates a new category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::InvalidCode` unless the id is 3 uppercase
    /// ASCII letters, or `CategoryError::EmptyName` for a blank name.
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        rationale: impl Into<String>,
        rating: RatingGroup,
        position: u32,
    ) -> Result<Self, CategoryError> {
        let code = id.as_str();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CategoryError::InvalidCode);
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CategoryError::EmptyName);
        }
        Ok(Self {
            id,
            name: name.trim().to_owned(),
            rationale: rationale.into(),
            rating,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    #[must_use]
    pub fn rating(&self) -> RatingGroup {
        self.rating
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}
