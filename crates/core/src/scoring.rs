//! Survey scoring.
//!
//! Scores are computed over an immutable [`ScoringSnapshot`] of the question
//! catalog, loaded once per pass. Per-response weight resolution is a pure
//! function of the snapshot, so responses can be tallied in parallel and the
//! partial (sum, count) tallies reduced sequentially per category.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::thread;

use crate::model::{AnswerSet, AnswerSetId, Category, CategoryId, Question, QuestionId, RatingGroup, Response};

/// Immutable lookup tables for one scoring pass.
#[derive(Debug, Clone)]
pub struct ScoringSnapshot {
    categories: Vec<Category>,
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<AnswerSetId, AnswerSet>,
}

impl ScoringSnapshot {
    /// Builds a snapshot. Categories keep their catalog display order.
    #[must_use]
    pub fn new(
        mut categories: Vec<Category>,
        questions: Vec<Question>,
        answers: Vec<AnswerSet>,
    ) -> Self {
        categories.sort_by_key(Category::position);
        Self {
            categories,
            questions: questions.into_iter().map(|q| (q.id(), q)).collect(),
            answers: answers.into_iter().map(|a| (a.id(), a)).collect(),
        }
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    /// Numeric contribution of a single response.
    ///
    /// `None` when the owning question is unscored, unknown, or the chosen
    /// text is not one of the answer set's choices. Those responses simply
    /// do not count towards the category score.
    #[must_use]
    pub fn response_weight(&self, response: &Response) -> Option<i32> {
        let question = self.questions.get(&response.question())?;
        if !question.weights().is_scored() {
            return None;
        }
        let answer = self.answers.get(&question.answer_set_id())?;
        let position = answer.position_of(response.choice())?;
        question.weights().weight_at(position)
    }
}

/// Running (sum, count) pair for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CategoryTally {
    sum: i64,
    count: usize,
}

impl CategoryTally {
    fn add(&mut self, weight: i32) {
        self.sum += i64::from(weight);
        self.count += 1;
    }

    fn merge(&mut self, other: CategoryTally) {
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Mean contribution rounded to 2 decimals; 0 with no contributions.
    fn score(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        round2(self.sum as f64 / self.count as f64)
    }
}

/// Score of one category within a survey.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: CategoryId,
    pub rating: RatingGroup,
    pub score: f64,
    /// Number of responses that contributed numerically.
    pub contributing: usize,
}

/// Full score breakdown for one survey's response set.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyScores {
    /// Per-category scores in catalog display order.
    pub categories: Vec<CategoryScore>,
    pub need: f64,
    pub attitude: f64,
    pub awareness: f64,
    pub overall: f64,
}

impl SurveyScores {
    /// Score of a single category, if it exists in the snapshot.
    #[must_use]
    pub fn category_score(&self, id: &CategoryId) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| &c.category == id)
            .map(|c| c.score)
    }

    #[must_use]
    pub fn rating_score(&self, group: RatingGroup) -> f64 {
        match group {
            RatingGroup::Need => self.need,
            RatingGroup::Attitude => self.attitude,
            RatingGroup::Awareness => self.awareness,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn tally_chunk(
    snapshot: &ScoringSnapshot,
    responses: &[Response],
) -> HashMap<CategoryId, CategoryTally> {
    let mut tallies: HashMap<CategoryId, CategoryTally> = HashMap::new();
    for response in responses {
        let Some(question) = snapshot.questions.get(&response.question()) else {
            continue;
        };
        let Some(weight) = snapshot.response_weight(response) else {
            continue;
        };
        tallies
            .entry(question.category_id().clone())
            .or_default()
            .add(weight);
    }
    tallies
}

fn scores_from_tallies(
    snapshot: &ScoringSnapshot,
    tallies: &HashMap<CategoryId, CategoryTally>,
) -> SurveyScores {
    let categories: Vec<CategoryScore> = snapshot
        .categories()
        .iter()
        .map(|category| {
            let tally = tallies.get(category.id()).copied().unwrap_or_default();
            CategoryScore {
                category: category.id().clone(),
                rating: category.rating(),
                score: tally.score(),
                contributing: tally.count,
            }
        })
        .collect();

    let group_score = |group: RatingGroup| -> f64 {
        let members: Vec<f64> = categories
            .iter()
            .filter(|c| c.rating == group)
            .map(|c| c.score)
            .collect();
        if members.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        round2(members.iter().sum::<f64>() / members.len() as f64)
    };

    let need = group_score(RatingGroup::Need);
    let attitude = group_score(RatingGroup::Attitude);
    let awareness = group_score(RatingGroup::Awareness);
    let overall = round2((need + attitude + awareness) / 3.0);

    SurveyScores {
        categories,
        need,
        attitude,
        awareness,
        overall,
    }
}

/// Scores a survey's full response set sequentially.
#[must_use]
pub fn score_survey(snapshot: &ScoringSnapshot, responses: &[Response]) -> SurveyScores {
    let tallies = tally_chunk(snapshot, responses);
    scores_from_tallies(snapshot, &tallies)
}

/// Scores a survey's response set with a bounded pool of scoped workers.
///
/// Each worker tallies a contiguous chunk of responses against the shared
/// snapshot; the partial tallies are then merged and reduced per category.
/// The result is identical to [`score_survey`].
#[must_use]
pub fn score_survey_parallel(
    snapshot: &ScoringSnapshot,
    responses: &[Response],
    workers: NonZeroUsize,
) -> SurveyScores {
    let workers = workers.get().min(responses.len());
    if workers <= 1 {
        return score_survey(snapshot, responses);
    }

    let chunk_size = responses.len().div_ceil(workers);
    let merged = thread::scope(|scope| {
        let handles: Vec<_> = responses
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || tally_chunk(snapshot, chunk)))
            .collect();

        let mut merged: HashMap<CategoryId, CategoryTally> = HashMap::new();
        for handle in handles {
            // scoped worker threads cannot outlive the scope, and tally_chunk
            // does not panic
            for (category, tally) in handle.join().expect("scoring worker panicked") {
                merged.entry(category).or_default().merge(tally);
            }
        }
        merged
    });

    scores_from_tallies(snapshot, &merged)
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
