use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sat_core::model::{QuestionId, Response, SurveyId, UserId};
use serde::{Deserialize, Serialize};
use storage::repository::{ProgressRepository, ResponseRepository};

use crate::error::DraftError;

/// Staged answers for one (user, survey) pair.
///
/// Multi-select questions stage several choices under one question id;
/// each staged choice becomes its own response row on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyDraft {
    entries: BTreeMap<QuestionId, Vec<String>>,
}

impl SurveyDraft {
    /// Stage the choices for a question, replacing any earlier answer.
    pub fn stage(&mut self, question: QuestionId, choices: Vec<String>) {
        self.entries.insert(question, choices);
    }

    #[must_use]
    pub fn answer(&self, question: QuestionId) -> Option<&[String]> {
        self.entries.get(&question).map(Vec::as_slice)
    }

    /// Number of questions with at least one non-empty staged choice.
    ///
    /// Staging an empty choice list (or only blank strings) clears the
    /// answer and does not count.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|choices| choices.iter().any(|choice| !choice.is_empty()))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expands the staged answers into response rows.
    #[must_use]
    pub fn to_responses(&self, user: &UserId, survey: SurveyId) -> Vec<Response> {
        self.entries
            .iter()
            .flat_map(|(question, choices)| {
                choices
                    .iter()
                    .map(|choice| Response::new(*question, user.clone(), survey, choice.clone()))
            })
            .collect()
    }
}

/// Durable answer staging.
///
/// Drafts are written to one JSON file per (user, survey) pair so a crashed
/// or abandoned session resumes where it left off. Submission is the only
/// path that turns a draft into response rows.
#[derive(Clone)]
pub struct DraftCollector {
    dir: PathBuf,
    responses: Arc<dyn ResponseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl DraftCollector {
    /// # Errors
    ///
    /// Returns `DraftError::Directory` if the draft directory cannot be
    /// created.
    pub fn new(
        dir: impl Into<PathBuf>,
        responses: Arc<dyn ResponseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Result<Self, DraftError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DraftError::Directory(format!("{}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            responses,
            progress,
        })
    }

    fn draft_path(&self, user: &UserId, survey: SurveyId) -> PathBuf {
        self.dir
            .join(user.as_str())
            .join(format!("survey_{}.json", survey.value()))
    }

    /// Load the staged draft. A missing file is an empty draft; an
    /// unreadable one is logged and treated as empty rather than blocking
    /// the user.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Io` for filesystem failures other than a
    /// missing file.
    pub fn load(&self, user: &UserId, survey: SurveyId) -> Result<SurveyDraft, DraftError> {
        let path = self.draft_path(user, survey);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SurveyDraft::default());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(draft) => Ok(draft),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "discarding unreadable draft"
                );
                Ok(SurveyDraft::default())
            }
        }
    }

    /// Stage an answer and persist the draft.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Io` or `DraftError::Serde` if the draft file
    /// cannot be rewritten.
    pub fn stage(
        &self,
        user: &UserId,
        survey: SurveyId,
        question: QuestionId,
        choices: Vec<String>,
    ) -> Result<SurveyDraft, DraftError> {
        let mut draft = self.load(user, survey)?;
        draft.stage(question, choices);
        self.save(&self.draft_path(user, survey), &draft)?;
        Ok(draft)
    }

    /// Number of questions answered so far in the staged draft.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Io` for filesystem failures.
    pub fn answered_count(&self, user: &UserId, survey: SurveyId) -> Result<usize, DraftError> {
        Ok(self.load(user, survey)?.answered_count())
    }

    /// Delete the staged draft without submitting it.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Io` for filesystem failures other than a
    /// missing file.
    pub fn discard(&self, user: &UserId, survey: SurveyId) -> Result<(), DraftError> {
        match fs::remove_file(self.draft_path(user, survey)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Submit the draft: append all response rows in one batch, flag the
    /// survey as finished for the user, and delete the draft file.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Storage` if persistence fails; the draft file
    /// is kept in that case so the submission can be retried.
    pub async fn commit_and_clear(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<usize, DraftError> {
        let draft = self.load(user, survey)?;
        let responses = draft.to_responses(user, survey);

        self.responses.append_responses(&responses).await?;
        self.progress.mark_complete(user, survey).await?;
        self.discard(user, survey)?;

        Ok(responses.len())
    }

    /// Writes via a temp file and rename so a crash mid-write never leaves
    /// a truncated draft behind.
    fn save(&self, path: &Path, draft: &SurveyDraft) -> Result<(), DraftError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(draft)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use sat_core::time::fixed_today;
    use storage::repository::{
        InMemoryRepository, ProgressRepository, ResponseRepository, SurveyRepository,
    };

    fn temp_draft_dir() -> PathBuf {
        let tag: u64 = rand::rng().random();
        std::env::temp_dir().join(format!("sat-drafts-{tag:016x}"))
    }

    async fn setup() -> (DraftCollector, InMemoryRepository, UserId, SurveyId) {
        let repo = InMemoryRepository::new();
        let survey = repo.create_survey(fixed_today()).await.unwrap();
        let user = UserId::new("test.ceo");
        repo.invite(&user, survey).await.unwrap();

        let collector = DraftCollector::new(
            temp_draft_dir(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .unwrap();
        (collector, repo, user, survey)
    }

    #[tokio::test]
    async fn drafts_survive_reloading() {
        let (collector, _, user, survey) = setup().await;

        collector
            .stage(&user, survey, QuestionId::new(1), vec!["Agree".into()])
            .unwrap();
        collector
            .stage(&user, survey, QuestionId::new(2), vec!["Yes".into(), "No".into()])
            .unwrap();
        // re-answering replaces the earlier choice
        collector
            .stage(&user, survey, QuestionId::new(1), vec!["Neutral".into()])
            .unwrap();

        let draft = collector.load(&user, survey).unwrap();
        assert_eq!(draft.answered_count(), 2);
        assert_eq!(
            draft.answer(QuestionId::new(1)),
            Some(&["Neutral".to_owned()][..])
        );
        assert_eq!(collector.answered_count(&user, survey).unwrap(), 2);

        let _ = fs::remove_dir_all(&collector.dir);
    }

    #[tokio::test]
    async fn blank_answers_do_not_count_as_answered() {
        let (collector, _, user, survey) = setup().await;

        // a cleared answer and a blank-only answer are both unanswered
        collector
            .stage(&user, survey, QuestionId::new(1), vec![])
            .unwrap();
        collector
            .stage(&user, survey, QuestionId::new(2), vec![String::new()])
            .unwrap();
        assert_eq!(collector.answered_count(&user, survey).unwrap(), 0);

        collector
            .stage(&user, survey, QuestionId::new(2), vec!["Agree".into()])
            .unwrap();
        assert_eq!(collector.answered_count(&user, survey).unwrap(), 1);

        let _ = fs::remove_dir_all(&collector.dir);
    }

    #[tokio::test]
    async fn unreadable_draft_is_treated_as_empty() {
        let (collector, _, user, survey) = setup().await;
        collector
            .stage(&user, survey, QuestionId::new(1), vec!["Agree".into()])
            .unwrap();

        let path = collector.draft_path(&user, survey);
        fs::write(&path, b"{ not json").unwrap();

        let draft = collector.load(&user, survey).unwrap();
        assert!(draft.is_empty());

        let _ = fs::remove_dir_all(&collector.dir);
    }

    #[tokio::test]
    async fn commit_writes_responses_and_finishes_the_survey() {
        let (collector, repo, user, survey) = setup().await;
        collector
            .stage(&user, survey, QuestionId::new(1), vec!["Agree".into()])
            .unwrap();
        collector
            .stage(
                &user,
                survey,
                QuestionId::new(2),
                vec!["Email".into(), "Phone".into()],
            )
            .unwrap();

        let written = collector.commit_and_clear(&user, survey).await.unwrap();
        assert_eq!(written, 3);

        let stored = repo.responses_for_survey(survey).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|r| r.user() == &user));

        let progress = repo.get_progress(&user, survey).await.unwrap().unwrap();
        assert!(progress.is_finished());

        // the draft file is gone
        assert_eq!(collector.answered_count(&user, survey).unwrap(), 0);

        let _ = fs::remove_dir_all(&collector.dir);
    }

    #[tokio::test]
    async fn discard_drops_the_draft_without_responses() {
        let (collector, repo, user, survey) = setup().await;
        collector
            .stage(&user, survey, QuestionId::new(1), vec!["Agree".into()])
            .unwrap();

        collector.discard(&user, survey).unwrap();
        assert_eq!(collector.answered_count(&user, survey).unwrap(), 0);
        assert!(repo.responses_for_survey(survey).await.unwrap().is_empty());

        // discarding a missing draft is fine
        collector.discard(&user, survey).unwrap();

        let _ = fs::remove_dir_all(&collector.dir);
    }
}
