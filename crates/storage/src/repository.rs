use async_trait::async_trait;
use chrono::NaiveDate;
use sat_core::model::{
    AnswerKind, AnswerSet, AnswerSetId, Category, CategoryId, Question, QuestionId, Response,
    Role, RoleId, Survey, SurveyId, User, UserId, UserProgress, WeightSpec,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated (duplicate user, duplicate
    /// invite for the same user/survey pair, ...).
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for an answer set; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAnswerSet {
    /// `;`-delimited choice text.
    pub choices_text: String,
    pub kind: AnswerKind,
}

/// Insert shape for a question with its role links and wording overrides.
///
/// The whole record is written in one transaction; the id is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub category_id: CategoryId,
    pub answer_set_id: AnswerSetId,
    pub text: String,
    pub rationale: Option<String>,
    pub roles: Vec<RoleId>,
    pub weights: WeightSpec,
    pub wording_overrides: HashMap<RoleId, String>,
}

/// Repository contract for the read-mostly catalog: roles, categories,
/// answer sets and questions, seeded once at setup.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a role.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the role cannot be stored.
    async fn upsert_role(&self, role: &Role) -> Result<(), StorageError>;

    async fn get_role(&self, id: &RoleId) -> Result<Option<Role>, StorageError>;

    async fn list_roles(&self) -> Result<Vec<Role>, StorageError>;

    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError>;

    /// All categories in display order (TDU, IAB, SPI, STA, DSA for the
    /// default catalog).
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    async fn insert_answer_set(&self, record: NewAnswerSet)
    -> Result<AnswerSetId, StorageError>;

    async fn get_answer_set(&self, id: AnswerSetId) -> Result<Option<AnswerSet>, StorageError>;

    async fn list_answer_sets(&self) -> Result<Vec<AnswerSet>, StorageError>;

    /// Insert a question together with its role links and wording
    /// overrides in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on duplicate question text.
    async fn insert_question(&self, record: NewQuestion) -> Result<QuestionId, StorageError>;

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Questions applicable to a role, ordered by category display
    /// position then question id.
    async fn questions_for_role(&self, role: &RoleId) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for user accounts and session tokens.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Replace the password hash and clear any active session token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown user.
    async fn set_password_hash(&self, id: &UserId, hash: &str) -> Result<(), StorageError>;

    /// Set or clear the persisted session token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown user.
    async fn set_session_token(
        &self,
        id: &UserId,
        token: Option<&str>,
    ) -> Result<(), StorageError>;

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError>;
}

/// Repository contract for survey rounds.
#[async_trait]
pub trait SurveyRepository: Send + Sync {
    async fn create_survey(&self, created_on: NaiveDate) -> Result<SurveyId, StorageError>;

    async fn get_survey(&self, id: SurveyId) -> Result<Option<Survey>, StorageError>;

    async fn list_surveys(&self) -> Result<Vec<Survey>, StorageError>;
}

/// Repository contract for per-(user, survey) completion tracking.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Create the progress row for an invite, finished = false.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the (user, survey) pair is
    /// already invited; the composite key enforces at-most-one invite.
    async fn invite(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError>;

    async fn get_progress(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<Option<UserProgress>, StorageError>;

    /// Surveys this user has been invited to but not finished, ordered by
    /// ascending survey id.
    async fn outstanding_surveys(&self, user: &UserId) -> Result<Vec<Survey>, StorageError>;

    /// Set the finished flag. Idempotent; unknown pairs are a no-op.
    async fn mark_complete(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError>;
}

/// Repository contract for submitted responses (append-only).
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Append a batch of responses in one transaction.
    async fn append_responses(&self, responses: &[Response]) -> Result<(), StorageError>;

    async fn responses_for_survey(&self, survey: SurveyId)
    -> Result<Vec<Response>, StorageError>;
}

// ─── In-memory implementation ──────────────────────────────────────────────────

#[derive(Default)]
struct InMemoryState {
    roles: HashMap<RoleId, Role>,
    categories: HashMap<CategoryId, Category>,
    answer_sets: HashMap<AnswerSetId, AnswerSet>,
    questions: HashMap<QuestionId, Question>,
    users: HashMap<UserId, User>,
    surveys: Vec<Survey>,
    progress: HashMap<(UserId, SurveyId), UserProgress>,
    responses: Vec<Response>,
    next_answer_set_id: u64,
    next_question_id: u64,
    next_survey_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn sort_questions(state: &InMemoryState, questions: &mut [Question]) {
    questions.sort_by_key(|q| {
        let position = state
            .categories
            .get(q.category_id())
            .map_or(u32::MAX, Category::position);
        (position, q.id())
    });
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_role(&self, role: &Role) -> Result<(), StorageError> {
        self.lock()?.roles.insert(role.id().clone(), role.clone());
        Ok(())
    }

    async fn get_role(&self, id: &RoleId) -> Result<Option<Role>, StorageError> {
        Ok(self.lock()?.roles.get(id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StorageError> {
        let mut roles: Vec<Role> = self.lock()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(roles)
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        self.lock()?
            .categories
            .insert(category.id().clone(), category.clone());
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let mut categories: Vec<Category> = self.lock()?.categories.values().cloned().collect();
        categories.sort_by_key(Category::position);
        Ok(categories)
    }

    async fn insert_answer_set(
        &self,
        record: NewAnswerSet,
    ) -> Result<AnswerSetId, StorageError> {
        let mut state = self.lock()?;
        state.next_answer_set_id += 1;
        let id = AnswerSetId::new(state.next_answer_set_id);
        let set = AnswerSet::from_delimited(id, &record.choices_text, record.kind)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.answer_sets.insert(id, set);
        Ok(id)
    }

    async fn get_answer_set(&self, id: AnswerSetId) -> Result<Option<AnswerSet>, StorageError> {
        Ok(self.lock()?.answer_sets.get(&id).cloned())
    }

    async fn list_answer_sets(&self) -> Result<Vec<AnswerSet>, StorageError> {
        let mut sets: Vec<AnswerSet> = self.lock()?.answer_sets.values().cloned().collect();
        sets.sort_by_key(AnswerSet::id);
        Ok(sets)
    }

    async fn insert_question(&self, record: NewQuestion) -> Result<QuestionId, StorageError> {
        let mut state = self.lock()?;
        if state.questions.values().any(|q| q.text() == record.text) {
            return Err(StorageError::Conflict);
        }
        state.next_question_id += 1;
        let id = QuestionId::new(state.next_question_id);
        let question = Question::new(
            id,
            record.category_id,
            record.answer_set_id,
            record.text,
            record.rationale,
            record.roles,
            record.weights,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?
        .with_wording_overrides(record.wording_overrides);
        state.questions.insert(id, question);
        Ok(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        let mut questions: Vec<Question> = state.questions.values().cloned().collect();
        sort_questions(&state, &mut questions);
        Ok(questions)
    }

    async fn questions_for_role(&self, role: &RoleId) -> Result<Vec<Question>, StorageError> {
        let state = self.lock()?;
        let mut questions: Vec<Question> = state
            .questions
            .values()
            .filter(|q| q.applies_to(role))
            .cloned()
            .collect();
        sort_questions(&state, &mut questions);
        Ok(questions)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.users.contains_key(user.id()) {
            return Err(StorageError::Conflict);
        }
        state.users.insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(users)
    }

    async fn set_password_hash(&self, id: &UserId, hash: &str) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let user = state.users.get(id).ok_or(StorageError::NotFound)?;
        let updated = User::from_persisted(
            user.id().clone(),
            user.role().clone(),
            hash.to_owned(),
            user.is_technical(),
            None,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.users.insert(id.clone(), updated);
        Ok(())
    }

    async fn set_session_token(
        &self,
        id: &UserId,
        token: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let user = state.users.get(id).ok_or(StorageError::NotFound)?;
        let updated = User::from_persisted(
            user.id().clone(),
            user.role().clone(),
            user.password_hash().to_owned(),
            user.is_technical(),
            token.map(str::to_owned),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.users.insert(id.clone(), updated);
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.session_token() == Some(token))
            .cloned())
    }
}

#[async_trait]
impl SurveyRepository for InMemoryRepository {
    async fn create_survey(&self, created_on: NaiveDate) -> Result<SurveyId, StorageError> {
        let mut state = self.lock()?;
        state.next_survey_id += 1;
        let id = SurveyId::new(state.next_survey_id);
        state.surveys.push(Survey::new(id, created_on));
        Ok(id)
    }

    async fn get_survey(&self, id: SurveyId) -> Result<Option<Survey>, StorageError> {
        Ok(self
            .lock()?
            .surveys
            .iter()
            .find(|s| s.id() == id)
            .copied())
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StorageError> {
        Ok(self.lock()?.surveys.clone())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn invite(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let key = (user.clone(), survey);
        if state.progress.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        state
            .progress
            .insert(key, UserProgress::invited(user.clone(), survey));
        Ok(())
    }

    async fn get_progress(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<Option<UserProgress>, StorageError> {
        Ok(self.lock()?.progress.get(&(user.clone(), survey)).cloned())
    }

    async fn outstanding_surveys(&self, user: &UserId) -> Result<Vec<Survey>, StorageError> {
        let state = self.lock()?;
        let mut surveys: Vec<Survey> = state
            .progress
            .values()
            .filter(|p| p.user() == user && !p.is_finished())
            .filter_map(|p| state.surveys.iter().find(|s| s.id() == p.survey()))
            .copied()
            .collect();
        surveys.sort_by_key(Survey::id);
        Ok(surveys)
    }

    async fn mark_complete(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let key = (user.clone(), survey);
        if state.progress.contains_key(&key) {
            state
                .progress
                .insert(key, UserProgress::from_persisted(user.clone(), survey, true));
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn append_responses(&self, responses: &[Response]) -> Result<(), StorageError> {
        self.lock()?.responses.extend_from_slice(responses);
        Ok(())
    }

    async fn responses_for_survey(
        &self,
        survey: SurveyId,
    ) -> Result<Vec<Response>, StorageError> {
        Ok(self
            .lock()?
            .responses
            .iter()
            .filter(|r| r.survey() == survey)
            .cloned()
            .collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub users: Arc<dyn UserRepository>,
    pub surveys: Arc<dyn SurveyRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub responses: Arc<dyn ResponseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            surveys: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            responses: Arc::new(repo),
        }
    }
}
