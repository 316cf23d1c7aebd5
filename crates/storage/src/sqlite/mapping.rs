use std::collections::HashMap;
use std::str::FromStr;

use sat_core::model::{
    AnswerKind, AnswerSet, AnswerSetId, Category, CategoryId, Question, QuestionId, RatingGroup,
    Response, Role, RoleId, Survey, SurveyId, User, UserId, WeightSpec,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a sqlx error, turning unique constraint violations into
/// `StorageError::Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn answer_set_id_from_i64(v: i64) -> Result<AnswerSetId, StorageError> {
    Ok(AnswerSetId::new(i64_to_u64("answer_set_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn survey_id_from_i64(v: i64) -> Result<SurveyId, StorageError> {
    Ok(SurveyId::new(i64_to_u64("survey_id", v)?))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_role_row(row: &SqliteRow) -> Result<Role, StorageError> {
    Role::new(
        RoleId::new(row.try_get::<String, _>("role_id").map_err(ser)?),
        row.try_get::<String, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    let rating_str: String = row.try_get("rating").map_err(ser)?;
    let rating = RatingGroup::from_str(&rating_str).map_err(ser)?;
    let position_i64: i64 = row.try_get("position").map_err(ser)?;
    let position = u32::try_from(position_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid position: {position_i64}")))?;

    Category::new(
        CategoryId::new(row.try_get::<String, _>("category_id").map_err(ser)?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("rationale").map_err(ser)?,
        rating,
        position,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_set_row(row: &SqliteRow) -> Result<AnswerSet, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = AnswerKind::from_str(&kind_str).map_err(ser)?;
    AnswerSet::from_delimited(
        answer_set_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        &row.try_get::<String, _>("choices").map_err(ser)?,
        kind,
    )
    .map_err(ser)
}

/// Assembles a question from its row plus the role links and wording
/// overrides loaded from the join tables.
pub(crate) fn build_question(
    row: &SqliteRow,
    roles: Vec<RoleId>,
    overrides: HashMap<RoleId, String>,
) -> Result<Question, StorageError> {
    let weights_str: String = row.try_get("weights").map_err(ser)?;
    let weights = WeightSpec::parse(&weights_str).map_err(ser)?;

    let question = Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        CategoryId::new(row.try_get::<String, _>("category_id").map_err(ser)?),
        answer_set_id_from_i64(row.try_get::<i64, _>("answer_set_id").map_err(ser)?)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<Option<String>, _>("rationale").map_err(ser)?,
        roles,
        weights,
    )
    .map_err(ser)?;

    Ok(question.with_wording_overrides(overrides))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    User::from_persisted(
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        RoleId::new(row.try_get::<String, _>("role_id").map_err(ser)?),
        row.try_get::<String, _>("password_hash").map_err(ser)?,
        row.try_get::<i64, _>("technical").map_err(ser)? != 0,
        row.try_get::<Option<String>, _>("session_token")
            .map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_survey_row(row: &SqliteRow) -> Result<Survey, StorageError> {
    Ok(Survey::new(
        survey_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("created_on").map_err(ser)?,
    ))
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<Response, StorageError> {
    Ok(Response::new(
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        survey_id_from_i64(row.try_get::<i64, _>("survey_id").map_err(ser)?)?,
        row.try_get::<String, _>("choice").map_err(ser)?,
    ))
}
