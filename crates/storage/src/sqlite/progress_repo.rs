use sat_core::model::{Survey, SurveyId, UserId, UserProgress};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_survey_row, ser, survey_id_from_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn invite(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, survey_id, finished)
            VALUES (?1, ?2, 0)
            ",
        )
        .bind(user.as_str())
        .bind(id_to_i64("survey_id", survey.value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_progress(
        &self,
        user: &UserId,
        survey: SurveyId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, survey_id, finished
            FROM user_progress
            WHERE user_id = ?1 AND survey_id = ?2
            ",
        )
        .bind(user.as_str())
        .bind(id_to_i64("survey_id", survey.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(UserProgress::from_persisted(
                UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
                survey_id_from_i64(row.try_get::<i64, _>("survey_id").map_err(ser)?)?,
                row.try_get::<i64, _>("finished").map_err(ser)? != 0,
            ))),
            None => Ok(None),
        }
    }

    async fn outstanding_surveys(&self, user: &UserId) -> Result<Vec<Survey>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id, s.created_on
            FROM surveys s
            JOIN user_progress p ON p.survey_id = s.id
            WHERE p.user_id = ?1 AND p.finished = 0
            ORDER BY s.id ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut surveys = Vec::with_capacity(rows.len());
        for row in rows {
            surveys.push(map_survey_row(&row)?);
        }
        Ok(surveys)
    }

    async fn mark_complete(&self, user: &UserId, survey: SurveyId) -> Result<(), StorageError> {
        // No row means no invite; completing an unknown pair is a no-op.
        sqlx::query(
            r"
            UPDATE user_progress
            SET finished = 1
            WHERE user_id = ?1 AND survey_id = ?2
            ",
        )
        .bind(user.as_str())
        .bind(id_to_i64("survey_id", survey.value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
