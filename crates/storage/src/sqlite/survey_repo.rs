use chrono::NaiveDate;
use sat_core::model::{Survey, SurveyId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_survey_row, survey_id_from_i64};
use crate::repository::{StorageError, SurveyRepository};

#[async_trait::async_trait]
impl SurveyRepository for SqliteRepository {
    async fn create_survey(&self, created_on: NaiveDate) -> Result<SurveyId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO surveys (created_on)
            VALUES (?1)
            ",
        )
        .bind(created_on)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        survey_id_from_i64(res.last_insert_rowid())
    }

    async fn get_survey(&self, id: SurveyId) -> Result<Option<Survey>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, created_on
            FROM surveys WHERE id = ?1
            ",
        )
        .bind(id_to_i64("survey_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => map_survey_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, created_on
            FROM surveys
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut surveys = Vec::with_capacity(rows.len());
        for row in rows {
            surveys.push(map_survey_row(&row)?);
        }
        Ok(surveys)
    }
}
