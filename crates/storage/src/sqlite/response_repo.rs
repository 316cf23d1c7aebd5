use sat_core::model::{Response, SurveyId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_response_row};
use crate::repository::{ResponseRepository, StorageError};

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn append_responses(&self, responses: &[Response]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for response in responses {
            sqlx::query(
                r"
                INSERT INTO responses (question_id, user_id, survey_id, choice)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(id_to_i64("question_id", response.question().value())?)
            .bind(response.user().as_str())
            .bind(id_to_i64("survey_id", response.survey().value())?)
            .bind(response.choice())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn responses_for_survey(
        &self,
        survey: SurveyId,
    ) -> Result<Vec<Response>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, user_id, survey_id, choice
            FROM responses
            WHERE survey_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("survey_id", survey.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut responses = Vec::with_capacity(rows.len());
        for row in rows {
            responses.push(map_response_row(&row)?);
        }
        Ok(responses)
    }
}
