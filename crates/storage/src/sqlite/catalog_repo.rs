use std::collections::HashMap;

use sat_core::model::{
    AnswerSet, AnswerSetId, Category, Question, QuestionId, Role, RoleId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    answer_set_id_from_i64, build_question, db_err, id_to_i64, map_answer_set_row,
    map_category_row, map_role_row, ser,
};
use crate::repository::{CatalogRepository, NewAnswerSet, NewQuestion, StorageError};

impl SqliteRepository {
    /// Loads every role link and wording override, grouped by question id.
    ///
    /// The catalog is small (tens of questions), so loading the join tables
    /// whole is cheaper than per-question queries.
    async fn question_links(
        &self,
    ) -> Result<
        (
            HashMap<i64, Vec<RoleId>>,
            HashMap<i64, HashMap<RoleId, String>>,
        ),
        StorageError,
    > {
        let role_rows = sqlx::query(
            r"
            SELECT question_id, role_id
            FROM question_roles
            ORDER BY question_id ASC, role_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut roles: HashMap<i64, Vec<RoleId>> = HashMap::new();
        for row in role_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            let role_id: String = row.try_get("role_id").map_err(ser)?;
            roles.entry(question_id).or_default().push(RoleId::new(role_id));
        }

        let wording_rows = sqlx::query(
            r"
            SELECT question_id, role_id, wording
            FROM question_wordings
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut wordings: HashMap<i64, HashMap<RoleId, String>> = HashMap::new();
        for row in wording_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            let role_id: String = row.try_get("role_id").map_err(ser)?;
            let wording: String = row.try_get("wording").map_err(ser)?;
            wordings
                .entry(question_id)
                .or_default()
                .insert(RoleId::new(role_id), wording);
        }

        Ok((roles, wordings))
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_role(&self, role: &Role) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO roles (role_id, description)
            VALUES (?1, ?2)
            ON CONFLICT(role_id) DO UPDATE SET
                description = excluded.description
            ",
        )
        .bind(role.id().as_str())
        .bind(role.description())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_role(&self, id: &RoleId) -> Result<Option<Role>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT role_id, description
            FROM roles WHERE role_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => map_role_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT role_id, description
            FROM roles
            ORDER BY role_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in rows {
            roles.push(map_role_row(&row)?);
        }
        Ok(roles)
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO categories (category_id, name, rationale, rating, position)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(category_id) DO UPDATE SET
                name = excluded.name,
                rationale = excluded.rationale,
                rating = excluded.rating,
                position = excluded.position
            ",
        )
        .bind(category.id().as_str())
        .bind(category.name())
        .bind(category.rationale())
        .bind(category.rating().as_str())
        .bind(i64::from(category.position()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT category_id, name, rationale, rating, position
            FROM categories
            ORDER BY position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            categories.push(map_category_row(&row)?);
        }
        Ok(categories)
    }

    async fn insert_answer_set(
        &self,
        record: NewAnswerSet,
    ) -> Result<AnswerSetId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO answer_sets (choices, kind)
            VALUES (?1, ?2)
            ",
        )
        .bind(record.choices_text)
        .bind(record.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        answer_set_id_from_i64(res.last_insert_rowid())
    }

    async fn get_answer_set(&self, id: AnswerSetId) -> Result<Option<AnswerSet>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, choices, kind
            FROM answer_sets WHERE id = ?1
            ",
        )
        .bind(id_to_i64("answer_set_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => map_answer_set_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_answer_sets(&self) -> Result<Vec<AnswerSet>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, choices, kind
            FROM answer_sets
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut sets = Vec::with_capacity(rows.len());
        for row in rows {
            sets.push(map_answer_set_row(&row)?);
        }
        Ok(sets)
    }

    async fn insert_question(&self, record: NewQuestion) -> Result<QuestionId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO questions (category_id, answer_set_id, text, rationale, weights)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.category_id.as_str())
        .bind(id_to_i64("answer_set_id", record.answer_set_id.value())?)
        .bind(&record.text)
        .bind(record.rationale.as_deref())
        .bind(record.weights.encode())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let question_id = res.last_insert_rowid();

        for role in &record.roles {
            sqlx::query(
                r"
                INSERT INTO question_roles (question_id, role_id)
                VALUES (?1, ?2)
                ",
            )
            .bind(question_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for (role, wording) in &record.wording_overrides {
            sqlx::query(
                r"
                INSERT INTO question_wordings (question_id, role_id, wording)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(question_id)
            .bind(role.as_str())
            .bind(wording)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        super::mapping::question_id_from_i64(question_id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let question_id = id_to_i64("question_id", id.value())?;

        let row = sqlx::query(
            r"
            SELECT id, category_id, answer_set_id, text, rationale, weights
            FROM questions WHERE id = ?1
            ",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_rows = sqlx::query(
            r"
            SELECT role_id
            FROM question_roles WHERE question_id = ?1
            ORDER BY role_id ASC
            ",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut roles = Vec::with_capacity(role_rows.len());
        for role_row in role_rows {
            roles.push(RoleId::new(
                role_row.try_get::<String, _>("role_id").map_err(ser)?,
            ));
        }

        let wording_rows = sqlx::query(
            r"
            SELECT role_id, wording
            FROM question_wordings WHERE question_id = ?1
            ",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut overrides = HashMap::with_capacity(wording_rows.len());
        for wording_row in wording_rows {
            overrides.insert(
                RoleId::new(wording_row.try_get::<String, _>("role_id").map_err(ser)?),
                wording_row.try_get::<String, _>("wording").map_err(ser)?,
            );
        }

        build_question(&row, roles, overrides).map(Some)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT q.id, q.category_id, q.answer_set_id, q.text, q.rationale, q.weights
            FROM questions q
            JOIN categories c ON c.category_id = q.category_id
            ORDER BY c.position ASC, q.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let (mut roles, mut wordings) = self.question_links().await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            questions.push(build_question(
                &row,
                roles.remove(&id).unwrap_or_default(),
                wordings.remove(&id).unwrap_or_default(),
            )?);
        }
        Ok(questions)
    }

    async fn questions_for_role(&self, role: &RoleId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT q.id, q.category_id, q.answer_set_id, q.text, q.rationale, q.weights
            FROM questions q
            JOIN question_roles qr ON qr.question_id = q.id
            JOIN categories c ON c.category_id = q.category_id
            WHERE qr.role_id = ?1
            ORDER BY c.position ASC, q.id ASC
            ",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let (mut roles, mut wordings) = self.question_links().await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            questions.push(build_question(
                &row,
                roles.remove(&id).unwrap_or_default(),
                wordings.remove(&id).unwrap_or_default(),
            )?);
        }
        Ok(questions)
    }
}
