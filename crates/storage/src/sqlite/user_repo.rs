use sat_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, map_user_row};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (user_id, role_id, password_hash, technical, session_token)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user.id().as_str())
        .bind(user.role().as_str())
        .bind(user.password_hash())
        .bind(i64::from(user.is_technical()))
        .bind(user.session_token())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, role_id, password_hash, technical, session_token
            FROM users WHERE user_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => map_user_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, role_id, password_hash, technical, session_token
            FROM users
            ORDER BY user_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(map_user_row(&row)?);
        }
        Ok(users)
    }

    async fn set_password_hash(&self, id: &UserId, hash: &str) -> Result<(), StorageError> {
        // A new password invalidates any open session.
        let res = sqlx::query(
            r"
            UPDATE users
            SET password_hash = ?2, session_token = NULL
            WHERE user_id = ?1
            ",
        )
        .bind(id.as_str())
        .bind(hash)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_session_token(
        &self,
        id: &UserId,
        token: Option<&str>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users
            SET session_token = ?2
            WHERE user_id = ?1
            ",
        )
        .bind(id.as_str())
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, role_id, password_hash, technical, session_token
            FROM users WHERE session_token = ?1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => map_user_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
