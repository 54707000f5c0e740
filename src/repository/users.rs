//! Users repository for database operations

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, UpdateUser, User, UserQuery, UserShort},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("User with id {} not found", id)))
    }

    /// Get user by ID with a row lock, serializing loan operations per user
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: i32,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("User with id {} not found", id)))
    }

    /// Get user by login (primary authentication method)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(login) = LOWER($1)",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if login already exists
    pub async fn login_exists(&self, login: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1) AND id != $2)")
                .bind(login)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1))")
                .bind(login)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new user with an already hashed password
    pub async fn create(
        &self,
        user: &RegisterUser,
        password_hash: &str,
        role: Role,
    ) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password, firstname, lastname, role, loyalty_points, crea_date)
            VALUES ($1, $2, $3, $4, $5, 0, NOW())
            RETURNING *
            "#,
        )
        .bind(&user.login)
        .bind(password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Search users with pagination, including open-loan counts
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let name_filter = query.name.as_ref().map(|n| format!("%{}%", n.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR LOWER(login) LIKE $1
               OR LOWER(firstname) LIKE $1
               OR LOWER(lastname) LIKE $1
            "#,
        )
        .bind(&name_filter)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT u.id, u.login, u.firstname, u.lastname, u.role, u.loyalty_points,
                   (SELECT COUNT(*) FROM loans l WHERE l.user_id = u.id AND l.returned_date IS NULL) as nb_loans,
                   (SELECT COUNT(*) FROM loans l WHERE l.user_id = u.id AND l.returned_date IS NULL AND l.due_date < NOW()) as nb_late_loans
            FROM users u
            WHERE $1::text IS NULL
               OR LOWER(u.login) LIKE $1
               OR LOWER(u.firstname) LIKE $1
               OR LOWER(u.lastname) LIKE $1
            ORDER BY u.lastname, u.firstname, u.login
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&name_filter)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    /// Update an existing user
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        password_hash: Option<String>,
    ) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                login = COALESCE($2, login),
                password = COALESCE($3, password),
                firstname = COALESCE($4, firstname),
                lastname = COALESCE($5, lastname),
                role = COALESCE($6, role),
                loyalty_points = COALESCE($7, loyalty_points),
                modif_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.login)
        .bind(password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.role)
        .bind(user.loyalty_points)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::UserNotFound(format!("User with id {} not found", id)))?;

        Ok(updated)
    }

    /// Set a user's loyalty point total inside a loan transaction.
    /// The caller holds the row lock and has already clamped the value.
    pub async fn update_points(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: i32,
        points: i32,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET loyalty_points = $2, modif_date = NOW() WHERE id = $1")
            .bind(id)
            .bind(points)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }
}
