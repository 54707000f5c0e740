//! Loans repository: the loan ledger
//!
//! Mutations run inside the caller's transaction so that the stock
//! decrement, the loan insert and the loyalty update commit or fail as one.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanBook, LoanDetails, LoanUser},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::LoanNotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan by ID with a row lock for the return flow
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: i32,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::LoanNotFound(format!("Loan with id {} not found", id)))
    }

    /// Count a user's open loans inside the issue transaction.
    /// The user row is already locked, so the check-then-create is atomic.
    pub async fn count_open_by_user(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND returned_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    /// Count open loans referencing a user, outside any transaction
    /// (used as the delete guard)
    pub async fn count_open_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND returned_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count open loans referencing a book (delete guard)
    pub async fn count_open_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND returned_date IS NULL",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Insert a new open loan inside the issue transaction
    pub async fn insert(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i32,
        book_id: i32,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, loan_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(loan_date)
        .bind(due_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(loan)
    }

    /// Close an open loan inside the return transaction.
    /// The WHERE clause re-asserts the open state under the row lock.
    pub async fn close(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        loan_id: i32,
        returned_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET returned_date = $2
            WHERE id = $1 AND returned_date IS NULL
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(returned_date)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            AppError::LoanAlreadyReturned(format!("Loan with id {} is already returned", loan_id))
        })
    }

    /// Get a user's open loans with book details
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.loan_date, l.due_date, l.returned_date,
                   b.id as book_id, b.title, b.author
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1 AND l.returned_date IS NULL
            ORDER BY l.loan_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        let mut result = Vec::new();
        for row in rows {
            let due_date: DateTime<Utc> = row.get("due_date");
            result.push(LoanDetails {
                id: row.get("id"),
                loan_date: row.get("loan_date"),
                due_date,
                returned_date: row.get("returned_date"),
                book: LoanBook {
                    id: row.get("book_id"),
                    title: row.get("title"),
                    author: row.get("author"),
                },
                user: None,
                is_overdue: due_date < now,
            });
        }

        Ok(result)
    }

    /// Get full details for a single loan (used for the return response)
    pub async fn get_details(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let row = sqlx::query(
            r#"
            SELECT l.id, l.loan_date, l.due_date, l.returned_date,
                   b.id as book_id, b.title, b.author,
                   u.id as owner_id, u.login, u.role
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN users u ON l.user_id = u.id
            WHERE l.id = $1
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::LoanNotFound(format!("Loan with id {} not found", loan_id)))?;

        let due_date: DateTime<Utc> = row.get("due_date");
        let returned_date: Option<DateTime<Utc>> = row.get("returned_date");
        let reference = returned_date.unwrap_or_else(Utc::now);

        let role: String = row.get("role");

        Ok(LoanDetails {
            id: row.get("id"),
            loan_date: row.get("loan_date"),
            due_date,
            returned_date,
            book: LoanBook {
                id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
            },
            user: Some(LoanUser {
                id: row.get("owner_id"),
                login: row.get("login"),
                role: role.parse().map_err(AppError::Internal)?,
            }),
            is_overdue: due_date < reference,
        })
    }
}
