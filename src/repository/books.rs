//! Books repository for database operations

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ID with a row lock, serializing stock changes per book
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: i32,
    ) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let title_filter = query.title.as_ref().map(|t| format!("%{}%", t.to_lowercase()));
        let author_filter = query.author.as_ref().map(|a| format!("%{}%", a.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR LOWER(title) LIKE $1)
              AND ($2::text IS NULL OR LOWER(author) LIKE $2)
            "#,
        )
        .bind(&title_filter)
        .bind(&author_filter)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR LOWER(title) LIKE $1)
              AND ($2::text IS NULL OR LOWER(author) LIKE $2)
            ORDER BY title, author
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&title_filter)
        .bind(&author_filter)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, price, copies_available, crea_date)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price)
        .bind(book.copies_available)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                price = COALESCE($4, price),
                copies_available = COALESCE($5, copies_available),
                modif_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price)
        .bind(book.copies_available)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))?;

        Ok(updated)
    }

    /// Adjust stock inside a loan transaction. The caller holds the row lock;
    /// the CHECK constraint on copies_available backstops the invariant.
    pub async fn adjust_stock(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: i32,
        delta: i32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE books SET copies_available = copies_available + $2, modif_date = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
