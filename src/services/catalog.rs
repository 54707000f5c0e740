//! Catalog management service

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        check_price(book.price)?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} created: {}", created.id, created.title);
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        if let Some(price) = book.price {
            check_price(price)?;
        }
        self.repository.books.get_by_id(id).await?;
        self.repository.books.update(id, &book).await
    }

    /// Delete a book. Blocked while open loans reference it: deleting would
    /// orphan reserved stock and the ledger rows pointing at it.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;

        let open_loans = self.repository.loans.count_open_for_book(id).await?;
        if open_loans > 0 {
            return Err(AppError::Conflict(format!(
                "Book has {} open loan(s); it cannot be deleted",
                open_loans
            )));
        }

        self.repository.books.delete(id).await
    }
}

/// Prices are non-negative; the DB CHECK backstops this but a bad request
/// should read as a validation error, not a conflict.
fn check_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    Ok(())
}
