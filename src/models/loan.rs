//! Loan (ledger) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::user::Role;

/// Loan model from database.
///
/// A loan is open while `returned_date` is NULL and closed once it is set;
/// there are no other states, and a closed loan is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: DateTime<Utc>,
    /// Fixed at issue time from the tier's max duration; later tier changes
    /// do not move the due date of an open loan
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_date.is_none()
    }
}

/// Book summary embedded in loan listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanBook {
    pub id: i32,
    pub title: String,
    pub author: String,
}

/// Borrower summary embedded in loan listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanUser {
    pub id: i32,
    pub login: String,
    pub role: Role,
}

/// Loan with full details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub book: LoanBook,
    pub user: Option<LoanUser>,
    pub is_overdue: bool,
}
