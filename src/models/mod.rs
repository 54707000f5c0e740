//! Data models for Folio

pub mod book;
pub mod loan;
pub mod loyalty;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use loan::{Loan, LoanDetails};
pub use loyalty::{LoyaltyLevel, LoyaltyStatus};
pub use user::{User, UserShort};
