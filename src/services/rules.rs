//! Loan precondition rules
//!
//! Stateless checks shared by the loan lifecycle. Each rule maps to exactly
//! one error kind, never mutates anything and is safe to call speculatively.

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::Loan,
        loyalty::LoyaltyLevel,
        user::UserClaims,
    },
};

/// The loan must belong to the caller, unless the caller is an admin
/// returning on a user's behalf.
pub fn check_ownership(caller: &UserClaims, loan: &Loan) -> AppResult<()> {
    if caller.is_admin() || caller.user_id == loan.user_id {
        Ok(())
    } else {
        Err(AppError::ForbiddenAction(
            "Loan belongs to another user".to_string(),
        ))
    }
}

/// The loan must still be open; a closed loan is terminal.
pub fn check_not_returned(loan: &Loan) -> AppResult<()> {
    if loan.is_open() {
        Ok(())
    } else {
        Err(AppError::LoanAlreadyReturned(format!(
            "Loan with id {} is already returned",
            loan.id
        )))
    }
}

/// The user's open-loan count must stay below the tier's maximum.
pub fn check_loan_limit(open_loans: i64, tier: LoyaltyLevel) -> AppResult<()> {
    if open_loans < tier.max_books() {
        Ok(())
    } else {
        Err(AppError::LoanLimitExceeded(format!(
            "{} allows at most {} open loan(s), user has {}",
            tier.title(),
            tier.max_books(),
            open_loans
        )))
    }
}

/// The book's price must not exceed the tier's ceiling (boundary inclusive).
pub fn check_price_limit(price: Decimal, tier: LoyaltyLevel) -> AppResult<()> {
    if price <= tier.max_book_price() {
        Ok(())
    } else {
        Err(AppError::PriceLimitExceeded(format!(
            "Book price {} exceeds the {} limit of {}",
            price,
            tier.title(),
            tier.max_book_price()
        )))
    }
}

/// At least one copy must be in stock.
pub fn check_availability(copies_available: i32) -> AppResult<()> {
    if copies_available > 0 {
        Ok(())
    } else {
        Err(AppError::BookUnavailable(
            "No copies available".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn loan(user_id: i32, returned: bool) -> Loan {
        let now = Utc::now();
        Loan {
            id: 1,
            user_id,
            book_id: 7,
            loan_date: now,
            due_date: now,
            returned_date: if returned { Some(now) } else { None },
        }
    }

    fn claims(user_id: i32, role: Role) -> UserClaims {
        UserClaims {
            sub: "test".to_string(),
            user_id,
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_ownership() {
        assert!(check_ownership(&claims(1, Role::User), &loan(1, false)).is_ok());
        assert!(matches!(
            check_ownership(&claims(2, Role::User), &loan(1, false)),
            Err(AppError::ForbiddenAction(_))
        ));
        // Admin may return any loan on a user's behalf
        assert!(check_ownership(&claims(2, Role::Admin), &loan(1, false)).is_ok());
    }

    #[test]
    fn test_not_returned() {
        assert!(check_not_returned(&loan(1, false)).is_ok());
        assert!(matches!(
            check_not_returned(&loan(1, true)),
            Err(AppError::LoanAlreadyReturned(_))
        ));
    }

    #[test]
    fn test_loan_limit() {
        // Novice carries a single-loan allowance
        assert!(check_loan_limit(0, LoyaltyLevel::Novice).is_ok());
        assert!(matches!(
            check_loan_limit(1, LoyaltyLevel::Novice),
            Err(AppError::LoanLimitExceeded(_))
        ));
        assert!(check_loan_limit(4, LoyaltyLevel::LibraryMagister).is_ok());
        assert!(check_loan_limit(5, LoyaltyLevel::LibraryMagister).is_err());
    }

    #[test]
    fn test_price_limit_boundary_inclusive() {
        let limit = LoyaltyLevel::PageConqueror.max_book_price();
        assert!(check_price_limit(limit, LoyaltyLevel::PageConqueror).is_ok());
        assert!(matches!(
            check_price_limit(limit + Decimal::new(1, 2), LoyaltyLevel::PageConqueror),
            Err(AppError::PriceLimitExceeded(_))
        ));
    }

    #[test]
    fn test_availability() {
        assert!(check_availability(1).is_ok());
        assert!(matches!(
            check_availability(0),
            Err(AppError::BookUnavailable(_))
        ));
    }
}
