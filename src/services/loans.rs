//! Loan lifecycle service
//!
//! Orchestrates issue and return: eligibility checks, stock reservation and
//! loyalty adjustments, all inside one transaction per operation. Locks are
//! always acquired user row first, then book row, so concurrent issues and
//! returns cannot deadlock.

use chrono::{Duration, Utc};

use crate::{
    config::LoyaltyConfig,
    error::AppResult,
    models::{
        loan::{Loan, LoanDetails},
        loyalty::LoyaltyLevel,
        user::UserClaims,
    },
    repository::Repository,
};

use super::rules;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    loyalty: LoyaltyConfig,
}

impl LoansService {
    pub fn new(repository: Repository, loyalty: LoyaltyConfig) -> Self {
        Self { repository, loyalty }
    }

    /// Get a user's open loans
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.get_user_loans(user_id).await
    }

    /// Issue a loan of the given book to the caller.
    ///
    /// Eligibility is evaluated against the caller's current tier; nothing is
    /// written unless every check passes, and the stock decrement and loan
    /// insert commit together.
    pub async fn issue_loan(&self, book_id: i32, caller: &UserClaims) -> AppResult<Loan> {
        let mut tx = self.repository.begin().await?;

        let user = self.repository.users.get_for_update(&mut tx, caller.user_id).await?;
        let book = self.repository.books.get_for_update(&mut tx, book_id).await?;

        let tier = LoyaltyLevel::for_points(user.loyalty_points.max(0) as u32);

        let open_loans = self.repository.loans.count_open_by_user(&mut tx, user.id).await?;
        rules::check_loan_limit(open_loans, tier)?;
        rules::check_price_limit(book.price, tier)?;
        rules::check_availability(book.copies_available)?;

        self.repository.books.adjust_stock(&mut tx, book.id, -1).await?;

        let now = Utc::now();
        let due_date = now + Duration::days(tier.max_days());
        let loan = self
            .repository
            .loans
            .insert(&mut tx, user.id, book.id, now, due_date)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Loan {} issued: user={} book={} tier={} due={}",
            loan.id,
            user.id,
            book.id,
            tier.title(),
            due_date
        );

        Ok(loan)
    }

    /// Return an open loan.
    ///
    /// Restores one unit of stock and adjusts the owner's loyalty points:
    /// the configured reward when on time, the configured penalty (clamped
    /// at 0) when overdue. The tier is never stored, so no tier update.
    pub async fn return_loan(&self, loan_id: i32, caller: &UserClaims) -> AppResult<LoanDetails> {
        let mut tx = self.repository.begin().await?;

        let loan = self.repository.loans.get_for_update(&mut tx, loan_id).await?;
        rules::check_ownership(caller, &loan)?;
        rules::check_not_returned(&loan)?;

        // Same lock order as issue: user row, then book row
        let user = self.repository.users.get_for_update(&mut tx, loan.user_id).await?;
        self.repository.books.get_for_update(&mut tx, loan.book_id).await?;

        let now = Utc::now();
        let closed = self.repository.loans.close(&mut tx, loan.id, now).await?;

        self.repository.books.adjust_stock(&mut tx, loan.book_id, 1).await?;

        let on_time = now <= loan.due_date;
        let new_points = adjusted_points(user.loyalty_points, on_time, &self.loyalty);
        self.repository.users.update_points(&mut tx, user.id, new_points).await?;

        tx.commit().await?;

        tracing::info!(
            "Loan {} returned {}: user={} points {} -> {}",
            closed.id,
            if on_time { "on time" } else { "late" },
            user.id,
            user.loyalty_points,
            new_points
        );

        self.repository.loans.get_details(closed.id).await
    }
}

/// New point total after a return: reward when on time, penalty when late,
/// clamped so the total never goes below 0.
fn adjusted_points(points: i32, on_time: bool, loyalty: &LoyaltyConfig) -> i32 {
    if on_time {
        points.saturating_add(loyalty.on_time_reward as i32)
    } else {
        (points - loyalty.overdue_penalty as i32).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LoyaltyConfig {
        LoyaltyConfig {
            on_time_reward: 1,
            overdue_penalty: 2,
        }
    }

    #[test]
    fn test_on_time_reward() {
        assert_eq!(adjusted_points(0, true, &config()), 1);
        assert_eq!(adjusted_points(29, true, &config()), 30);
    }

    #[test]
    fn test_overdue_penalty_clamped_at_zero() {
        assert_eq!(adjusted_points(5, false, &config()), 3);
        assert_eq!(adjusted_points(1, false, &config()), 0);
        assert_eq!(adjusted_points(0, false, &config()), 0);
    }
}
