//! Loyalty tiers and the point-to-tier derivation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Loyalty tier of a user, derived from accumulated points.
///
/// Never stored in the database; always recomputed from the user's point
/// total so the displayed tier cannot drift from the stored points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoyaltyLevel {
    Novice,
    StorySeeker,
    PageConqueror,
    TomeMaster,
    LibraryMagister,
}

impl LoyaltyLevel {
    /// Derive the tier for a point total.
    ///
    /// Boundary policy is greatest lower bound: exactly the threshold value
    /// qualifies for the tier (30 points is Library Magister).
    pub fn for_points(points: u32) -> Self {
        match points {
            30.. => LoyaltyLevel::LibraryMagister,
            20.. => LoyaltyLevel::TomeMaster,
            10.. => LoyaltyLevel::PageConqueror,
            5.. => LoyaltyLevel::StorySeeker,
            _ => LoyaltyLevel::Novice,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LoyaltyLevel::Novice => "Novice",
            LoyaltyLevel::StorySeeker => "Story Seeker",
            LoyaltyLevel::PageConqueror => "Page Conqueror",
            LoyaltyLevel::TomeMaster => "Tome Master",
            LoyaltyLevel::LibraryMagister => "Library Magister",
        }
    }

    /// Maximum number of concurrently open loans
    pub fn max_books(&self) -> i64 {
        match self {
            LoyaltyLevel::Novice => 1,
            LoyaltyLevel::StorySeeker => 2,
            LoyaltyLevel::PageConqueror => 3,
            LoyaltyLevel::TomeMaster => 4,
            LoyaltyLevel::LibraryMagister => 5,
        }
    }

    /// Maximum price of a book this tier may borrow
    pub fn max_book_price(&self) -> Decimal {
        let price: i64 = match self {
            LoyaltyLevel::Novice => 50,
            LoyaltyLevel::StorySeeker => 100,
            LoyaltyLevel::PageConqueror => 150,
            LoyaltyLevel::TomeMaster => 200,
            LoyaltyLevel::LibraryMagister => 300,
        };
        Decimal::from(price)
    }

    /// Loan duration in days, fixed into the due date at issue time
    pub fn max_days(&self) -> i64 {
        match self {
            LoyaltyLevel::Novice => 7,
            LoyaltyLevel::StorySeeker => 14,
            LoyaltyLevel::PageConqueror => 21,
            LoyaltyLevel::TomeMaster => 28,
            LoyaltyLevel::LibraryMagister => 42,
        }
    }
}

/// Tier entitlements snapshot, exposed on the profile endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoyaltyStatus {
    pub points: i32,
    pub level: LoyaltyLevel,
    pub title: String,
    pub max_books: i64,
    pub max_book_price: Decimal,
    pub max_days: i64,
}

impl LoyaltyStatus {
    pub fn for_points(points: i32) -> Self {
        let level = LoyaltyLevel::for_points(points.max(0) as u32);
        Self {
            points,
            level,
            title: level.title().to_string(),
            max_books: level.max_books(),
            max_book_price: level.max_book_price(),
            max_days: level.max_days(),
        }
    }
}
