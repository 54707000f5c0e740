//! Loan lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::loan::LoanDetails};

use super::AuthenticatedUser;

/// Issue loan request. The borrower is always the authenticated caller;
/// the identity never comes from the request body.
#[derive(Deserialize, ToSchema)]
pub struct IssueLoanRequest {
    /// Book ID
    pub book_id: i32,
}

/// Loan response with calculated due date
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Loan date (ISO 8601 format)
    pub loan_date: DateTime<Utc>,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Loan details
    pub loan: LoanDetails,
}

/// Issue a loan of a book to the caller
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = IssueLoanRequest,
    responses(
        (status = 201, description = "Loan issued", body = LoanResponse),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Concurrent update conflict"),
        (status = 422, description = "Loan limit, price limit or stock check failed")
    )
)]
pub async fn issue_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IssueLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state.services.loans.issue_loan(request.book_id, &claims).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.return_loan(loan_id, &claims).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}
