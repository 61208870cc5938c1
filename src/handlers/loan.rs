//! Loan workflow API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::{AuthenticatedUser, UserRole};
use crate::error::ApiResult;
use crate::handlers::MessageResponse;
use crate::loan::{
    ApproveLoanRequest, BorrowerPayment, DisburseRequest, InvestRequest, InvestorProfit, Loan,
    LoanDetail, ProposeLoanRequest,
};

/// Acknowledgement of a committed investment
#[derive(Serialize)]
pub struct InvestmentResponse {
    pub investment_id: Uuid,
    pub total_invested: i64,
    pub fully_invested: bool,
}

/// Propose a new loan (POST /api/loans)
pub async fn create_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ProposeLoanRequest>,
) -> ApiResult<Json<Loan>> {
    user.require_any(&[UserRole::Borrower, UserRole::Admin])?;

    let loan = state.loan_service.propose_loan(user.user_id, request).await?;
    Ok(Json(loan))
}

/// Loan detail with aggregate investment (GET /api/loans/:id)
pub async fn get_loan_detail(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> ApiResult<Json<LoanDetail>> {
    let detail = state.loan_service.loan_detail(loan_id).await?;
    Ok(Json(detail))
}

/// Approve a proposed loan (POST /api/loans/:id/approve)
pub async fn approve_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<ApproveLoanRequest>,
) -> ApiResult<Json<MessageResponse>> {
    user.require_any(&[UserRole::FieldOfficer, UserRole::Admin])?;

    state
        .loan_service
        .approve_loan(user.user_id, loan_id, request)
        .await?;
    Ok(Json(MessageResponse::new("Loan approved successfully")))
}

/// Reject a proposed loan (POST /api/loans/:id/reject)
pub async fn reject_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    user.require_any(&[UserRole::FieldOfficer, UserRole::Admin])?;

    state.loan_service.reject_loan(loan_id).await?;
    Ok(Json(MessageResponse::new("Loan rejected")))
}

/// Commit an investment (POST /api/loans/:id/invest)
pub async fn create_investment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<InvestRequest>,
) -> ApiResult<Json<InvestmentResponse>> {
    user.require_any(&[UserRole::Investor])?;

    let outcome = state
        .loan_service
        .submit_investment(user.user_id, user.email.clone(), loan_id, request)
        .await?;

    Ok(Json(InvestmentResponse {
        investment_id: outcome.investment_id,
        total_invested: outcome.total_invested,
        fully_invested: outcome.completed_funding,
    }))
}

/// Disburse a fully invested loan (POST /api/loans/:id/disburse)
pub async fn create_disbursement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<DisburseRequest>,
) -> ApiResult<Json<MessageResponse>> {
    user.require_any(&[UserRole::FieldOfficer, UserRole::Admin])?;

    state
        .loan_service
        .disburse(user.user_id, loan_id, request)
        .await?;
    Ok(Json(MessageResponse::new("Loan disbursed successfully")))
}

/// Borrower's simple-interest repayment total (GET /api/loans/:id/total-payment)
pub async fn get_total_payment(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> ApiResult<Json<BorrowerPayment>> {
    let payment = state.loan_service.total_payment(loan_id).await?;
    Ok(Json(payment))
}

/// Per-investor profit split (GET /api/loans/:id/investor-profits)
pub async fn get_investor_profits(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InvestorProfit>>> {
    let profits = state.loan_service.investor_profits(loan_id).await?;
    Ok(Json(profits))
}
