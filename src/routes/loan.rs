//! Loan route definitions

use axum::Router;

use crate::app_state::AppState;
use crate::handlers::*;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", axum::routing::post(create_loan))
        .route("/api/loans/:id", axum::routing::get(get_loan_detail))
        .route("/api/loans/:id/approve", axum::routing::post(approve_loan))
        .route("/api/loans/:id/reject", axum::routing::post(reject_loan))
        .route("/api/loans/:id/invest", axum::routing::post(create_investment))
        .route(
            "/api/loans/:id/disburse",
            axum::routing::post(create_disbursement),
        )
        .route(
            "/api/loans/:id/total-payment",
            axum::routing::get(get_total_payment),
        )
        .route(
            "/api/loans/:id/investor-profits",
            axum::routing::get(get_investor_profits),
        )
}
