//! Loan funding domain models
//!
//! A loan moves through `proposed -> approved -> invested -> disbursed`,
//! with a terminal `rejected` reachable only from `proposed`. The `invested`
//! state means committed investments equal the principal exactly.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Loan lifecycle state
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Proposed,
    Approved,
    Invested,
    Disbursed,
    Rejected,
}

impl LoanState {
    /// Terminal states accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanState::Disbursed | LoanState::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Proposed => "proposed",
            LoanState::Approved => "approved",
            LoanState::Invested => "invested",
            LoanState::Disbursed => "disbursed",
            LoanState::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan row as persisted
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub loan_id: Uuid,
    pub description: String,
    pub proposed_by: Uuid,
    /// Principal in minor units
    pub amount: i64,
    pub duration_month: i32,
    /// Interest rate, set at approval (e.g. 0.1 for 10% p.a.)
    pub rate: Option<f64>,
    pub state: LoanState,
    pub approval_date: Option<DateTime<Utc>>,
    pub agreement_file: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan plus its aggregate invested total
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanDetail {
    pub loan_id: Uuid,
    pub description: String,
    pub proposed_by: Uuid,
    pub amount: i64,
    pub duration_month: i32,
    pub rate: Option<f64>,
    pub state: LoanState,
    pub approval_date: Option<DateTime<Utc>>,
    pub agreement_file: Option<Uuid>,
    pub total_investment: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanDetail {
    /// Capacity still open for investment.
    pub fn remaining(&self) -> i64 {
        self.amount - self.total_investment
    }
}

/// Approval record, 1:1 with a loan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanApproval {
    pub approval_id: Uuid,
    pub loan_id: Uuid,
    pub approved_by: Uuid,
    pub approval_date: DateTime<Utc>,
    /// Site-visit evidence document
    pub visited_file: Uuid,
    pub rate: f64,
}

/// A single investor's capital commitment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanInvestment {
    pub investment_id: Uuid,
    pub loan_id: Uuid,
    pub invested_by: Uuid,
    pub invested_by_email: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Disbursement record, 1:1 with a loan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanDisbursement {
    pub disbursement_id: Uuid,
    pub loan_id: Uuid,
    pub disbursed_by: Uuid,
    /// Signed agreement document
    pub disbursed_file: Uuid,
    pub disbursement_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What the borrower owes at the end of the term (simple interest)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerPayment {
    pub loan_id: Uuid,
    pub principal: i64,
    pub total_interest: f64,
    pub total_payment: f64,
}

impl BorrowerPayment {
    /// Simple, non-compounding interest over the loan term:
    /// `interest = principal * rate * (duration_month / 12)`.
    pub fn compute(loan_id: Uuid, principal: i64, rate: f64, duration_month: i32) -> Self {
        let total_interest = principal as f64 * rate * (duration_month as f64 / 12.0);
        BorrowerPayment {
            loan_id,
            principal,
            total_interest,
            total_payment: principal as f64 + total_interest,
        }
    }
}

/// One investor's share of the loan interest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorProfit {
    pub loan_id: Uuid,
    pub email_investor: String,
    pub total_profit: f64,
    pub roi: f64,
}

impl InvestorProfit {
    /// Each investor earns the loan interest proportional to their committed
    /// amount; `roi` is profit relative to that amount.
    pub fn compute(
        loan_id: Uuid,
        email_investor: String,
        invested: i64,
        principal: i64,
        total_interest: f64,
    ) -> Self {
        let share = invested as f64 / principal as f64;
        let total_profit = share * total_interest;
        InvestorProfit {
            loan_id,
            email_investor,
            total_profit,
            roi: if invested > 0 {
                total_profit / invested as f64
            } else {
                0.0
            },
        }
    }
}

// ===== Request payloads =====

/// Request to propose a new loan
#[derive(Debug, Deserialize, Validate)]
pub struct ProposeLoanRequest {
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(range(min = 1, message = "duration_month must be positive"))]
    pub duration_month: i32,
}

/// Request to approve a proposed loan
#[derive(Debug, Deserialize, Validate)]
pub struct ApproveLoanRequest {
    pub approval_date: DateTime<Utc>,
    #[validate(range(min = 0.0, message = "rate must not be negative"))]
    pub rate: f64,
    /// Previously uploaded site-visit evidence file
    pub visited_file: Uuid,
}

/// Request to commit an investment
#[derive(Debug, Deserialize, Validate)]
pub struct InvestRequest {
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
}

/// Request to disburse a fully invested loan
#[derive(Debug, Deserialize, Validate)]
pub struct DisburseRequest {
    pub disbursement_date: DateTime<Utc>,
    /// Previously uploaded signed agreement file
    pub disbursed_file: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_terminality() {
        assert!(!LoanState::Proposed.is_terminal());
        assert!(!LoanState::Approved.is_terminal());
        assert!(!LoanState::Invested.is_terminal());
        assert!(LoanState::Disbursed.is_terminal());
        assert!(LoanState::Rejected.is_terminal());
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(LoanState::Invested.as_str(), "invested");
        assert_eq!(
            serde_json::to_string(&LoanState::Proposed).unwrap(),
            "\"proposed\""
        );
    }

    #[test]
    fn test_borrower_payment_simple_interest() {
        let payment = BorrowerPayment::compute(Uuid::new_v4(), 1_000_000, 0.1, 12);
        assert_eq!(payment.total_interest, 100_000.0);
        assert_eq!(payment.total_payment, 1_100_000.0);
    }

    #[test]
    fn test_borrower_payment_partial_year() {
        let payment = BorrowerPayment::compute(Uuid::new_v4(), 1_200_000, 0.1, 6);
        assert_eq!(payment.total_interest, 60_000.0);
        assert_eq!(payment.total_payment, 1_260_000.0);
    }

    #[test]
    fn test_investor_profit_split() {
        let loan_id = Uuid::new_v4();
        let p1 = InvestorProfit::compute(loan_id, "a@x.io".into(), 500_000, 1_000_000, 100_000.0);
        let p2 = InvestorProfit::compute(loan_id, "b@x.io".into(), 500_000, 1_000_000, 100_000.0);
        assert_eq!(p1.total_profit, 50_000.0);
        assert_eq!(p2.total_profit, 50_000.0);
        assert!((p1.roi - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_propose_request_validation() {
        let bad = ProposeLoanRequest {
            description: String::new(),
            amount: 0,
            duration_month: 0,
        };
        assert!(bad.validate().is_err());

        let ok = ProposeLoanRequest {
            description: "working capital".into(),
            amount: 1_000_000,
            duration_month: 12,
        };
        assert!(ok.validate().is_ok());
    }
}
