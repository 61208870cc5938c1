//! Ledger store: the durable record of loans, approvals, investments and
//! disbursements.
//!
//! Every lifecycle transition is read-guard-then-write inside one atomic
//! unit, so concurrent transitions on the same loan serialize against each
//! other. The investment path is the critical one: the state check, the
//! aggregate-total read, the insert, and the conditional flip to `invested`
//! must not be separable, or two racing investors can overfund the loan or
//! both observe "funding completed".

mod memory;
mod pg;

pub use memory::MemoryLedger;
pub use pg::PgLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::loan::{
    BorrowerPayment, InvestorProfit, Loan, LoanDetail, LoanState,
};

/// Typed ledger failure, distinguishing wrong-state from overfunding from
/// not-found as the workflow needs to.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("loan not found")]
    NotFound,

    #[error("loan is {actual}, expected {expected}")]
    InvalidState {
        expected: LoanState,
        actual: LoanState,
    },

    #[error("investment of {requested} exceeds remaining capacity of {remaining}")]
    Overfunding { requested: i64, remaining: i64 },

    #[error("investor already committed to this loan")]
    DuplicateInvestor,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound,
            _ => LedgerError::Storage(err.to_string()),
        }
    }
}

/// New loan fields supplied by the proposer.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub description: String,
    pub proposed_by: Uuid,
    pub amount: i64,
    pub duration_month: i32,
}

/// Approval fields supplied by the approver.
#[derive(Debug, Clone)]
pub struct NewApproval {
    pub loan_id: Uuid,
    pub approved_by: Uuid,
    pub approval_date: DateTime<Utc>,
    pub visited_file: Uuid,
    pub rate: f64,
}

/// Investment fields supplied by the investor.
#[derive(Debug, Clone)]
pub struct NewInvestment {
    pub loan_id: Uuid,
    pub invested_by: Uuid,
    pub invested_by_email: String,
    pub amount: i64,
}

/// Disbursement fields supplied by the disburser.
#[derive(Debug, Clone)]
pub struct NewDisbursement {
    pub loan_id: Uuid,
    pub disbursed_by: Uuid,
    pub disbursement_date: DateTime<Utc>,
    pub disbursed_file: Uuid,
}

/// Result of a committed investment write.
#[derive(Debug, Clone)]
pub struct InvestmentOutcome {
    pub investment_id: Uuid,
    pub total_invested: i64,
    /// True only for the single write whose new total equals the principal.
    /// That write moved the loan to `invested` and is the one trigger for
    /// the agreement pipeline.
    pub completed_funding: bool,
}

/// Transactional collaborator contract for the funding workflow.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create a loan in `proposed` state.
    async fn create_loan(&self, new: NewLoan) -> Result<Loan, LedgerError>;

    /// Loan plus its aggregate invested total.
    async fn loan_detail(&self, loan_id: Uuid) -> Result<LoanDetail, LedgerError>;

    /// Atomically check `proposed`, write the approval record and move the
    /// loan to `approved` with rate and approval date set.
    async fn approve(&self, approval: NewApproval) -> Result<(), LedgerError>;

    /// Atomically check `proposed` and move the loan to `rejected`.
    async fn reject(&self, loan_id: Uuid) -> Result<(), LedgerError>;

    /// Commitment guard plus insert. Atomically: check `approved`, read the
    /// current total, reject overfunding and duplicate investors, insert the
    /// investment, and flip the loan to `invested` when the new total equals
    /// the principal. Reports whether this write completed funding.
    async fn create_investment(
        &self,
        investment: NewInvestment,
    ) -> Result<InvestmentOutcome, LedgerError>;

    /// Atomically check `invested`, write the disbursement record and move
    /// the loan to `disbursed`.
    async fn create_disbursement(&self, disbursement: NewDisbursement)
        -> Result<(), LedgerError>;

    /// Record the generated agreement document against the loan.
    async fn record_agreement_file(&self, loan_id: Uuid, file_id: Uuid)
        -> Result<(), LedgerError>;

    /// Distinct investor emails for the loan.
    async fn investor_emails(&self, loan_id: Uuid) -> Result<Vec<String>, LedgerError>;

    /// Simple-interest total the borrower repays.
    async fn borrower_payment(&self, loan_id: Uuid) -> Result<BorrowerPayment, LedgerError>;

    /// Per-investor share of the loan interest.
    async fn investor_profits(&self, loan_id: Uuid) -> Result<Vec<InvestorProfit>, LedgerError>;
}
