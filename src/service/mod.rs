//! Loan workflow orchestration
//!
//! Thin coordination layer between the HTTP surface and the ledger:
//! validates caller input, delegates the transactional mutation, and
//! schedules (never awaits) the agreement pipeline when an investment
//! completes funding. Constructed once at startup with its collaborators
//! passed in explicitly.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::files::FileStore;
use crate::ledger::{
    InvestmentOutcome, LedgerStore, NewApproval, NewDisbursement, NewInvestment, NewLoan,
};
use crate::loan::{
    ApproveLoanRequest, BorrowerPayment, DisburseRequest, InvestRequest, InvestorProfit, Loan,
    LoanDetail, ProposeLoanRequest,
};
use crate::notify::{AgreementNotifier, NotificationJob};

pub struct LoanService {
    ledger: Arc<dyn LedgerStore>,
    files: Arc<dyn FileStore>,
    notifier: AgreementNotifier,
}

impl LoanService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        files: Arc<dyn FileStore>,
        notifier: AgreementNotifier,
    ) -> Self {
        Self {
            ledger,
            files,
            notifier,
        }
    }

    /// Create a loan in `proposed` state.
    pub async fn propose_loan(
        &self,
        proposed_by: Uuid,
        request: ProposeLoanRequest,
    ) -> ApiResult<Loan> {
        request.validate()?;

        let loan = self
            .ledger
            .create_loan(NewLoan {
                description: request.description,
                proposed_by,
                amount: request.amount,
                duration_month: request.duration_month,
            })
            .await?;

        tracing::info!(loan_id = %loan.loan_id, amount = loan.amount, "loan proposed");
        Ok(loan)
    }

    /// Approve a proposed loan, setting its rate and approval date. When
    /// the transition fails after the evidence file was stored, the file is
    /// cleaned up as compensation.
    pub async fn approve_loan(
        &self,
        approved_by: Uuid,
        loan_id: Uuid,
        request: ApproveLoanRequest,
    ) -> ApiResult<()> {
        request.validate()?;

        let result = self
            .ledger
            .approve(NewApproval {
                loan_id,
                approved_by,
                approval_date: request.approval_date,
                visited_file: request.visited_file,
                rate: request.rate,
            })
            .await;

        if let Err(e) = result {
            self.discard_evidence(request.visited_file);
            return Err(e.into());
        }

        tracing::info!(loan_id = %loan_id, rate = request.rate, "loan approved");
        Ok(())
    }

    /// Move a proposed loan to the terminal `rejected` state.
    pub async fn reject_loan(&self, loan_id: Uuid) -> ApiResult<()> {
        self.ledger.reject(loan_id).await?;
        tracing::info!(loan_id = %loan_id, "loan rejected");
        Ok(())
    }

    /// Commit an investment. The ledger's guard decides acceptance; when
    /// this exact write completes funding, the agreement pipeline is
    /// queued without being awaited.
    pub async fn submit_investment(
        &self,
        invested_by: Uuid,
        invested_by_email: String,
        loan_id: Uuid,
        request: InvestRequest,
    ) -> ApiResult<InvestmentOutcome> {
        request.validate()?;

        let outcome = self
            .ledger
            .create_investment(NewInvestment {
                loan_id,
                invested_by,
                invested_by_email,
                amount: request.amount,
            })
            .await?;

        if outcome.completed_funding {
            tracing::info!(loan_id = %loan_id, total = outcome.total_invested, "loan fully invested");
            // Pipeline failures stay out-of-band; the committed investment
            // must not be affected by them.
            if let Err(e) = self.notifier.enqueue(NotificationJob { loan_id }) {
                tracing::error!(
                    loan_id = %loan_id,
                    error = %e,
                    "failed to queue agreement notification, operator follow-up required"
                );
            }
        }

        Ok(outcome)
    }

    /// Disburse a fully invested loan.
    pub async fn disburse(
        &self,
        disbursed_by: Uuid,
        loan_id: Uuid,
        request: DisburseRequest,
    ) -> ApiResult<()> {
        request.validate()?;

        let result = self
            .ledger
            .create_disbursement(NewDisbursement {
                loan_id,
                disbursed_by,
                disbursement_date: request.disbursement_date,
                disbursed_file: request.disbursed_file,
            })
            .await;

        if let Err(e) = result {
            self.discard_evidence(request.disbursed_file);
            return Err(e.into());
        }

        tracing::info!(loan_id = %loan_id, "loan disbursed");
        Ok(())
    }

    pub async fn loan_detail(&self, loan_id: Uuid) -> ApiResult<LoanDetail> {
        Ok(self.ledger.loan_detail(loan_id).await?)
    }

    pub async fn total_payment(&self, loan_id: Uuid) -> ApiResult<BorrowerPayment> {
        Ok(self.ledger.borrower_payment(loan_id).await?)
    }

    pub async fn investor_profits(&self, loan_id: Uuid) -> ApiResult<Vec<InvestorProfit>> {
        Ok(self.ledger.investor_profits(loan_id).await?)
    }

    /// Compensating cleanup for an evidence file whose transition failed,
    /// detached from the caller's request.
    fn discard_evidence(&self, file_id: Uuid) {
        let files = Arc::clone(&self.files);
        tokio::spawn(async move {
            if let Err(e) = files.delete(file_id).await {
                tracing::warn!(file_id = %file_id, error = %e, "failed to discard evidence file");
            }
        });
    }
}
