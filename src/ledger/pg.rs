//! Postgres-backed ledger store
//!
//! Per-loan mutual exclusion comes from `SELECT ... FOR UPDATE` on the loan
//! row: every transition holds the row lock for the whole
//! read-check-write sequence, so two concurrent commits against the same
//! loan cannot both observe a pre-update total.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::loan::{BorrowerPayment, InvestorProfit, Loan, LoanDetail, LoanState};

use super::{
    InvestmentOutcome, LedgerError, LedgerStore, NewApproval, NewDisbursement, NewInvestment,
    NewLoan,
};

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the loan row and return its state and principal.
    async fn lock_loan(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        loan_id: Uuid,
    ) -> Result<(LoanState, i64), LedgerError> {
        let row: Option<(LoanState, i64)> =
            sqlx::query_as("SELECT state, amount FROM loans WHERE loan_id = $1 FOR UPDATE")
                .bind(loan_id)
                .fetch_optional(&mut **tx)
                .await?;
        row.ok_or(LedgerError::NotFound)
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn create_loan(&self, new: NewLoan) -> Result<Loan, LedgerError> {
        let now = Utc::now();
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (loan_id, description, proposed_by, amount, duration_month, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.description)
        .bind(new.proposed_by)
        .bind(new.amount)
        .bind(new.duration_month)
        .bind(LoanState::Proposed)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn loan_detail(&self, loan_id: Uuid) -> Result<LoanDetail, LedgerError> {
        let detail = sqlx::query_as::<_, LoanDetail>(
            r#"
            SELECT
                l.loan_id,
                l.description,
                l.proposed_by,
                l.amount,
                l.duration_month,
                l.rate,
                l.state,
                l.approval_date,
                l.agreement_file,
                COALESCE(SUM(i.amount), 0)::bigint AS total_investment,
                l.created_at,
                l.updated_at
            FROM loans l
            LEFT JOIN investments i ON l.loan_id = i.loan_id
            WHERE l.loan_id = $1
            GROUP BY l.loan_id
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?;

        detail.ok_or(LedgerError::NotFound)
    }

    async fn approve(&self, approval: NewApproval) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        let (state, _) = Self::lock_loan(&mut tx, approval.loan_id).await?;
        if state != LoanState::Proposed {
            return Err(LedgerError::InvalidState {
                expected: LoanState::Proposed,
                actual: state,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO approvals (approval_id, loan_id, approved_by, approval_date, visited_file, rate)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(approval.loan_id)
        .bind(approval.approved_by)
        .bind(approval.approval_date)
        .bind(approval.visited_file)
        .bind(approval.rate)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE loans SET state = $1, rate = $2, approval_date = $3, updated_at = $4 WHERE loan_id = $5",
        )
        .bind(LoanState::Approved)
        .bind(approval.rate)
        .bind(approval.approval_date)
        .bind(Utc::now())
        .bind(approval.loan_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reject(&self, loan_id: Uuid) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        let (state, _) = Self::lock_loan(&mut tx, loan_id).await?;
        if state != LoanState::Proposed {
            return Err(LedgerError::InvalidState {
                expected: LoanState::Proposed,
                actual: state,
            });
        }

        sqlx::query("UPDATE loans SET state = $1, updated_at = $2 WHERE loan_id = $3")
            .bind(LoanState::Rejected)
            .bind(Utc::now())
            .bind(loan_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_investment(
        &self,
        investment: NewInvestment,
    ) -> Result<InvestmentOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // Row lock held until commit: the state check, total read, insert
        // and state flip below are atomic per loan.
        let (state, principal) = Self::lock_loan(&mut tx, investment.loan_id).await?;
        if state != LoanState::Approved {
            return Err(LedgerError::InvalidState {
                expected: LoanState::Approved,
                actual: state,
            });
        }

        let (already_invested,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM investments WHERE loan_id = $1 AND invested_by = $2)",
        )
        .bind(investment.loan_id)
        .bind(investment.invested_by)
        .fetch_one(&mut *tx)
        .await?;
        if already_invested {
            return Err(LedgerError::DuplicateInvestor);
        }

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::bigint FROM investments WHERE loan_id = $1",
        )
        .bind(investment.loan_id)
        .fetch_one(&mut *tx)
        .await?;

        if total + investment.amount > principal {
            return Err(LedgerError::Overfunding {
                requested: investment.amount,
                remaining: principal - total,
            });
        }

        let investment_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO investments (investment_id, loan_id, invested_by, invested_by_email, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(investment_id)
        .bind(investment.loan_id)
        .bind(investment.invested_by)
        .bind(&investment.invested_by_email)
        .bind(investment.amount)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let total_invested = total + investment.amount;
        let completed_funding = total_invested == principal;
        if completed_funding {
            sqlx::query("UPDATE loans SET state = $1, updated_at = $2 WHERE loan_id = $3")
                .bind(LoanState::Invested)
                .bind(Utc::now())
                .bind(investment.loan_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(InvestmentOutcome {
            investment_id,
            total_invested,
            completed_funding,
        })
    }

    async fn create_disbursement(
        &self,
        disbursement: NewDisbursement,
    ) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        let (state, _) = Self::lock_loan(&mut tx, disbursement.loan_id).await?;
        if state != LoanState::Invested {
            return Err(LedgerError::InvalidState {
                expected: LoanState::Invested,
                actual: state,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO disbursements (disbursement_id, loan_id, disbursed_by, disbursed_file, disbursement_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(disbursement.loan_id)
        .bind(disbursement.disbursed_by)
        .bind(disbursement.disbursed_file)
        .bind(disbursement.disbursement_date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE loans SET state = $1, updated_at = $2 WHERE loan_id = $3")
            .bind(LoanState::Disbursed)
            .bind(Utc::now())
            .bind(disbursement.loan_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_agreement_file(
        &self,
        loan_id: Uuid,
        file_id: Uuid,
    ) -> Result<(), LedgerError> {
        let result =
            sqlx::query("UPDATE loans SET agreement_file = $1, updated_at = $2 WHERE loan_id = $3")
                .bind(file_id)
                .bind(Utc::now())
                .bind(loan_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound);
        }
        Ok(())
    }

    async fn investor_emails(&self, loan_id: Uuid) -> Result<Vec<String>, LedgerError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT invested_by_email FROM investments WHERE loan_id = $1",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    async fn borrower_payment(&self, loan_id: Uuid) -> Result<BorrowerPayment, LedgerError> {
        let detail = self.loan_detail(loan_id).await?;
        let rate = detail.rate.ok_or(LedgerError::InvalidState {
            expected: LoanState::Approved,
            actual: detail.state,
        })?;

        Ok(BorrowerPayment::compute(
            loan_id,
            detail.amount,
            rate,
            detail.duration_month,
        ))
    }

    async fn investor_profits(&self, loan_id: Uuid) -> Result<Vec<InvestorProfit>, LedgerError> {
        let detail = self.loan_detail(loan_id).await?;
        let rate = detail.rate.ok_or(LedgerError::InvalidState {
            expected: LoanState::Approved,
            actual: detail.state,
        })?;
        let payment =
            BorrowerPayment::compute(loan_id, detail.amount, rate, detail.duration_month);

        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT invested_by_email, SUM(amount)::bigint
            FROM investments
            WHERE loan_id = $1
            GROUP BY invested_by_email
            ORDER BY invested_by_email
            "#,
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(email, invested)| {
                InvestorProfit::compute(
                    loan_id,
                    email,
                    invested,
                    detail.amount,
                    payment.total_interest,
                )
            })
            .collect())
    }
}
