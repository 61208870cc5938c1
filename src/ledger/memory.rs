//! In-memory ledger store
//!
//! Mirrors the Postgres ledger's guard semantics with a single mutex in
//! place of the per-row lock: every transition runs its whole
//! read-check-write sequence under the lock. Used by the integration tests
//! and handy for local development without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::loan::{
    BorrowerPayment, InvestorProfit, Loan, LoanDetail, LoanInvestment, LoanState,
};

use super::{
    InvestmentOutcome, LedgerError, LedgerStore, NewApproval, NewDisbursement, NewInvestment,
    NewLoan,
};

struct LoanEntry {
    loan: Loan,
    investments: Vec<LoanInvestment>,
}

impl LoanEntry {
    fn total_invested(&self) -> i64 {
        self.investments.iter().map(|i| i.amount).sum()
    }

    fn detail(&self) -> LoanDetail {
        LoanDetail {
            loan_id: self.loan.loan_id,
            description: self.loan.description.clone(),
            proposed_by: self.loan.proposed_by,
            amount: self.loan.amount,
            duration_month: self.loan.duration_month,
            rate: self.loan.rate,
            state: self.loan.state,
            approval_date: self.loan.approval_date,
            agreement_file: self.loan.agreement_file,
            total_investment: self.total_invested(),
            created_at: self.loan.created_at,
            updated_at: self.loan.updated_at,
        }
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    loans: Mutex<HashMap<Uuid, LoanEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, LoanEntry>> {
        // Lock poisoning only happens if a holder panicked; propagating the
        // inner data is still sound for tests.
        self.loans.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn expect_state(loan: &Loan, expected: LoanState) -> Result<(), LedgerError> {
    if loan.state != expected {
        return Err(LedgerError::InvalidState {
            expected,
            actual: loan.state,
        });
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_loan(&self, new: NewLoan) -> Result<Loan, LedgerError> {
        let now = Utc::now();
        let loan = Loan {
            loan_id: Uuid::new_v4(),
            description: new.description,
            proposed_by: new.proposed_by,
            amount: new.amount,
            duration_month: new.duration_month,
            rate: None,
            state: LoanState::Proposed,
            approval_date: None,
            agreement_file: None,
            created_at: now,
            updated_at: now,
        };

        self.lock().insert(
            loan.loan_id,
            LoanEntry {
                loan: loan.clone(),
                investments: Vec::new(),
            },
        );
        Ok(loan)
    }

    async fn loan_detail(&self, loan_id: Uuid) -> Result<LoanDetail, LedgerError> {
        let loans = self.lock();
        let entry = loans.get(&loan_id).ok_or(LedgerError::NotFound)?;
        Ok(entry.detail())
    }

    async fn approve(&self, approval: NewApproval) -> Result<(), LedgerError> {
        let mut loans = self.lock();
        let entry = loans.get_mut(&approval.loan_id).ok_or(LedgerError::NotFound)?;
        expect_state(&entry.loan, LoanState::Proposed)?;

        entry.loan.state = LoanState::Approved;
        entry.loan.rate = Some(approval.rate);
        entry.loan.approval_date = Some(approval.approval_date);
        entry.loan.updated_at = Utc::now();
        Ok(())
    }

    async fn reject(&self, loan_id: Uuid) -> Result<(), LedgerError> {
        let mut loans = self.lock();
        let entry = loans.get_mut(&loan_id).ok_or(LedgerError::NotFound)?;
        expect_state(&entry.loan, LoanState::Proposed)?;

        entry.loan.state = LoanState::Rejected;
        entry.loan.updated_at = Utc::now();
        Ok(())
    }

    async fn create_investment(
        &self,
        investment: NewInvestment,
    ) -> Result<InvestmentOutcome, LedgerError> {
        let mut loans = self.lock();
        let entry = loans
            .get_mut(&investment.loan_id)
            .ok_or(LedgerError::NotFound)?;
        expect_state(&entry.loan, LoanState::Approved)?;

        if entry
            .investments
            .iter()
            .any(|i| i.invested_by == investment.invested_by)
        {
            return Err(LedgerError::DuplicateInvestor);
        }

        let total = entry.total_invested();
        if total + investment.amount > entry.loan.amount {
            return Err(LedgerError::Overfunding {
                requested: investment.amount,
                remaining: entry.loan.amount - total,
            });
        }

        let investment_id = Uuid::new_v4();
        entry.investments.push(LoanInvestment {
            investment_id,
            loan_id: investment.loan_id,
            invested_by: investment.invested_by,
            invested_by_email: investment.invested_by_email,
            amount: investment.amount,
            created_at: Utc::now(),
        });

        let total_invested = total + investment.amount;
        let completed_funding = total_invested == entry.loan.amount;
        if completed_funding {
            entry.loan.state = LoanState::Invested;
            entry.loan.updated_at = Utc::now();
        }

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
        let mut loans = self.lock();
        let entry = loans
            .get_mut(&disbursement.loan_id)
            .ok_or(LedgerError::NotFound)?;
        expect_state(&entry.loan, LoanState::Invested)?;

        entry.loan.state = LoanState::Disbursed;
        entry.loan.updated_at = Utc::now();
        Ok(())
    }

    async fn record_agreement_file(
        &self,
        loan_id: Uuid,
        file_id: Uuid,
    ) -> Result<(), LedgerError> {
        let mut loans = self.lock();
        let entry = loans.get_mut(&loan_id).ok_or(LedgerError::NotFound)?;
        entry.loan.agreement_file = Some(file_id);
        entry.loan.updated_at = Utc::now();
        Ok(())
    }

    async fn investor_emails(&self, loan_id: Uuid) -> Result<Vec<String>, LedgerError> {
        let loans = self.lock();
        let entry = loans.get(&loan_id).ok_or(LedgerError::NotFound)?;

        let mut emails: Vec<String> = entry
            .investments
            .iter()
            .map(|i| i.invested_by_email.clone())
            .collect();
        emails.sort();
        emails.dedup();
        Ok(emails)
    }

    async fn borrower_payment(&self, loan_id: Uuid) -> Result<BorrowerPayment, LedgerError> {
        let loans = self.lock();
        let entry = loans.get(&loan_id).ok_or(LedgerError::NotFound)?;
        let rate = entry.loan.rate.ok_or(LedgerError::InvalidState {
            expected: LoanState::Approved,
            actual: entry.loan.state,
        })?;

        Ok(BorrowerPayment::compute(
            loan_id,
            entry.loan.amount,
            rate,
            entry.loan.duration_month,
        ))
    }

    async fn investor_profits(&self, loan_id: Uuid) -> Result<Vec<InvestorProfit>, LedgerError> {
        let loans = self.lock();
        let entry = loans.get(&loan_id).ok_or(LedgerError::NotFound)?;
        let rate = entry.loan.rate.ok_or(LedgerError::InvalidState {
            expected: LoanState::Approved,
            actual: entry.loan.state,
        })?;
        let payment =
            BorrowerPayment::compute(loan_id, entry.loan.amount, rate, entry.loan.duration_month);

        let mut by_email: HashMap<String, i64> = HashMap::new();
        for inv in &entry.investments {
            *by_email.entry(inv.invested_by_email.clone()).or_default() += inv.amount;
        }

        let mut profits: Vec<InvestorProfit> = by_email
            .into_iter()
            .map(|(email, invested)| {
                InvestorProfit::compute(
                    loan_id,
                    email,
                    invested,
                    entry.loan.amount,
                    payment.total_interest,
                )
            })
            .collect();
        profits.sort_by(|a, b| a.email_investor.cmp(&b.email_investor));
        Ok(profits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_loan(amount: i64) -> NewLoan {
        NewLoan {
            description: "test loan".into(),
            proposed_by: Uuid::new_v4(),
            amount,
            duration_month: 12,
        }
    }

    fn approval(loan_id: Uuid, rate: f64) -> NewApproval {
        NewApproval {
            loan_id,
            approved_by: Uuid::new_v4(),
            approval_date: Utc::now(),
            visited_file: Uuid::new_v4(),
            rate,
        }
    }

    fn investment(loan_id: Uuid, email: &str, amount: i64) -> NewInvestment {
        NewInvestment {
            loan_id,
            invested_by: Uuid::new_v4(),
            invested_by_email: email.into(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_funding_boundary_flips_state() {
        let ledger = MemoryLedger::new();
        let loan = ledger.create_loan(new_loan(1_000_000)).await.unwrap();
        ledger.approve(approval(loan.loan_id, 0.1)).await.unwrap();

        let first = ledger
            .create_investment(investment(loan.loan_id, "a@x.io", 800_000))
            .await
            .unwrap();
        assert!(!first.completed_funding);

        let second = ledger
            .create_investment(investment(loan.loan_id, "b@x.io", 200_000))
            .await
            .unwrap();
        assert!(second.completed_funding);
        assert_eq!(second.total_invested, 1_000_000);

        let detail = ledger.loan_detail(loan.loan_id).await.unwrap();
        assert_eq!(detail.state, LoanState::Invested);
    }

    #[tokio::test]
    async fn test_overfunding_rejected() {
        let ledger = MemoryLedger::new();
        let loan = ledger.create_loan(new_loan(1_000_000)).await.unwrap();
        ledger.approve(approval(loan.loan_id, 0.1)).await.unwrap();
        ledger
            .create_investment(investment(loan.loan_id, "a@x.io", 800_000))
            .await
            .unwrap();

        let err = ledger
            .create_investment(investment(loan.loan_id, "b@x.io", 300_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Overfunding {
                requested: 300_000,
                remaining: 200_000
            }
        ));
    }

    #[tokio::test]
    async fn test_invested_loan_accepts_no_more() {
        let ledger = MemoryLedger::new();
        let loan = ledger.create_loan(new_loan(100)).await.unwrap();
        ledger.approve(approval(loan.loan_id, 0.1)).await.unwrap();
        ledger
            .create_investment(investment(loan.loan_id, "a@x.io", 100))
            .await
            .unwrap();

        let err = ledger
            .create_investment(investment(loan.loan_id, "b@x.io", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_investor_rejected() {
        let ledger = MemoryLedger::new();
        let loan = ledger.create_loan(new_loan(1_000)).await.unwrap();
        ledger.approve(approval(loan.loan_id, 0.1)).await.unwrap();

        let investor = Uuid::new_v4();
        let first = NewInvestment {
            loan_id: loan.loan_id,
            invested_by: investor,
            invested_by_email: "a@x.io".into(),
            amount: 100,
        };
        ledger.create_investment(first.clone()).await.unwrap();

        let err = ledger.create_investment(first).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateInvestor));
    }

    #[tokio::test]
    async fn test_approve_requires_proposed() {
        let ledger = MemoryLedger::new();
        let loan = ledger.create_loan(new_loan(1_000)).await.unwrap();
        ledger.approve(approval(loan.loan_id, 0.1)).await.unwrap();

        let err = ledger.approve(approval(loan.loan_id, 0.2)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidState {
                expected: LoanState::Proposed,
                actual: LoanState::Approved
            }
        ));
    }
}
