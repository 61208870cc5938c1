//! Postgres ledger tests
//!
//! These run against a real database and are ignored by default. Set
//! `TEST_DATABASE_URL` and run with `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use sqlx::PgPool;
    use uuid::Uuid;

    use loanflow_server::ledger::{
        LedgerError, LedgerStore, NewApproval, NewInvestment, NewLoan, PgLedger,
    };
    use loanflow_server::loan::LoanState;

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/loanflow_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    /// Approvals reference an evidence file row, so tests seed one.
    async fn seed_file(pool: &PgPool) -> Uuid {
        let file_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO files (file_id, label, location, content_type)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(file_id)
        .bind("evidence.jpg")
        .bind(format!("/tmp/{}.jpg", file_id))
        .bind("image/jpeg")
        .execute(pool)
        .await
        .expect("Failed to seed file row");
        file_id
    }

    fn test_loan(amount: i64) -> NewLoan {
        NewLoan {
            description: "pg ledger test loan".to_string(),
            proposed_by: Uuid::new_v4(),
            amount,
            duration_month: 12,
        }
    }

    async fn approved_loan(pool: &PgPool, ledger: &PgLedger, amount: i64) -> Uuid {
        let loan = ledger.create_loan(test_loan(amount)).await.unwrap();
        let visited_file = seed_file(pool).await;
        ledger
            .approve(NewApproval {
                loan_id: loan.loan_id,
                approved_by: Uuid::new_v4(),
                approval_date: Utc::now(),
                visited_file,
                rate: 0.1,
            })
            .await
            .unwrap();
        loan.loan_id
    }

    fn investment(loan_id: Uuid, amount: i64) -> NewInvestment {
        NewInvestment {
            loan_id,
            invested_by: Uuid::new_v4(),
            invested_by_email: format!("{}@test.io", Uuid::new_v4()),
            amount,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_funding_boundary_flips_state() {
        let pool = setup_test_db().await;
        let ledger = PgLedger::new(pool.clone());

        let loan_id = approved_loan(&pool, &ledger, 1_000_000).await;

        let first = ledger
            .create_investment(investment(loan_id, 600_000))
            .await
            .unwrap();
        assert!(!first.completed_funding);

        let second = ledger
            .create_investment(investment(loan_id, 400_000))
            .await
            .unwrap();
        assert!(second.completed_funding);
        assert_eq!(second.total_invested, 1_000_000);

        let detail = ledger.loan_detail(loan_id).await.unwrap();
        assert_eq!(detail.state, LoanState::Invested);
        assert_eq!(detail.total_investment, 1_000_000);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_overfunding_rejected() {
        let pool = setup_test_db().await;
        let ledger = PgLedger::new(pool.clone());

        let loan_id = approved_loan(&pool, &ledger, 1_000_000).await;
        ledger
            .create_investment(investment(loan_id, 800_000))
            .await
            .unwrap();

        let err = ledger
            .create_investment(investment(loan_id, 300_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Overfunding {
                requested: 300_000,
                remaining: 200_000,
            }
        ));

        let detail = ledger.loan_detail(loan_id).await.unwrap();
        assert_eq!(detail.total_investment, 800_000);
        assert_eq!(detail.state, LoanState::Approved);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_investment_respects_principal() {
        let pool = setup_test_db().await;
        let ledger = Arc::new(PgLedger::new(pool.clone()));

        let principal = 1_000_000;
        let loan_id = approved_loan(&pool, &ledger, principal).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.create_investment(investment(loan_id, 150_000)).await
            }));
        }

        let mut completions = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => {
                    assert!(outcome.total_invested <= principal);
                    if outcome.completed_funding {
                        completions += 1;
                    }
                }
                Err(e) => assert!(matches!(
                    e,
                    LedgerError::Overfunding { .. } | LedgerError::InvalidState { .. }
                )),
            }
        }
        assert!(completions <= 1);

        let detail = ledger.loan_detail(loan_id).await.unwrap();
        assert!(detail.total_investment <= principal);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_invest_requires_approved_state() {
        let pool = setup_test_db().await;
        let ledger = PgLedger::new(pool.clone());

        let loan = ledger.create_loan(test_loan(500_000)).await.unwrap();
        let err = ledger
            .create_investment(investment(loan.loan_id, 100_000))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_duplicate_investor_rejected() {
        let pool = setup_test_db().await;
        let ledger = PgLedger::new(pool.clone());

        let loan_id = approved_loan(&pool, &ledger, 1_000_000).await;
        let investor = Uuid::new_v4();
        let first = NewInvestment {
            loan_id,
            invested_by: investor,
            invested_by_email: "dup@test.io".to_string(),
            amount: 100_000,
        };
        ledger.create_investment(first.clone()).await.unwrap();

        let err = ledger.create_investment(first).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateInvestor));
    }
}
