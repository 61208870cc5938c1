//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::JwtSecret;
use crate::files::FileStore;
use crate::service::LoanService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub loan_service: Arc<LoanService>,
    pub files: Arc<dyn FileStore>,
    pub jwt_secret: JwtSecret,
}

impl AppState {
    pub fn new(
        loan_service: Arc<LoanService>,
        files: Arc<dyn FileStore>,
        jwt_secret: JwtSecret,
    ) -> Self {
        Self {
            loan_service,
            files,
            jwt_secret,
        }
    }
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt_secret.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}
