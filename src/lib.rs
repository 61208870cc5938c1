//! Loan funding engine library
//!
//! Coordinates the lifecycle of a peer-funded loan: proposal, approval,
//! concurrent investment funding, and disbursement, with a one-time
//! agreement-letter notification when a loan becomes fully invested.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod handlers;
pub mod ledger;
pub mod loan;
pub mod notify;
pub mod report;
pub mod routes;
pub mod service;
