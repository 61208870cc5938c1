//! Route definitions

mod file;
mod loan;

pub use file::file_routes;
pub use loan::loan_routes;
