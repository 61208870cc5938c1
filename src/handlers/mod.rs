//! API handlers

mod file;
mod loan;

pub use file::*;
pub use loan::*;

use serde::Serialize;

/// Plain acknowledgement body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
