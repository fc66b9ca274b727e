//! Customer and budget operations.
//!
//! [`BudgetService`] composes proxy calls, validation and error translation
//! into the operations the dashboard exposes.

mod batch;
mod service;

pub use batch::{BatchAssignReport, BatchAssignRequest, BatchFailure};
pub use service::{BudgetService, BudgetServiceBuilder};
