//! Assigning one budget to many customers at once.

use super::service::{ensure_budget_exists, BudgetService};
use crate::error::ErrorCode;
use crate::proxy::AssignBudgetRequest;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Input of `assignBudgetBatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BatchAssignRequest {
    /// Customers to assign the budget to
    #[validate(length(min = 1, message = "at least one user_id is required"))]
    pub user_ids: Vec<String>,
    /// Existing budget to assign
    #[validate(length(min = 1, message = "budget_id is required"))]
    pub budget_id: String,
}

/// Per-customer failure inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Customer whose assignment failed
    pub user_id: String,
    /// Error code of the failure
    pub code: ErrorCode,
    /// Failure message
    pub message: String,
}

/// Outcome of a batch assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAssignReport {
    /// Budget that was assigned
    pub budget_id: String,
    /// Customers assigned successfully, in request order
    pub succeeded: Vec<String>,
    /// Customers whose assignment failed, in request order
    pub failed: Vec<BatchFailure>,
}

impl BatchAssignReport {
    /// Whether every assignment succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl BudgetService {
    /// Assign one budget to every listed customer.
    ///
    /// The budget's existence is checked once; a missing budget fails the whole
    /// batch with [`Error::NotFound`] before any assignment is sent. Assignments
    /// then run concurrently and individual failures are reported, not raised.
    pub async fn assign_budget_batch(&self, request: BatchAssignRequest) -> Result<BatchAssignReport> {
        request.validate()?;
        if let Some(position) = request.user_ids.iter().position(|id| id.trim().is_empty()) {
            return Err(Error::validation_field(
                format!("user_ids[{}] must not be empty", position),
                "user_ids",
            ));
        }

        let budgets = self.list_budgets().await?;
        ensure_budget_exists(&budgets, &request.budget_id)?;

        let assignments = request.user_ids.iter().map(|user_id| {
            let assignment = AssignBudgetRequest {
                user_id: user_id.clone(),
                budget_id: request.budget_id.clone(),
            };
            async move {
                let outcome = self.post_assignment(&assignment).await;
                (assignment.user_id, outcome)
            }
        });
        let outcomes = futures::future::join_all(assignments).await;

        let mut report = BatchAssignReport {
            budget_id: request.budget_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for (user_id, outcome) in outcomes {
            match outcome {
                Ok(_) => report.succeeded.push(user_id),
                Err(e) => report.failed.push(BatchFailure {
                    user_id,
                    code: e.code(),
                    message: e.public_message(),
                }),
            }
        }

        info!(
            budget_id = %report.budget_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch budget assignment finished"
        );
        Ok(report)
    }
}
