//! # liteclient
//!
//! Admin service for the customers and budgets managed by a LiteLLM proxy.
//! It wraps the proxy's management API in a small set of validated operations
//! and serves them, together with derived dashboard views, behind a single
//! admin login.
//!
//! ## Layers
//!
//! - **proxy**: typed HTTP client for the LiteLLM management endpoints
//! - **budget**: customer and budget operations with error translation
//! - **dashboard**: search, status filtering, pagination and aggregates
//! - **rpc**: axum router with the admin session gate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use liteclient::{AssignBudgetRequest, BudgetService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = BudgetService::builder()
//!         .with_base_url("http://localhost:4000")
//!         .with_api_key("sk-master")
//!         .build()?;
//!
//!     for customer in service.list_customers().await? {
//!         println!("{} spent {:.2}", customer.user_id, customer.spend);
//!     }
//!
//!     service
//!         .assign_budget(AssignBudgetRequest {
//!             user_id: "acme-prod".to_string(),
//!             budget_id: "team-monthly".to_string(),
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod budget;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod proxy;
pub mod rpc;
pub mod telemetry;

// Re-export main types for convenience
pub use budget::{BatchAssignReport, BatchAssignRequest, BudgetService, BudgetServiceBuilder};
pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use proxy::{
    AssignBudgetRequest, Budget, BudgetDuration, CreateBudgetRequest, Customer, CustomerInfo,
    DetailedCustomer, UpdateBudgetRequest,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
